//! Reconciliation strategy for the current `MeetMesh` schema
//!
//! Field mapping for `installation.meetmesh.io/v1beta1`. Database and
//! filestore wiring are structured blocks, and readiness is judged
//! against the status observed-generation counter so a spec write is not
//! reported ready before the operator has looked at it.

use crate::error::{ErrorContext, ProvisionerError};
use crate::generators::{
    DatabaseGenerator, DatabaseResources, FilestoreGenerator, FilestoreResources,
};
use crate::reconciler::common;
use crate::reconciler::InstallationReconciler;
use crds::{
    Database, ExternalDatabase, ExternalFileStore, FileStore, Ingress, MeetMesh, MeetMeshSpec,
    STATE_STABLE,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, PostParams};
use kube::Client;
use model::{ClusterInstallation, Installation};
use std::sync::Arc;
use tracing::{debug, info};

/// Strategy for clusters serving the v1beta1 `MeetMesh` CR.
pub struct V1Beta1Reconciler {
    database: Arc<dyn DatabaseGenerator>,
    filestore: Arc<dyn FilestoreGenerator>,
}

impl std::fmt::Debug for V1Beta1Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("V1Beta1Reconciler").finish_non_exhaustive()
    }
}

impl V1Beta1Reconciler {
    /// Creates the strategy with its secret generators.
    pub fn new(database: Arc<dyn DatabaseGenerator>, filestore: Arc<dyn FilestoreGenerator>) -> Self {
        Self {
            database,
            filestore,
        }
    }

    fn api(client: &Client, namespace: &str) -> Api<MeetMesh> {
        Api::namespaced(client.clone(), namespace)
    }

    fn database_block(db: Option<&DatabaseResources>) -> Database {
        Database {
            external: db.map(|d| ExternalDatabase {
                secret: d.secret_name().to_string(),
            }),
        }
    }

    fn file_store_block(fs: Option<&FilestoreResources>) -> FileStore {
        FileStore {
            external: fs.map(|f| ExternalFileStore {
                url: f.url.clone(),
                bucket: f.bucket.clone(),
                secret: f.secret_name().to_string(),
            }),
        }
    }

    /// Projects the installation into a fresh resource.
    pub(crate) fn build_resource(
        installation: &Installation,
        binding: &ClusterInstallation,
        db: Option<&DatabaseResources>,
        fs: Option<&FilestoreResources>,
        license_secret: Option<&str>,
    ) -> MeetMesh {
        let name = common::make_cluster_installation_name(binding);
        let mut resource = MeetMesh {
            metadata: ObjectMeta {
                name: Some(name),
                namespace: Some(binding.namespace.clone()),
                labels: Some(common::installation_labels(installation)),
                ..Default::default()
            },
            spec: MeetMeshSpec::default(),
            status: None,
        };
        Self::apply_installation(&mut resource, installation, db, fs, license_secret);
        resource
    }

    /// Reconciles every installation-owned field onto the resource. The
    /// full field set is rewritten each time so no field is ever left
    /// partially updated across a successful call.
    pub(crate) fn apply_installation(
        resource: &mut MeetMesh,
        installation: &Installation,
        db: Option<&DatabaseResources>,
        fs: Option<&FilestoreResources>,
        license_secret: Option<&str>,
    ) {
        resource.spec.version = installation.version.clone();
        resource.spec.image = installation.image.clone();
        resource.spec.size = installation.size.clone();
        resource.spec.replicas = None;
        resource.spec.ingress = Some(Ingress {
            host: installation.dns.clone(),
            annotations: common::running_ingress_annotations(),
        });
        resource.spec.license_secret = license_secret.unwrap_or_default().to_string();
        resource.spec.database = Self::database_block(db);
        resource.spec.file_store = Self::file_store_block(fs);
        resource.spec.meet_mesh_env = common::merged_env(installation);
        resource.spec.resource_labels = common::resource_labels(installation);
    }

    /// True when the live resource matches what the installation demands.
    pub(crate) fn matches_installation(resource: &MeetMesh, installation: &Installation) -> bool {
        resource.spec.version == installation.version
            && resource.spec.image == installation.image
            && common::env_matches(&resource.spec.meet_mesh_env, installation)
    }

    /// Readiness: stable state and the observed generation has caught up
    /// with the spec generation. Falls back to replica/version comparison
    /// when the operator predates generation tracking.
    pub(crate) fn resource_ready(resource: &MeetMesh) -> bool {
        let Some(status) = resource.status.as_ref() else {
            return false;
        };
        if status.state != STATE_STABLE {
            return false;
        }
        match status.observed_generation {
            Some(observed) => resource.metadata.generation == Some(observed),
            None => {
                status.version == resource.spec.version
                    && resource
                        .spec
                        .replicas
                        .is_none_or(|want| status.replicas == want)
            }
        }
    }

    async fn generate_secrets(
        &self,
        client: &Client,
        installation: &Installation,
        binding: &ClusterInstallation,
    ) -> Result<(Option<DatabaseResources>, Option<FilestoreResources>), ProvisionerError> {
        let db = self.database.generate(installation, binding).await?;
        if let Some(db) = &db {
            common::upsert_secret(client, &db.secret).await?;
        }
        let fs = self.filestore.generate(installation, binding).await?;
        if let Some(fs) = &fs {
            common::upsert_secret(client, &fs.secret).await?;
        }
        Ok((db, fs))
    }

    async fn ensure_license_secret(
        &self,
        client: &Client,
        installation: &Installation,
        binding: &ClusterInstallation,
        resource_name: &str,
    ) -> Result<Option<String>, ProvisionerError> {
        match installation.license() {
            Some(license) => {
                let secret_name = common::license_secret_name(resource_name, license);
                let secret =
                    common::build_license_secret(&secret_name, &binding.namespace, license);
                common::upsert_secret(client, &secret).await?;
                common::sweep_license_secrets(
                    client,
                    &binding.namespace,
                    resource_name,
                    Some(&secret_name),
                )
                .await?;
                Ok(Some(secret_name))
            }
            None => {
                common::sweep_license_secrets(client, &binding.namespace, resource_name, None)
                    .await?;
                Ok(None)
            }
        }
    }
}

#[async_trait::async_trait]
impl InstallationReconciler for V1Beta1Reconciler {
    async fn create_cluster_installation(
        &self,
        client: &Client,
        installation: &Installation,
        binding: &ClusterInstallation,
    ) -> Result<(), ProvisionerError> {
        let name = common::make_cluster_installation_name(binding);
        let namespace = &binding.namespace;
        info!(
            "creating cluster installation {}/{} for installation {}",
            namespace, name, installation.id
        );

        common::ensure_namespace(client, namespace).await?;
        common::apply_network_policy(client, namespace, &name).await?;
        let license_secret = self
            .ensure_license_secret(client, installation, binding, &name)
            .await?;
        let (db, fs) = self.generate_secrets(client, installation, binding).await?;

        let resource = Self::build_resource(
            installation,
            binding,
            db.as_ref(),
            fs.as_ref(),
            license_secret.as_deref(),
        );
        Self::api(client, namespace)
            .create(&PostParams::default(), &resource)
            .await
            .with_context(|| format!("creating workload resource {namespace}/{name}"))?;

        info!("created cluster installation {}/{}", namespace, name);
        Ok(())
    }

    async fn update_cluster_installation(
        &self,
        client: &Client,
        installation: &Installation,
        binding: &ClusterInstallation,
    ) -> Result<(), ProvisionerError> {
        let name = common::make_cluster_installation_name(binding);
        let namespace = &binding.namespace;
        let api = Self::api(client, namespace);

        let mut resource = api
            .get(&name)
            .await
            .with_context(|| format!("fetching workload resource {namespace}/{name}"))?;

        let license_secret = self
            .ensure_license_secret(client, installation, binding, &name)
            .await?;
        let (db, fs) = self.generate_secrets(client, installation, binding).await?;

        Self::apply_installation(
            &mut resource,
            installation,
            db.as_ref(),
            fs.as_ref(),
            license_secret.as_deref(),
        );

        api.replace(&name, &PostParams::default(), &resource)
            .await
            .with_context(|| format!("updating workload resource {namespace}/{name}"))?;

        info!("updated cluster installation {}/{}", namespace, name);
        Ok(())
    }

    async fn hibernate_cluster_installation(
        &self,
        client: &Client,
        binding: &ClusterInstallation,
    ) -> Result<(), ProvisionerError> {
        let name = common::make_cluster_installation_name(binding);
        let namespace = &binding.namespace;
        let api = Self::api(client, namespace);

        let mut resource = api
            .get(&name)
            .await
            .with_context(|| format!("fetching workload resource {namespace}/{name}"))?;

        resource.spec.replicas = Some(0);
        // Cleared so the operator does not reassert size-derived resource
        // requests while the workload is scaled down.
        resource.spec.size = String::new();
        if let Some(ingress) = resource.spec.ingress.as_mut() {
            ingress.annotations = common::hibernating_ingress_annotations();
        }

        api.replace(&name, &PostParams::default(), &resource)
            .await
            .with_context(|| format!("hibernating workload resource {namespace}/{name}"))?;

        info!("hibernated cluster installation {}/{}", namespace, name);
        Ok(())
    }

    async fn delete_cluster_installation(
        &self,
        client: &Client,
        binding: &ClusterInstallation,
    ) -> Result<(), ProvisionerError> {
        let name = common::make_cluster_installation_name(binding);
        let namespace = &binding.namespace;
        let api = Self::api(client, namespace);

        match api.delete(&name, &DeleteParams::default()).await {
            Ok(_) => info!("deleted workload resource {}/{}", namespace, name),
            Err(e) if common::is_not_found(&e) => {
                debug!("workload resource {}/{} already absent", namespace, name);
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("deleting workload resource {namespace}/{name}"));
            }
        }

        common::sweep_license_secrets(client, namespace, &name, None).await?;
        common::delete_namespace(client, namespace).await?;

        info!("deleted cluster installation {}/{}", namespace, name);
        Ok(())
    }

    async fn verify_installation_matches_config(
        &self,
        client: &Client,
        installation: &Installation,
        binding: &ClusterInstallation,
    ) -> Result<bool, ProvisionerError> {
        let name = common::make_cluster_installation_name(binding);
        let api = Self::api(client, &binding.namespace);

        match api.get(&name).await {
            Ok(resource) => Ok(Self::matches_installation(&resource, installation)),
            Err(e) if common::is_not_found(&e) => Ok(false),
            Err(e) => Err(e).with_context(|| {
                format!(
                    "fetching workload resource {}/{} for verification",
                    binding.namespace, name
                )
            }),
        }
    }

    async fn is_resource_ready(
        &self,
        client: &Client,
        binding: &ClusterInstallation,
    ) -> Result<bool, ProvisionerError> {
        let name = common::make_cluster_installation_name(binding);
        let api = Self::api(client, &binding.namespace);
        let resource = api.get(&name).await.with_context(|| {
            format!(
                "fetching workload resource {}/{} for readiness",
                binding.namespace, name
            )
        })?;
        Ok(Self::resource_ready(&resource))
    }

    async fn refresh_secrets(
        &self,
        client: &Client,
        installation: &Installation,
        binding: &ClusterInstallation,
    ) -> Result<(), ProvisionerError> {
        let name = common::make_cluster_installation_name(binding);
        let namespace = &binding.namespace;
        let api = Self::api(client, namespace);

        let mut resource = api
            .get(&name)
            .await
            .with_context(|| format!("fetching workload resource {namespace}/{name}"))?;

        // Drop the previously referenced secrets before regenerating so a
        // generator reusing names starts from a clean object.
        if let Some(external) = &resource.spec.database.external {
            common::delete_secret(client, namespace, &external.secret).await?;
        }
        if let Some(external) = &resource.spec.file_store.external {
            common::delete_secret(client, namespace, &external.secret).await?;
        }

        let (db, fs) = self.generate_secrets(client, installation, binding).await?;
        resource.spec.database = Self::database_block(db.as_ref());
        resource.spec.file_store = Self::file_store_block(fs.as_ref());

        api.replace(&name, &PostParams::default(), &resource)
            .await
            .with_context(|| format!("re-patching secret wiring on {namespace}/{name}"))?;

        info!("refreshed secrets for cluster installation {}/{}", namespace, name);
        Ok(())
    }
}
