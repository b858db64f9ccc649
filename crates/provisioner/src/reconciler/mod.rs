//! Installation lifecycle reconciler
//!
//! Converges an installation's desired configuration into the
//! cluster-side workload resource. Two operator schema dialects are live
//! in the fleet; each has its own strategy implementation behind the
//! `InstallationReconciler` trait, selected once per call from the
//! CR-version tag on the cluster. Unknown tags are logged and routed to
//! the newest strategy so clusters whose tag has not been normalized yet
//! keep reconciling.

pub mod common;
pub mod v1alpha1;
pub mod v1beta1;

mod common_test;
mod v1alpha1_test;

use crate::error::ProvisionerError;
use crate::generators::{DatabaseGenerator, FilestoreGenerator};
use crate::registry::ClientRegistry;
use kube::Client;
use model::{Cluster, ClusterInstallation, Installation, CR_VERSION_V1ALPHA1, CR_VERSION_V1BETA1};
use std::sync::Arc;
use tracing::warn;

pub use v1alpha1::V1Alpha1Reconciler;
pub use v1beta1::V1Beta1Reconciler;

/// One schema dialect's implementation of the installation lifecycle.
///
/// Both implementations honor the same semantics: idempotent
/// namespace/secret steps, a single final resource write, not-found-as-
/// success on every delete path, and boolean (never error) convergence
/// verdicts.
#[async_trait::async_trait]
pub trait InstallationReconciler: Send + Sync {
    /// Ensures the namespace, isolation policy, and secrets exist, then
    /// creates the workload resource. An already-existing resource is
    /// surfaced to the caller, not silently ignored.
    async fn create_cluster_installation(
        &self,
        client: &Client,
        installation: &Installation,
        binding: &ClusterInstallation,
    ) -> Result<(), ProvisionerError>;

    /// Field-by-field reconciles the live resource to the installation
    /// and writes it back with a single update call.
    async fn update_cluster_installation(
        &self,
        client: &Client,
        installation: &Installation,
        binding: &ClusterInstallation,
    ) -> Result<(), ProvisionerError>;

    /// Scales the workload to zero replicas, clears its size class, and
    /// swaps ingress annotations to a "gone" response. Reversed by a
    /// normal update once the installation's intent returns to running.
    async fn hibernate_cluster_installation(
        &self,
        client: &Client,
        binding: &ClusterInstallation,
    ) -> Result<(), ProvisionerError>;

    /// Deletes the resource, its license secrets, and the namespace,
    /// treating "not found" as success at every step. Retried to
    /// completion by the caller; completed steps are never rolled back.
    async fn delete_cluster_installation(
        &self,
        client: &Client,
        binding: &ClusterInstallation,
    ) -> Result<(), ProvisionerError>;

    /// Read-only check that the live resource's version, image, and
    /// environment match the installation. Mismatch is `Ok(false)`.
    async fn verify_installation_matches_config(
        &self,
        client: &Client,
        installation: &Installation,
        binding: &ClusterInstallation,
    ) -> Result<bool, ProvisionerError>;

    /// True once the operator reports a stable state for the current
    /// spec generation.
    async fn is_resource_ready(
        &self,
        client: &Client,
        binding: &ClusterInstallation,
    ) -> Result<bool, ProvisionerError>;

    /// Rotates database/filestore secrets without touching any other
    /// field: deletes the referenced secrets, regenerates them, and
    /// re-patches the resource wiring.
    async fn refresh_secrets(
        &self,
        client: &Client,
        installation: &Installation,
        binding: &ClusterInstallation,
    ) -> Result<(), ProvisionerError>;
}

/// Facade tying the client registry and the schema strategies together.
///
/// Every operation fetches the cluster's handle from the registry,
/// dispatches to the strategy matching the cluster's CR-version tag, and
/// routes the result back through `invalidate_on_error` so a failing
/// handle is rebuilt on the next call.
pub struct InstallationProvisioner {
    registry: Arc<ClientRegistry>,
    v1alpha1: V1Alpha1Reconciler,
    v1beta1: V1Beta1Reconciler,
}

impl std::fmt::Debug for InstallationProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationProvisioner").finish_non_exhaustive()
    }
}

impl InstallationProvisioner {
    /// Creates a provisioner using the given registry and secret
    /// generators. Both strategies share the generators.
    pub fn new(
        registry: Arc<ClientRegistry>,
        database: Arc<dyn DatabaseGenerator>,
        filestore: Arc<dyn FilestoreGenerator>,
    ) -> Self {
        Self {
            registry,
            v1alpha1: V1Alpha1Reconciler::new(Arc::clone(&database), Arc::clone(&filestore)),
            v1beta1: V1Beta1Reconciler::new(database, filestore),
        }
    }

    fn strategy(&self, cluster: &Cluster) -> &dyn InstallationReconciler {
        match cluster.cr_version() {
            CR_VERSION_V1ALPHA1 => &self.v1alpha1,
            CR_VERSION_V1BETA1 => &self.v1beta1,
            other => {
                warn!(
                    "cluster {} carries unknown CR version tag {:?}; assuming {}",
                    cluster.id, other, CR_VERSION_V1BETA1
                );
                &self.v1beta1
            }
        }
    }

    /// See [`InstallationReconciler::create_cluster_installation`].
    pub async fn create_cluster_installation(
        &self,
        cluster: &Cluster,
        installation: &Installation,
        binding: &ClusterInstallation,
    ) -> Result<(), ProvisionerError> {
        let handle = self.registry.get(&cluster.provisioner_name).await?;
        let result = self
            .strategy(cluster)
            .create_cluster_installation(&handle.client, installation, binding)
            .await;
        self.registry
            .invalidate_on_error(result.as_ref().err(), &cluster.provisioner_name)
            .await;
        result
    }

    /// See [`InstallationReconciler::update_cluster_installation`].
    pub async fn update_cluster_installation(
        &self,
        cluster: &Cluster,
        installation: &Installation,
        binding: &ClusterInstallation,
    ) -> Result<(), ProvisionerError> {
        let handle = self.registry.get(&cluster.provisioner_name).await?;
        let result = self
            .strategy(cluster)
            .update_cluster_installation(&handle.client, installation, binding)
            .await;
        self.registry
            .invalidate_on_error(result.as_ref().err(), &cluster.provisioner_name)
            .await;
        result
    }

    /// See [`InstallationReconciler::hibernate_cluster_installation`].
    pub async fn hibernate_cluster_installation(
        &self,
        cluster: &Cluster,
        binding: &ClusterInstallation,
    ) -> Result<(), ProvisionerError> {
        let handle = self.registry.get(&cluster.provisioner_name).await?;
        let result = self
            .strategy(cluster)
            .hibernate_cluster_installation(&handle.client, binding)
            .await;
        self.registry
            .invalidate_on_error(result.as_ref().err(), &cluster.provisioner_name)
            .await;
        result
    }

    /// See [`InstallationReconciler::delete_cluster_installation`].
    pub async fn delete_cluster_installation(
        &self,
        cluster: &Cluster,
        binding: &ClusterInstallation,
    ) -> Result<(), ProvisionerError> {
        let handle = self.registry.get(&cluster.provisioner_name).await?;
        let result = self
            .strategy(cluster)
            .delete_cluster_installation(&handle.client, binding)
            .await;
        self.registry
            .invalidate_on_error(result.as_ref().err(), &cluster.provisioner_name)
            .await;
        result
    }

    /// See [`InstallationReconciler::verify_installation_matches_config`].
    pub async fn verify_installation_matches_config(
        &self,
        cluster: &Cluster,
        installation: &Installation,
        binding: &ClusterInstallation,
    ) -> Result<bool, ProvisionerError> {
        let handle = self.registry.get(&cluster.provisioner_name).await?;
        let result = self
            .strategy(cluster)
            .verify_installation_matches_config(&handle.client, installation, binding)
            .await;
        self.registry
            .invalidate_on_error(result.as_ref().err(), &cluster.provisioner_name)
            .await;
        result
    }

    /// See [`InstallationReconciler::is_resource_ready`].
    pub async fn is_resource_ready(
        &self,
        cluster: &Cluster,
        binding: &ClusterInstallation,
    ) -> Result<bool, ProvisionerError> {
        let handle = self.registry.get(&cluster.provisioner_name).await?;
        let result = self
            .strategy(cluster)
            .is_resource_ready(&handle.client, binding)
            .await;
        self.registry
            .invalidate_on_error(result.as_ref().err(), &cluster.provisioner_name)
            .await;
        result
    }

    /// See [`InstallationReconciler::refresh_secrets`].
    pub async fn refresh_secrets(
        &self,
        cluster: &Cluster,
        installation: &Installation,
        binding: &ClusterInstallation,
    ) -> Result<(), ProvisionerError> {
        let handle = self.registry.get(&cluster.provisioner_name).await?;
        let result = self
            .strategy(cluster)
            .refresh_secrets(&handle.client, installation, binding)
            .await;
        self.registry
            .invalidate_on_error(result.as_ref().err(), &cluster.provisioner_name)
            .await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::ClusterAccess;
    use crate::generators::{OperatorManagedDatabase, OperatorManagedFilestore};
    use crate::test_utils::test_cluster;
    use std::path::PathBuf;

    struct NoAccess;

    #[async_trait::async_trait]
    impl ClusterAccess for NoAccess {
        async fn export_access(&self, cluster_name: &str) -> Result<PathBuf, ProvisionerError> {
            Err(ProvisionerError::Setup(format!(
                "no access configured for {cluster_name}"
            )))
        }
    }

    fn provisioner() -> InstallationProvisioner {
        InstallationProvisioner::new(
            Arc::new(ClientRegistry::new(Arc::new(NoAccess))),
            Arc::new(OperatorManagedDatabase),
            Arc::new(OperatorManagedFilestore),
        )
    }

    fn is_beta(p: &InstallationProvisioner, cluster: &Cluster) -> bool {
        std::ptr::eq(
            p.strategy(cluster) as *const dyn InstallationReconciler as *const (),
            std::ptr::from_ref(&p.v1beta1).cast(),
        )
    }

    #[test]
    fn strategy_follows_the_cluster_cr_version_tag() {
        let p = provisioner();
        assert!(!is_beta(&p, &test_cluster(CR_VERSION_V1ALPHA1)));
        assert!(is_beta(&p, &test_cluster(CR_VERSION_V1BETA1)));
    }

    #[test]
    fn unknown_and_empty_tags_default_to_the_newest_strategy() {
        let p = provisioner();
        assert!(is_beta(&p, &test_cluster("")));
        assert!(is_beta(&p, &test_cluster("installation.meetmesh.io/v2gamma1")));
    }
}
