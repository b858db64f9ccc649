//! Shared reconciliation mechanics
//!
//! Naming, secret, namespace, and network-policy helpers used by both
//! schema strategies. Everything here is either a pure function or an
//! idempotent cluster write, so a retried create/update converges instead
//! of erroring on leftovers from a previous partial attempt.

use crate::error::{ErrorContext, ProvisionerError};
use k8s_openapi::api::core::v1::{Namespace, Secret};
use k8s_openapi::api::networking::v1::{
    NetworkPolicy, NetworkPolicyIngressRule, NetworkPolicyPeer, NetworkPolicySpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::api::{Api, DeleteParams, PostParams};
use kube::Client;
use model::{ClusterInstallation, Installation};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Product prefix carried by every cluster-side resource name.
pub const RESOURCE_NAME_PREFIX: &str = "mm";

// Kubernetes object names must fit a DNS label.
const NAME_MAX_LEN: usize = 63;

// Leading namespace characters folded into the resource name. Enough to
// disambiguate within one cluster while leaving room for secret suffixes.
const NAMESPACE_ID_LEN: usize = 4;

/// Label key carrying the installation identity on every object the
/// provisioner creates.
pub const LABEL_INSTALLATION_ID: &str = "meetmesh.io/installation-id";

/// Label key selecting the workload pods, mirrored by the operator.
pub const LABEL_APP: &str = "app";

/// Derives the stable workload resource name for a binding:
/// `mm-<leading namespace chars>`, truncated to the platform name limit.
pub fn make_cluster_installation_name(binding: &ClusterInstallation) -> String {
    let ns: String = binding.namespace.chars().take(NAMESPACE_ID_LEN).collect();
    let name = format!("{RESOURCE_NAME_PREFIX}-{ns}");
    name.chars().take(NAME_MAX_LEN).collect()
}

/// Content-addressed license secret name:
/// `<resource-name>-<sha256(license)[..6]>-license`.
///
/// Identical licenses produce identical names, so "is the current secret
/// already in place" is a name comparison rather than a content diff.
pub fn license_secret_name(resource_name: &str, license: &str) -> String {
    let digest = Sha256::digest(license.as_bytes());
    let hash = format!("{digest:x}");
    format!("{resource_name}-{}-license", &hash[..6])
}

/// Builds the license secret for the workload namespace.
pub fn build_license_secret(name: &str, namespace: &str, license: &str) -> Secret {
    let mut data = BTreeMap::new();
    data.insert("license".to_string(), license.to_string());
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        string_data: Some(data),
        ..Default::default()
    }
}

/// Labels stamped onto the workload resource.
pub fn installation_labels(installation: &Installation) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(
        LABEL_INSTALLATION_ID.to_string(),
        installation.id.clone(),
    );
    labels
}

/// Labels propagated to every object the operator creates; group
/// membership rides along for rollout batching.
pub fn resource_labels(installation: &Installation) -> BTreeMap<String, String> {
    let mut labels = installation_labels(installation);
    if let Some(group) = &installation.group_id {
        labels.insert("meetmesh.io/group-id".to_string(), group.clone());
    }
    labels
}

/// Ingress annotations for a serving installation.
pub fn running_ingress_annotations() -> BTreeMap<String, String> {
    let mut annotations = BTreeMap::new();
    annotations.insert(
        "nginx.ingress.kubernetes.io/proxy-body-size".to_string(),
        "100m".to_string(),
    );
    annotations.insert(
        "nginx.ingress.kubernetes.io/proxy-send-timeout".to_string(),
        "600".to_string(),
    );
    annotations.insert(
        "nginx.ingress.kubernetes.io/proxy-read-timeout".to_string(),
        "600".to_string(),
    );
    annotations
}

/// Ingress annotations for a hibernating installation: answer with a
/// "gone" response instead of routing to the (absent) pods.
pub fn hibernating_ingress_annotations() -> BTreeMap<String, String> {
    let mut annotations = BTreeMap::new();
    annotations.insert(
        "nginx.ingress.kubernetes.io/configuration-snippet".to_string(),
        "return 410;".to_string(),
    );
    annotations
}

/// Projects the installation's environment overrides into the CR env
/// list, in name order so repeated projections are identical.
pub fn merged_env(installation: &Installation) -> Vec<crds::EnvVar> {
    installation
        .mesh_env
        .iter()
        .map(|(name, value)| crds::EnvVar::literal(name, value))
        .collect()
}

/// True when the CR env list carries exactly the installation's demanded
/// variables with matching values.
pub fn env_matches(cr_env: &[crds::EnvVar], installation: &Installation) -> bool {
    cr_env == merged_env(installation).as_slice()
}

/// True for a Kubernetes "not found" API error.
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 404)
}

/// True for a Kubernetes "already exists" API error.
pub fn is_already_exists(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 409)
}

/// Creates the namespace if absent. Idempotent.
pub async fn ensure_namespace(client: &Client, namespace: &str) -> Result<(), ProvisionerError> {
    let api: Api<Namespace> = Api::all(client.clone());
    let object = Namespace {
        metadata: ObjectMeta {
            name: Some(namespace.to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    match api.create(&PostParams::default(), &object).await {
        Ok(_) => {
            info!("created namespace {}", namespace);
            Ok(())
        }
        Err(e) if is_already_exists(&e) => {
            debug!("namespace {} already present", namespace);
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("creating namespace {namespace}")),
    }
}

/// Deletes the namespace, treating "not found" as success.
pub async fn delete_namespace(client: &Client, namespace: &str) -> Result<(), ProvisionerError> {
    let api: Api<Namespace> = Api::all(client.clone());
    match api.delete(namespace, &DeleteParams::default()).await {
        Ok(_) => {
            info!("deleted namespace {}", namespace);
            Ok(())
        }
        Err(e) if is_not_found(&e) => {
            debug!("namespace {} already absent", namespace);
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("deleting namespace {namespace}")),
    }
}

/// Creates or replaces a secret in its namespace. Idempotent.
pub async fn upsert_secret(client: &Client, secret: &Secret) -> Result<(), ProvisionerError> {
    let namespace = secret.metadata.namespace.as_deref().ok_or_else(|| {
        ProvisionerError::InvalidConfig("secret is missing a namespace".to_string())
    })?;
    let name = secret.metadata.name.as_deref().ok_or_else(|| {
        ProvisionerError::InvalidConfig("secret is missing a name".to_string())
    })?;

    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    match api.create(&PostParams::default(), secret).await {
        Ok(_) => {
            info!("created secret {}/{}", namespace, name);
            Ok(())
        }
        Err(e) if is_already_exists(&e) => {
            // Replace needs the live resourceVersion.
            let existing = api
                .get(name)
                .await
                .with_context(|| format!("fetching secret {namespace}/{name} for replace"))?;
            let mut updated = secret.clone();
            updated.metadata.resource_version = existing.metadata.resource_version;
            api.replace(name, &PostParams::default(), &updated)
                .await
                .with_context(|| format!("replacing secret {namespace}/{name}"))?;
            debug!("replaced secret {}/{}", namespace, name);
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("creating secret {namespace}/{name}")),
    }
}

/// Deletes a secret, treating "not found" as success.
pub async fn delete_secret(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<(), ProvisionerError> {
    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    match api.delete(name, &DeleteParams::default()).await {
        Ok(_) => {
            info!("deleted secret {}/{}", namespace, name);
            Ok(())
        }
        Err(e) if is_not_found(&e) => Ok(()),
        Err(e) => Err(e).with_context(|| format!("deleting secret {namespace}/{name}")),
    }
}

/// True for a license secret of `resource_name` that is not the current
/// one and should be swept.
pub fn is_stale_license_secret(name: &str, resource_name: &str, keep: Option<&str>) -> bool {
    name.starts_with(&format!("{resource_name}-"))
        && name.ends_with("-license")
        && Some(name) != keep
}

/// Deletes every license secret for `resource_name` except `keep`. Stale
/// secrets from prior licenses linger until this sweep compares their
/// names against the current expected one.
pub async fn sweep_license_secrets(
    client: &Client,
    namespace: &str,
    resource_name: &str,
    keep: Option<&str>,
) -> Result<(), ProvisionerError> {
    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secrets = api
        .list(&Default::default())
        .await
        .with_context(|| format!("listing secrets in {namespace} for license sweep"))?;

    for secret in secrets.items {
        let Some(name) = secret.metadata.name.as_deref() else {
            continue;
        };
        if !is_stale_license_secret(name, resource_name, keep) {
            continue;
        }
        info!("sweeping stale license secret {}/{}", namespace, name);
        delete_secret(client, namespace, name).await?;
    }
    Ok(())
}

/// Applies the namespace-level network-isolation policy: workload pods
/// accept ingress only from within their own namespace. Idempotent.
pub async fn apply_network_policy(
    client: &Client,
    namespace: &str,
    resource_name: &str,
) -> Result<(), ProvisionerError> {
    let policy_name = format!("{resource_name}-isolation");
    let mut pod_labels = BTreeMap::new();
    pod_labels.insert(LABEL_APP.to_string(), resource_name.to_string());

    let policy = NetworkPolicy {
        metadata: ObjectMeta {
            name: Some(policy_name.clone()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(NetworkPolicySpec {
            pod_selector: Some(LabelSelector {
                match_labels: Some(pod_labels),
                ..Default::default()
            }),
            ingress: Some(vec![NetworkPolicyIngressRule {
                from: Some(vec![NetworkPolicyPeer {
                    pod_selector: Some(LabelSelector::default()),
                    ..Default::default()
                }]),
                ..Default::default()
            }]),
            policy_types: Some(vec!["Ingress".to_string()]),
            ..Default::default()
        }),
    };

    let api: Api<NetworkPolicy> = Api::namespaced(client.clone(), namespace);
    match api.create(&PostParams::default(), &policy).await {
        Ok(_) => {
            info!("applied network policy {}/{}", namespace, policy_name);
            Ok(())
        }
        Err(e) if is_already_exists(&e) => {
            debug!("network policy {}/{} already present", namespace, policy_name);
            Ok(())
        }
        Err(e) => {
            Err(e).with_context(|| format!("applying network policy {namespace}/{policy_name}"))
        }
    }
}
