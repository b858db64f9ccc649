//! ClusterInstallation CRD (legacy v1alpha1 dialect)
//!
//! The original workload schema. Still served by operators on older
//! clusters; new clusters get the v1beta1 `MeetMesh` schema instead.
//! Notable quirks preserved from the original operator: database and
//! filestore wiring are plain secret-name strings, ingress is a bare
//! hostname plus annotation map, and the status carries no
//! observed-generation counter (readiness falls back to comparing
//! replicas and version).

use crate::env::EnvVar;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "meetmesh.com",
    version = "v1alpha1",
    kind = "ClusterInstallation",
    namespaced,
    status = "ClusterInstallationStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInstallationSpec {
    /// Application version tag
    pub version: String,

    /// Container image repository
    pub image: String,

    /// Size class interpreted by the operator; empty while hibernating
    #[serde(default)]
    pub size: String,

    /// Replica count; zero while hibernating
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Ingress hostname
    pub ingress_name: String,

    /// Ingress annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ingress_annotations: BTreeMap<String, String>,

    /// Name of the license secret; empty when unlicensed
    #[serde(default)]
    pub meet_mesh_license_secret: String,

    /// Name of the database credentials secret; empty for
    /// operator-managed databases
    #[serde(default)]
    pub database_secret: String,

    /// Name of the object-storage credentials secret; empty for
    /// operator-managed storage
    #[serde(default)]
    pub filestore_secret: String,

    /// Environment variables injected into the workload containers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meet_mesh_env: Vec<EnvVar>,

    /// Labels propagated to every object the operator creates
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resource_labels: BTreeMap<String, String>,
}

/// Status reported by the legacy operator.
///
/// No observed-generation counter: the operator predates generation
/// tracking, so readiness checks compare replicas and version instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInstallationStatus {
    /// Operator-reported state ("stable" once converged)
    #[serde(default)]
    pub state: String,

    /// Version the operator last rolled out
    #[serde(default)]
    pub version: String,

    /// Image the operator last rolled out
    #[serde(default)]
    pub image: String,

    /// Replicas currently running
    #[serde(default)]
    pub replicas: i32,

    /// Service endpoint, once known
    #[serde(default)]
    pub endpoint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_serializes_operator_field_names() {
        let spec = ClusterInstallationSpec {
            version: "6.2.0".to_string(),
            image: "meetmesh/server".to_string(),
            size: "100users".to_string(),
            replicas: None,
            ingress_name: "inst1.meetmesh.cloud".to_string(),
            ingress_annotations: BTreeMap::new(),
            meet_mesh_license_secret: String::new(),
            database_secret: "mm-inst-db".to_string(),
            filestore_secret: String::new(),
            meet_mesh_env: vec![EnvVar::literal("MM_FEATUREFLAGS", "on")],
            resource_labels: BTreeMap::new(),
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["ingressName"], serde_json::json!("inst1.meetmesh.cloud"));
        assert_eq!(json["meetMeshLicenseSecret"], serde_json::json!(""));
        assert_eq!(json["databaseSecret"], serde_json::json!("mm-inst-db"));
    }
}
