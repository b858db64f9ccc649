//! MeetMesh CRD (current v1beta1 dialect)
//!
//! The current workload schema. Database and filestore wiring are
//! structured blocks where "absent" means operator-managed, ingress is a
//! nested object, and the status carries an observed-generation counter
//! so readiness can be judged without racing the operator's reconcile
//! cycle.

use crate::env::EnvVar;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "installation.meetmesh.io",
    version = "v1beta1",
    kind = "MeetMesh",
    namespaced,
    status = "MeetMeshStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct MeetMeshSpec {
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

    /// Ingress configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress: Option<Ingress>,

    /// Name of the license secret; empty when unlicensed
    #[serde(default)]
    pub license_secret: String,

    /// Database wiring; `external: None` means operator-managed
    #[serde(default)]
    pub database: Database,

    /// Object-storage wiring; `external: None` means operator-managed
    #[serde(default)]
    pub file_store: FileStore,

    /// Environment variables injected into the workload containers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meet_mesh_env: Vec<EnvVar>,

    /// Labels propagated to every object the operator creates
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resource_labels: BTreeMap<String, String>,
}

/// Ingress configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ingress {
    /// Hostname the workload is served on
    pub host: String,

    /// Ingress annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// Database wiring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    /// External database connection, if not operator-managed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<ExternalDatabase>,
}

/// Connection details for an externally managed database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalDatabase {
    /// Secret holding the connection credentials
    pub secret: String,
}

/// Object-storage wiring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileStore {
    /// External storage connection, if not operator-managed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<ExternalFileStore>,
}

/// Connection details for externally managed object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalFileStore {
    /// Storage endpoint URL
    pub url: String,
    /// Bucket name
    pub bucket: String,
    /// Secret holding the access credentials
    pub secret: String,
}

/// Status reported by the current operator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeetMeshStatus {
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

    /// Spec generation the reported status corresponds to. Status fields
    /// can lag a spec write by one operator reconcile cycle; readiness
    /// requires this to have caught up with `metadata.generation`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Service endpoint, once known
    #[serde(default)]
    pub endpoint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_managed_wiring_serializes_empty() {
        let spec = MeetMeshSpec {
            version: "6.2.0".to_string(),
            image: "meetmesh/server".to_string(),
            size: "100users".to_string(),
            replicas: None,
            ingress: Some(Ingress {
                host: "inst1.meetmesh.cloud".to_string(),
                annotations: BTreeMap::new(),
            }),
            license_secret: String::new(),
            database: Database::default(),
            file_store: FileStore::default(),
            meet_mesh_env: vec![],
            resource_labels: BTreeMap::new(),
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert!(json["database"].get("external").is_none());
        assert_eq!(json["ingress"]["host"], serde_json::json!("inst1.meetmesh.cloud"));
    }

    #[test]
    fn external_wiring_round_trips() {
        let db = Database {
            external: Some(ExternalDatabase {
                secret: "mm-inst-db".to_string(),
            }),
        };
        let json = serde_json::to_string(&db).unwrap();
        let back: Database = serde_json::from_str(&json).unwrap();
        assert_eq!(back, db);
    }
}
