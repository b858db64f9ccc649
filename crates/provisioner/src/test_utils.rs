//! Test utilities for unit testing the reconciler core
//!
//! Helpers for creating test records and cluster-side resources.

use model::{
    Cluster, ClusterInstallation, ClusterInstallationState, DatabaseType, EnvVarMap,
    FilestoreType, Installation, InstallationState, UtilityMetadata,
};

/// Helper to create a test cluster with the given CR-version tag
pub fn test_cluster(cr_version: &str) -> Cluster {
    Cluster {
        id: "cluster1".to_string(),
        provisioner_name: "cluster1.k8s.meetmesh.io".to_string(),
        network_id: Some("net-0001".to_string()),
        zones: vec!["us-east-1a".to_string()],
        cr_version: cr_version.to_string(),
        utility_metadata: UtilityMetadata::default(),
        create_at: None,
    }
}

/// Helper to create a test installation
pub fn test_installation() -> Installation {
    Installation {
        id: "w3c9fkkji7fg8bxrky8pzzxotr".to_string(),
        owner_id: "owner1".to_string(),
        group_id: None,
        version: "6.2.0".to_string(),
        image: "meetmesh/server".to_string(),
        size: "100users".to_string(),
        dns: "inst1.meetmesh.cloud".to_string(),
        license: Some("L1".to_string()),
        mesh_env: EnvVarMap::from_pairs([("MM_FEATUREFLAGS", "on")]),
        database: DatabaseType::OperatorManaged,
        filestore: FilestoreType::OperatorManaged,
        state: InstallationState::Stable,
    }
}

/// Helper to create the binding between `test_installation` and
/// `test_cluster`
pub fn test_binding() -> ClusterInstallation {
    ClusterInstallation {
        id: "binding1".to_string(),
        cluster_id: "cluster1".to_string(),
        installation_id: "w3c9fkkji7fg8bxrky8pzzxotr".to_string(),
        namespace: "w3c9fkkji7fg8bxrky8pzzxotr".to_string(),
        state: ClusterInstallationState::CreationRequested,
    }
}
