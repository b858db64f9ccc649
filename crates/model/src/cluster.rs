//! Cluster record
//!
//! A shared Kubernetes cluster that installations are scheduled onto.
//! Long-lived; the reconciler and the utility tracker mutate its utility
//! version metadata as convergence proceeds. Cluster deletion belongs to
//! infrastructure teardown and never happens here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// CR-version tag for clusters whose operator serves the legacy
/// `meetmesh.com/v1alpha1 ClusterInstallation` schema.
pub const CR_VERSION_V1ALPHA1: &str = "meetmesh.com/v1alpha1";

/// CR-version tag for clusters whose operator serves the current
/// `installation.meetmesh.io/v1beta1 MeetMesh` schema.
pub const CR_VERSION_V1BETA1: &str = "installation.meetmesh.io/v1beta1";

/// A shared Kubernetes cluster known to the provisioning service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Cluster {
    /// Stable identifier assigned by the store
    pub id: String,

    /// Cluster name known to the orchestration backend; also the key used
    /// to export access credentials for it
    pub provisioner_name: String,

    /// Network the cluster was built into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_id: Option<String>,

    /// Availability zones the node pools span
    #[serde(default)]
    pub zones: Vec<String>,

    /// Which workload CR schema the cluster's in-cluster operator serves.
    /// Empty or unknown tags are treated as the newest schema.
    #[serde(default)]
    pub cr_version: String,

    /// Desired and observed versions for the auxiliary utilities deployed
    /// on this cluster
    #[serde(default)]
    pub utility_metadata: UtilityMetadata,

    /// Record creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Cluster {
    /// Returns the CR-version tag, defaulting empty tags to the newest
    /// schema so freshly imported clusters reconcile without backfill.
    pub fn cr_version(&self) -> &str {
        if self.cr_version.is_empty() {
            CR_VERSION_V1BETA1
        } else {
            &self.cr_version
        }
    }
}

/// Desired-vs-actual version pairs for the cluster's auxiliary utilities.
///
/// Desired versions are operator input; actual versions are derived from
/// the live chart release list after every successful upgrade.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UtilityMetadata {
    /// Utility name to requested chart version
    #[serde(default)]
    pub desired_versions: HashMap<String, String>,

    /// Utility name to last observed chart version
    #[serde(default)]
    pub actual_versions: HashMap<String, String>,
}

impl UtilityMetadata {
    /// Requested version for a utility, if one was set.
    pub fn desired_version(&self, utility: &str) -> Option<&str> {
        self.desired_versions.get(utility).map(String::as_str)
    }

    /// Records the version observed on the cluster after an upgrade.
    pub fn set_actual_version(&mut self, utility: &str, version: &str) {
        self.actual_versions
            .insert(utility.to_string(), version.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cr_version_defaults_to_newest() {
        let mut cluster = Cluster {
            id: "c1".to_string(),
            provisioner_name: "c1.k8s.meetmesh.io".to_string(),
            network_id: None,
            zones: vec![],
            cr_version: String::new(),
            utility_metadata: UtilityMetadata::default(),
            create_at: None,
        };
        assert_eq!(cluster.cr_version(), CR_VERSION_V1BETA1);

        cluster.cr_version = CR_VERSION_V1ALPHA1.to_string();
        assert_eq!(cluster.cr_version(), CR_VERSION_V1ALPHA1);
    }

    #[test]
    fn utility_metadata_round_trip() {
        let mut meta = UtilityMetadata::default();
        assert_eq!(meta.desired_version("ingress-nginx"), None);

        meta.desired_versions
            .insert("ingress-nginx".to_string(), "4.10.0".to_string());
        assert_eq!(meta.desired_version("ingress-nginx"), Some("4.10.0"));

        meta.set_actual_version("ingress-nginx", "4.10.0");
        assert_eq!(
            meta.actual_versions.get("ingress-nginx").map(String::as_str),
            Some("4.10.0")
        );
    }
}
