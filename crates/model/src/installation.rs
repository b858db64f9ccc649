//! Installation record
//!
//! The desired configuration of one tenant's MeetMesh workload. Owned by
//! the external store; the reconciler reads it and projects it into the
//! cluster-side workload resource.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle intent for an installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum InstallationState {
    /// Serving traffic at its configured size
    #[default]
    Stable,
    /// Scaled to zero replicas with configuration retained
    Hibernating,
    /// Queued for removal from its cluster
    DeletionRequested,
}

/// Database backing for an installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DatabaseType {
    /// The in-cluster operator provisions its own database
    #[default]
    OperatorManaged,
    /// Credentials for a shared external database are generated per
    /// installation and wired in via a secret
    External,
}

/// Object-storage backing for an installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FilestoreType {
    /// The in-cluster operator provisions its own bucket
    #[default]
    OperatorManaged,
    /// Credentials for shared external object storage are generated per
    /// installation and wired in via a secret
    External,
}

/// Desired configuration for one tenant workload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Installation {
    /// Stable identifier assigned by the store
    pub id: String,

    /// Owning account
    pub owner_id: String,

    /// Installation group used for rollout batching, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,

    /// Application version tag
    pub version: String,

    /// Container image repository
    pub image: String,

    /// Size class interpreted by the in-cluster operator
    /// (for example "100users")
    pub size: String,

    /// Primary DNS hostname
    pub dns: String,

    /// License blob; empty means unlicensed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    /// Environment-variable overrides applied on top of generated wiring
    #[serde(default)]
    pub mesh_env: EnvVarMap,

    /// Database backing selection
    #[serde(default)]
    pub database: DatabaseType,

    /// Object-storage backing selection
    #[serde(default)]
    pub filestore: FilestoreType,

    /// Lifecycle intent
    #[serde(default)]
    pub state: InstallationState,
}

impl Installation {
    /// License text, treating an empty blob the same as no license.
    pub fn license(&self) -> Option<&str> {
        self.license.as_deref().filter(|l| !l.is_empty())
    }
}

/// Ordered name-to-value environment overrides.
///
/// A `BTreeMap` so projection into the workload resource is deterministic
/// regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVarMap(pub BTreeMap<String, String>);

impl EnvVarMap {
    /// Builds a map from name/value pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Iterates entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True when no overrides are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn license_treats_empty_as_absent() {
        let mut installation = Installation {
            id: "inst1".to_string(),
            owner_id: "owner1".to_string(),
            group_id: None,
            version: "6.2.0".to_string(),
            image: "meetmesh/server".to_string(),
            size: "100users".to_string(),
            dns: "inst1.meetmesh.cloud".to_string(),
            license: Some(String::new()),
            mesh_env: EnvVarMap::default(),
            database: DatabaseType::OperatorManaged,
            filestore: FilestoreType::OperatorManaged,
            state: InstallationState::Stable,
        };
        assert_eq!(installation.license(), None);

        installation.license = Some("L1".to_string());
        assert_eq!(installation.license(), Some("L1"));
    }

    #[test]
    fn env_var_map_iterates_in_name_order() {
        let env = EnvVarMap::from_pairs([("MM_B", "2"), ("MM_A", "1")]);
        let names: Vec<&str> = env.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["MM_A", "MM_B"]);
    }
}
