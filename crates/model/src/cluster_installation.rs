//! Cluster installation binding
//!
//! The binding between one installation and one cluster: which namespace
//! the workload lives in and what state the binding is in.

use serde::{Deserialize, Serialize};

/// Binding lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ClusterInstallationState {
    /// Workload resource created, awaiting convergence
    #[default]
    CreationRequested,
    /// Workload resource converged to the installation's configuration
    Stable,
    /// Reconciling toward an updated configuration
    Reconciling,
    /// Queued for removal
    DeletionRequested,
}

/// One installation placed on one cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterInstallation {
    /// Stable identifier assigned by the store
    pub id: String,

    /// The cluster this binding targets
    pub cluster_id: String,

    /// The installation being placed
    pub installation_id: String,

    /// Namespace holding the workload resource and its secrets
    pub namespace: String,

    /// Binding lifecycle state
    #[serde(default)]
    pub state: ClusterInstallationState,
}
