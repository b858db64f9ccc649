//! MeetMesh workload CRD definitions
//!
//! The declarative workload resource reconciled by the in-cluster
//! MeetMesh operator, in both schema dialects still live in the fleet:
//!
//! - `meetmesh.com/v1alpha1 ClusterInstallation` - the legacy schema
//! - `installation.meetmesh.io/v1beta1 MeetMesh` - the current schema
//!
//! Provisioning code never branches on a version string inline; it picks
//! one of the two strategy implementations in the `provisioner` crate and
//! works with exactly one of these types per cluster.

pub mod env;
pub mod v1alpha1;
pub mod v1beta1;

pub use env::*;
pub use v1alpha1::*;
pub use v1beta1::*;

/// Reported state once the operator has converged the resource.
pub const STATE_STABLE: &str = "stable";

/// Reported state while the operator is still working.
pub const STATE_RECONCILING: &str = "reconciling";
