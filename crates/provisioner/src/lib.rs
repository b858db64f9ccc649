//! MeetMesh installation lifecycle reconciler
//!
//! The core of the meshops provisioning service. Given a
//! `(Cluster, Installation, ClusterInstallation)` triple from the external
//! scheduling loop, this crate:
//!
//! - maintains cached, invalidate-on-error client handles to each
//!   cluster's API endpoint (`registry`)
//! - converges the installation's desired configuration into the
//!   cluster-side workload resource, across both operator schema dialects
//!   behind one trait (`reconciler`)
//! - runs ephemeral one-shot Jobs for command execution and
//!   backup/restore, with bounded polling (`exec`, `jobs`, `backup`)
//! - tracks desired-vs-actual versions for auxiliary cluster utilities
//!   deployed via charts (`utilities`)
//!
//! Everything here is a client of the remote cluster API; no listener,
//! watcher, or scheduling loop is owned by this crate.

pub mod access;
pub mod backup;
pub mod error;
pub mod exec;
pub mod generators;
pub mod jobs;
pub mod reconciler;
pub mod registry;
pub mod utilities;

#[cfg(test)]
mod test_utils;

pub use error::ProvisionerError;
pub use reconciler::InstallationProvisioner;
pub use registry::{ClientRegistry, ClusterHandle};
