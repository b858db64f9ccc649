//! HelmClient trait for mocking
//!
//! Abstracts the helm binary so the utility tracker can be unit tested
//! without a cluster. The concrete `HelmCli` implements this trait; tests
//! use `MockHelmClient`.

use crate::error::HelmError;
use crate::models::Release;

/// Parameters for an idempotent install-or-upgrade invocation.
#[derive(Debug, Clone, Default)]
pub struct UpgradeRequest {
    /// Chart reference (repo/chart or a local path)
    pub chart: String,
    /// Release name to install or upgrade
    pub release_name: String,
    /// Target namespace (created if absent)
    pub namespace: String,
    /// Values file path or URL, if any
    pub values_path: Option<String>,
    /// Extra `--set key=value` arguments
    pub set_args: Vec<String>,
    /// Chart version pin; `None` installs the latest
    pub version: Option<String>,
}

/// Trait for the chart deployment tool operations the provisioner needs.
///
/// All async methods must be `Send` to work with Tokio's work-stealing
/// runtime.
#[async_trait::async_trait]
pub trait HelmClientTrait: Send + Sync {
    /// Install the release if absent, upgrade it otherwise.
    async fn upgrade(&self, request: &UpgradeRequest) -> Result<(), HelmError>;

    /// List installed releases across all namespaces.
    async fn list(&self) -> Result<Vec<Release>, HelmError>;

    /// Uninstall a release. Absent releases are not an error.
    async fn uninstall(&self, release_name: &str, namespace: &str) -> Result<(), HelmError>;
}
