//! Remote cluster access provider
//!
//! Collaborator that exports access credentials (a kubeconfig) for a
//! named cluster. Invoked once per registry cache miss; the registry owns
//! the resulting file's lifetime.

use crate::error::ProvisionerError;
use std::env;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

/// Exports access credentials for a named cluster.
#[async_trait::async_trait]
pub trait ClusterAccess: Send + Sync {
    /// Writes a kubeconfig for `cluster_name` and returns its path.
    async fn export_access(&self, cluster_name: &str) -> Result<PathBuf, ProvisionerError>;
}

/// Access provider that shells out to the orchestration backend's CLI
/// (`<binary> export kubeconfig <cluster> --state <store>`).
#[derive(Debug, Clone)]
pub struct CommandClusterAccess {
    binary: PathBuf,
    state_store: String,
    export_dir: PathBuf,
}

impl CommandClusterAccess {
    /// Creates a provider for the given CLI binary and state store,
    /// exporting kubeconfigs under `export_dir`.
    pub fn new(
        binary: impl Into<PathBuf>,
        state_store: impl Into<String>,
        export_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            binary: binary.into(),
            state_store: state_store.into(),
            export_dir: export_dir.into(),
        }
    }

    /// Builds a provider from the environment:
    /// `CLUSTER_ACCESS_BINARY` (default `kops`),
    /// `CLUSTER_ACCESS_STATE_STORE` (required),
    /// `CLUSTER_ACCESS_EXPORT_DIR` (default under the system temp dir).
    pub fn from_env() -> Result<Self, ProvisionerError> {
        let binary = env::var("CLUSTER_ACCESS_BINARY").unwrap_or_else(|_| "kops".to_string());
        let state_store = env::var("CLUSTER_ACCESS_STATE_STORE").map_err(|_| {
            ProvisionerError::InvalidConfig(
                "CLUSTER_ACCESS_STATE_STORE environment variable is required".to_string(),
            )
        })?;
        let export_dir = env::var("CLUSTER_ACCESS_EXPORT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir().join("meshops-kubeconfigs"));
        Ok(Self::new(binary, state_store, export_dir))
    }
}

#[async_trait::async_trait]
impl ClusterAccess for CommandClusterAccess {
    async fn export_access(&self, cluster_name: &str) -> Result<PathBuf, ProvisionerError> {
        tokio::fs::create_dir_all(&self.export_dir).await?;
        let path = self.export_dir.join(format!("{cluster_name}.kubeconfig"));

        debug!("exporting kubeconfig for cluster {}", cluster_name);
        let output = Command::new(&self.binary)
            .arg("export")
            .arg("kubeconfig")
            .arg(cluster_name)
            .arg("--state")
            .arg(&self.state_store)
            .arg("--admin")
            .arg("--kubeconfig")
            .arg(&path)
            .output()
            .await?;

        if !output.status.success() {
            return Err(ProvisionerError::Setup(format!(
                "exporting access for cluster {}: {}",
                cluster_name,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(path)
    }
}
