//! Helm CLI invocation

use crate::error::HelmError;
use crate::helm_trait::{HelmClientTrait, UpgradeRequest};
use crate::models::Release;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, warn};

/// Client that shells out to the helm binary, bound to one cluster's
/// kubeconfig.
#[derive(Debug, Clone)]
pub struct HelmCli {
    binary: PathBuf,
    kubeconfig: PathBuf,
}

impl HelmCli {
    /// Creates a client for the given helm binary and kubeconfig.
    pub fn new(binary: impl Into<PathBuf>, kubeconfig: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            kubeconfig: kubeconfig.into(),
        }
    }

    /// The kubeconfig this client is bound to.
    pub fn kubeconfig(&self) -> &Path {
        &self.kubeconfig
    }

    async fn run(&self, subcommand: &str, args: &[String]) -> Result<String, HelmError> {
        debug!("helm {} {}", subcommand, args.join(" "));
        let output = Command::new(&self.binary)
            .arg(subcommand)
            .args(args)
            .arg("--kubeconfig")
            .arg(&self.kubeconfig)
            .output()
            .await?;

        if !output.status.success() {
            return Err(HelmError::CommandFailed {
                command: subcommand.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait::async_trait]
impl HelmClientTrait for HelmCli {
    async fn upgrade(&self, request: &UpgradeRequest) -> Result<(), HelmError> {
        let mut args = vec![
            "--install".to_string(),
            request.release_name.clone(),
            request.chart.clone(),
            "--namespace".to_string(),
            request.namespace.clone(),
            "--create-namespace".to_string(),
            "--wait".to_string(),
        ];
        if let Some(values) = &request.values_path {
            args.push("-f".to_string());
            args.push(values.clone());
        }
        for set in &request.set_args {
            args.push("--set".to_string());
            args.push(set.clone());
        }
        if let Some(version) = &request.version {
            args.push("--version".to_string());
            args.push(version.clone());
        }

        self.run("upgrade", &args).await?;
        debug!("helm release {} upgraded", request.release_name);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Release>, HelmError> {
        let stdout = self
            .run(
                "list",
                &[
                    "--all-namespaces".to_string(),
                    "--output".to_string(),
                    "json".to_string(),
                ],
            )
            .await?;
        let releases: Vec<Release> = serde_json::from_str(&stdout)?;
        Ok(releases)
    }

    async fn uninstall(&self, release_name: &str, namespace: &str) -> Result<(), HelmError> {
        let result = self
            .run(
                "uninstall",
                &[
                    release_name.to_string(),
                    "--namespace".to_string(),
                    namespace.to_string(),
                ],
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            // Uninstall of an absent release is a success for callers that
            // just want the release gone.
            Err(HelmError::CommandFailed { stderr, .. }) if stderr.contains("not found") => {
                warn!("helm release {} already absent", release_name);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
