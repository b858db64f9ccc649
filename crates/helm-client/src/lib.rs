//! Helm CLI wrapper
//!
//! A thin client around the `helm` binary for the chart operations the
//! provisioner needs: idempotent install-or-upgrade, release listing, and
//! uninstall. Every invocation is bound to one cluster via an explicit
//! kubeconfig path.
//!
//! # Example
//!
//! ```no_run
//! use helm_client::{HelmCli, HelmClientTrait, UpgradeRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let helm = HelmCli::new("/usr/local/bin/helm", "/tmp/cluster1.kubeconfig");
//!
//! // Install or upgrade a release
//! helm.upgrade(&UpgradeRequest {
//!     chart: "ingress-nginx/ingress-nginx".to_string(),
//!     release_name: "ingress-nginx".to_string(),
//!     namespace: "nginx".to_string(),
//!     values_path: Some("https://config.meetmesh.io/utilities/nginx.yaml".to_string()),
//!     set_args: vec![],
//!     version: Some("4.10.0".to_string()),
//! }).await?;
//!
//! // Inspect what is installed
//! let releases = helm.list().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod helm_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::HelmCli;
pub use error::HelmError;
pub use helm_trait::{HelmClientTrait, UpgradeRequest};
pub use models::Release;
#[cfg(feature = "test-util")]
pub use mock::MockHelmClient;
