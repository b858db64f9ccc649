//! Integration tests for the helm client
//!
//! These tests require a helm binary and a reachable cluster.
//! Set HELM_BINARY and HELM_KUBECONFIG environment variables to run.

use helm_client::{HelmCli, HelmClientTrait};

fn client_from_env() -> HelmCli {
    let binary = std::env::var("HELM_BINARY").unwrap_or_else(|_| "helm".to_string());
    let kubeconfig =
        std::env::var("HELM_KUBECONFIG").expect("HELM_KUBECONFIG environment variable must be set");
    HelmCli::new(binary, kubeconfig)
}

#[tokio::test]
#[ignore] // Requires helm and a reachable cluster
async fn test_list_releases() {
    let client = client_from_env();

    let releases = client.list().await.expect("Failed to list releases");
    println!("Found {} releases", releases.len());
}

#[tokio::test]
#[ignore]
async fn test_uninstall_absent_release_is_ok() {
    let client = client_from_env();

    client
        .uninstall("definitely-not-installed", "default")
        .await
        .expect("Uninstall of an absent release should succeed");
}
