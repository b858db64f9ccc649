//! Mock HelmClient for unit testing
//!
//! Stores releases in memory so tracker logic can be exercised without a
//! helm binary or a cluster. Failure injection flips every call into an
//! error to test the invalidate-and-retry paths.

use crate::error::HelmError;
use crate::helm_trait::{HelmClientTrait, UpgradeRequest};
use crate::models::Release;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Mock HelmClient for testing
#[derive(Clone, Default)]
pub struct MockHelmClient {
    // Keyed by (release name, namespace)
    releases: Arc<Mutex<HashMap<(String, String), Release>>>,
    // Values paths seen by upgrade calls, for asserting token substitution
    seen_values: Arc<Mutex<Vec<String>>>,
    fail: Arc<AtomicBool>,
}

impl std::fmt::Debug for MockHelmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockHelmClient").finish_non_exhaustive()
    }
}

impl MockHelmClient {
    /// Create an empty mock client
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a release (for test setup)
    pub fn add_release(&self, release: Release) {
        self.releases
            .lock()
            .unwrap()
            .insert((release.name.clone(), release.namespace.clone()), release);
    }

    /// Make every subsequent call fail
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Values paths passed to `upgrade`, oldest first
    pub fn seen_values_paths(&self) -> Vec<String> {
        self.seen_values.lock().unwrap().clone()
    }

    fn check_fail(&self, command: &str) -> Result<(), HelmError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(HelmError::CommandFailed {
                command: command.to_string(),
                stderr: "mock failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl HelmClientTrait for MockHelmClient {
    async fn upgrade(&self, request: &UpgradeRequest) -> Result<(), HelmError> {
        self.check_fail("upgrade")?;
        if let Some(values) = &request.values_path {
            self.seen_values.lock().unwrap().push(values.clone());
        }

        // Record the release the way helm list would report it:
        // chart is "<short-name>-<version>".
        let short_name = request
            .chart
            .rsplit('/')
            .next()
            .unwrap_or(&request.chart)
            .to_string();
        let chart = match &request.version {
            Some(version) => format!("{short_name}-{version}"),
            None => format!("{short_name}-0.0.0"),
        };

        let mut releases = self.releases.lock().unwrap();
        let key = (request.release_name.clone(), request.namespace.clone());
        let revision = releases
            .get(&key)
            .and_then(|r| r.revision.parse::<u32>().ok())
            .unwrap_or(0)
            + 1;
        releases.insert(
            key,
            Release {
                name: request.release_name.clone(),
                namespace: request.namespace.clone(),
                revision: revision.to_string(),
                updated: String::new(),
                status: "deployed".to_string(),
                chart,
                app_version: String::new(),
            },
        );
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Release>, HelmError> {
        self.check_fail("list")?;
        let mut releases: Vec<Release> = self.releases.lock().unwrap().values().cloned().collect();
        releases.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(releases)
    }

    async fn uninstall(&self, release_name: &str, namespace: &str) -> Result<(), HelmError> {
        self.check_fail("uninstall")?;
        self.releases
            .lock()
            .unwrap()
            .remove(&(release_name.to_string(), namespace.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upgrade_then_list_reports_chart_version() {
        let mock = MockHelmClient::new();
        mock.upgrade(&UpgradeRequest {
            chart: "ingress-nginx/ingress-nginx".to_string(),
            release_name: "ingress-nginx".to_string(),
            namespace: "nginx".to_string(),
            values_path: None,
            set_args: vec![],
            version: Some("4.10.0".to_string()),
        })
        .await
        .unwrap();

        let releases = mock.list().await.unwrap();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].chart, "ingress-nginx-4.10.0");
        assert_eq!(releases[0].revision, "1");
    }

    #[tokio::test]
    async fn uninstall_removes_release() {
        let mock = MockHelmClient::new();
        mock.upgrade(&UpgradeRequest {
            chart: "fluent/fluent-bit".to_string(),
            release_name: "fluent-bit".to_string(),
            namespace: "logging".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

        mock.uninstall("fluent-bit", "logging").await.unwrap();
        assert!(mock.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failure_injection_fails_all_calls() {
        let mock = MockHelmClient::new();
        mock.set_fail(true);
        assert!(mock.list().await.is_err());
    }
}
