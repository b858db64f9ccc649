//! Helm release models
//!
//! Shapes matching `helm list --output json`.

use serde::{Deserialize, Serialize};

/// One installed chart release as reported by `helm list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Release name
    pub name: String,

    /// Namespace the release is installed into
    pub namespace: String,

    /// Release revision counter
    #[serde(default)]
    pub revision: String,

    /// Last-updated timestamp, as helm formats it
    #[serde(default)]
    pub updated: String,

    /// Release status (deployed, failed, ...)
    #[serde(default)]
    pub status: String,

    /// Chart identifier in `<name>-<version>` form,
    /// for example `ingress-nginx-4.10.0`
    pub chart: String,

    /// Application version declared by the chart
    #[serde(default)]
    pub app_version: String,
}

impl Release {
    /// Extracts the chart version by stripping a known `<chart-name>-`
    /// prefix from the chart identifier. Returns `None` when the chart
    /// field does not carry that prefix.
    pub fn chart_version(&self, chart_name: &str) -> Option<&str> {
        self.chart.strip_prefix(chart_name)?.strip_prefix('-')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(chart: &str) -> Release {
        Release {
            name: "ingress-nginx".to_string(),
            namespace: "nginx".to_string(),
            revision: "3".to_string(),
            updated: String::new(),
            status: "deployed".to_string(),
            chart: chart.to_string(),
            app_version: "1.10.0".to_string(),
        }
    }

    #[test]
    fn chart_version_strips_name_prefix() {
        assert_eq!(
            release("ingress-nginx-4.10.0").chart_version("ingress-nginx"),
            Some("4.10.0")
        );
    }

    #[test]
    fn chart_version_rejects_other_charts() {
        assert_eq!(release("fluent-bit-0.46.2").chart_version("ingress-nginx"), None);
    }

    #[test]
    fn list_json_deserializes() {
        let json = r#"[{"name":"ingress-nginx","namespace":"nginx","revision":"3",
            "updated":"2026-08-01 10:00:00.000000 +0000 UTC","status":"deployed",
            "chart":"ingress-nginx-4.10.0","app_version":"1.10.0"}]"#;
        let releases: Vec<Release> = serde_json::from_str(json).unwrap();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].chart_version("ingress-nginx"), Some("4.10.0"));
    }
}
