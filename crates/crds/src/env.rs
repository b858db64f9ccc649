//! Environment-variable types shared by both CR dialects
//!
//! A small mirror of the core/v1 EnvVar shape: either a literal value or
//! a reference into a secret. Defined here rather than reusing the
//! k8s-openapi types so the CRD schema stays self-contained.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One environment variable injected into the workload containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    /// Variable name
    pub name: String,

    /// Literal value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Value sourced from another object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<EnvVarSource>,
}

impl EnvVar {
    /// Literal-valued variable.
    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            value_from: None,
        }
    }

    /// Variable sourced from a secret key.
    pub fn from_secret(
        name: impl Into<String>,
        secret: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: None,
            value_from: Some(EnvVarSource {
                secret_key_ref: Some(SecretKeySelector {
                    name: secret.into(),
                    key: key.into(),
                }),
            }),
        }
    }
}

/// Source for an environment variable's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvVarSource {
    /// Selects a key of a secret in the workload's namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key_ref: Option<SecretKeySelector>,
}

/// Selects a key of a secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeySelector {
    /// Secret name
    pub name: String,
    /// Key within the secret's data
    pub key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_var_serializes_camel_case() {
        let var = EnvVar::from_secret("MM_SQLSETTINGS_DATASOURCE", "db-secret", "DB_CONNECTION_STRING");
        let json = serde_json::to_value(&var).unwrap();
        assert_eq!(
            json["valueFrom"]["secretKeyRef"]["name"],
            serde_json::json!("db-secret")
        );
        assert!(json.get("value").is_none());
    }
}
