//! Secret generators
//!
//! Collaborator contracts for database and object-storage credential
//! generation. A generator returning `Ok(None)` means "use the platform
//! default": the in-cluster operator manages the dependency itself and no
//! external secret is wired in.

use crate::error::ProvisionerError;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use model::{ClusterInstallation, Installation};
use std::collections::BTreeMap;

/// Database wiring produced by a generator.
#[derive(Debug, Clone)]
pub struct DatabaseResources {
    /// Credentials secret to upsert into the workload namespace
    pub secret: Secret,
}

impl DatabaseResources {
    /// Name of the credentials secret.
    pub fn secret_name(&self) -> &str {
        self.secret.metadata.name.as_deref().unwrap_or_default()
    }
}

/// Object-storage wiring produced by a generator.
#[derive(Debug, Clone)]
pub struct FilestoreResources {
    /// Storage endpoint URL
    pub url: String,
    /// Bucket name
    pub bucket: String,
    /// Credentials secret to upsert into the workload namespace
    pub secret: Secret,
}

impl FilestoreResources {
    /// Name of the credentials secret.
    pub fn secret_name(&self) -> &str {
        self.secret.metadata.name.as_deref().unwrap_or_default()
    }
}

/// Generates per-installation database credentials.
///
/// Generators are expected to be stable given stable inputs so repeated
/// reconciles do not churn secret content.
#[async_trait::async_trait]
pub trait DatabaseGenerator: Send + Sync {
    /// Produces the wiring for `installation`, or `None` for
    /// operator-managed databases.
    async fn generate(
        &self,
        installation: &Installation,
        binding: &ClusterInstallation,
    ) -> Result<Option<DatabaseResources>, ProvisionerError>;
}

/// Generates per-installation object-storage credentials.
#[async_trait::async_trait]
pub trait FilestoreGenerator: Send + Sync {
    /// Produces the wiring for `installation`, or `None` for
    /// operator-managed storage.
    async fn generate(
        &self,
        installation: &Installation,
        binding: &ClusterInstallation,
    ) -> Result<Option<FilestoreResources>, ProvisionerError>;
}

/// Platform-default database: the operator provisions its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperatorManagedDatabase;

#[async_trait::async_trait]
impl DatabaseGenerator for OperatorManagedDatabase {
    async fn generate(
        &self,
        _installation: &Installation,
        _binding: &ClusterInstallation,
    ) -> Result<Option<DatabaseResources>, ProvisionerError> {
        Ok(None)
    }
}

/// Platform-default object storage: the operator provisions its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperatorManagedFilestore;

#[async_trait::async_trait]
impl FilestoreGenerator for OperatorManagedFilestore {
    async fn generate(
        &self,
        _installation: &Installation,
        _binding: &ClusterInstallation,
    ) -> Result<Option<FilestoreResources>, ProvisionerError> {
        Ok(None)
    }
}

/// Builds a credentials secret from literal key/value pairs.
///
/// Shared by generator implementations; exposed for tests.
pub fn credentials_secret(
    name: &str,
    namespace: &str,
    data: BTreeMap<String, String>,
) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        string_data: Some(data),
        ..Default::default()
    }
}

#[cfg(test)]
pub mod fixtures {
    //! Deterministic generators for reconciler tests.

    use super::*;

    /// Always wires an external database secret named
    /// `<installation-id>-database`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct StaticDatabaseGenerator;

    #[async_trait::async_trait]
    impl DatabaseGenerator for StaticDatabaseGenerator {
        async fn generate(
            &self,
            installation: &Installation,
            binding: &ClusterInstallation,
        ) -> Result<Option<DatabaseResources>, ProvisionerError> {
            let name = format!("{}-database", installation.id);
            let mut data = BTreeMap::new();
            data.insert(
                "DB_CONNECTION_STRING".to_string(),
                format!("postgres://meshuser@db.internal/{}", installation.id),
            );
            Ok(Some(DatabaseResources {
                secret: credentials_secret(&name, &binding.namespace, data),
            }))
        }
    }

    /// Always wires an external filestore secret named
    /// `<installation-id>-filestore`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct StaticFilestoreGenerator;

    #[async_trait::async_trait]
    impl FilestoreGenerator for StaticFilestoreGenerator {
        async fn generate(
            &self,
            installation: &Installation,
            binding: &ClusterInstallation,
        ) -> Result<Option<FilestoreResources>, ProvisionerError> {
            let name = format!("{}-filestore", installation.id);
            let mut data = BTreeMap::new();
            data.insert("accesskey".to_string(), "AKIA-TEST".to_string());
            data.insert("secretkey".to_string(), "shhh".to_string());
            Ok(Some(FilestoreResources {
                url: "s3.amazonaws.com".to_string(),
                bucket: format!("meshops-{}", installation.id),
                secret: credentials_secret(&name, &binding.namespace, data),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_binding, test_installation};

    #[tokio::test]
    async fn operator_managed_generators_return_none() {
        let installation = test_installation();
        let binding = test_binding();

        let db = OperatorManagedDatabase
            .generate(&installation, &binding)
            .await
            .unwrap();
        assert!(db.is_none());

        let fs = OperatorManagedFilestore
            .generate(&installation, &binding)
            .await
            .unwrap();
        assert!(fs.is_none());
    }

    #[tokio::test]
    async fn static_generator_is_stable_given_stable_inputs() {
        let installation = test_installation();
        let binding = test_binding();

        let a = fixtures::StaticDatabaseGenerator
            .generate(&installation, &binding)
            .await
            .unwrap()
            .unwrap();
        let b = fixtures::StaticDatabaseGenerator
            .generate(&installation, &binding)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(a.secret_name(), b.secret_name());
        assert_eq!(a.secret.string_data, b.secret.string_data);
    }
}
