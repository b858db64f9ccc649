//! Unit tests for the legacy v1alpha1 strategy's field mapping

#[cfg(test)]
mod tests {
    use crate::generators::fixtures::StaticDatabaseGenerator;
    use crate::generators::DatabaseGenerator;
    use crate::reconciler::common;
    use crate::reconciler::v1alpha1::V1Alpha1Reconciler;
    use crate::test_utils::{test_binding, test_installation};
    use crds::STATE_STABLE;

    fn build_resource() -> crds::ClusterInstallation {
        let installation = test_installation();
        let binding = test_binding();
        let license = common::license_secret_name("mm-w3c9", "L1");
        V1Alpha1Reconciler::build_resource(&installation, &binding, None, None, Some(&license))
    }

    #[test]
    fn build_resource_projects_installation_into_flat_fields() {
        let resource = build_resource();

        assert_eq!(resource.metadata.name.as_deref(), Some("mm-w3c9"));
        assert_eq!(resource.spec.version, "6.2.0");
        assert_eq!(resource.spec.ingress_name, "inst1.meetmesh.cloud");
        assert!(!resource.spec.ingress_annotations.is_empty());
        assert!(resource.spec.meet_mesh_license_secret.starts_with("mm-w3c9-"));
        assert_eq!(resource.spec.database_secret, "");
        assert_eq!(resource.spec.filestore_secret, "");
    }

    #[tokio::test]
    async fn generated_database_lands_in_secret_name_field() {
        let installation = test_installation();
        let binding = test_binding();
        let db = StaticDatabaseGenerator
            .generate(&installation, &binding)
            .await
            .unwrap();

        let resource =
            V1Alpha1Reconciler::build_resource(&installation, &binding, db.as_ref(), None, None);
        assert_eq!(
            resource.spec.database_secret,
            "w3c9fkkji7fg8bxrky8pzzxotr-database"
        );
        assert_eq!(resource.spec.meet_mesh_license_secret, "");
    }

    #[test]
    fn verify_detects_version_image_and_env_drift() {
        let resource = build_resource();
        let installation = test_installation();
        assert!(V1Alpha1Reconciler::matches_installation(&resource, &installation));

        let mut drifted = installation.clone();
        drifted.version = "6.3.0".to_string();
        assert!(!V1Alpha1Reconciler::matches_installation(&resource, &drifted));

        let mut env_drift = installation.clone();
        env_drift.mesh_env =
            model::EnvVarMap::from_pairs([("MM_FEATUREFLAGS", "on"), ("MM_NEW", "1")]);
        assert!(!V1Alpha1Reconciler::matches_installation(&resource, &env_drift));
    }

    #[test]
    fn hibernation_round_trip_restores_running_shape() {
        let installation = test_installation();
        let mut resource = build_resource();
        let running = serde_json::to_value(&resource.spec).unwrap();

        resource.spec.replicas = Some(0);
        resource.spec.size = String::new();
        resource.spec.ingress_annotations = common::hibernating_ingress_annotations();
        assert_ne!(running, serde_json::to_value(&resource.spec).unwrap());

        V1Alpha1Reconciler::apply_installation(
            &mut resource,
            &installation,
            None,
            None,
            Some(&common::license_secret_name("mm-w3c9", "L1")),
        );
        assert_eq!(running, serde_json::to_value(&resource.spec).unwrap());
    }

    #[test]
    fn readiness_compares_replicas_and_version_directly() {
        let mut resource = build_resource();
        assert!(!V1Alpha1Reconciler::resource_ready(&resource));

        resource.status = Some(crds::ClusterInstallationStatus {
            state: STATE_STABLE.to_string(),
            version: "6.2.0".to_string(),
            image: "meetmesh/server".to_string(),
            replicas: 2,
            endpoint: String::new(),
        });
        assert!(V1Alpha1Reconciler::resource_ready(&resource));

        // Version still rolling out
        if let Some(status) = resource.status.as_mut() {
            status.version = "6.1.0".to_string();
        }
        assert!(!V1Alpha1Reconciler::resource_ready(&resource));

        // Hibernating spec: replicas pinned, status must match
        if let Some(status) = resource.status.as_mut() {
            status.version = "6.2.0".to_string();
        }
        resource.spec.replicas = Some(0);
        assert!(!V1Alpha1Reconciler::resource_ready(&resource));
        if let Some(status) = resource.status.as_mut() {
            status.replicas = 0;
        }
        assert!(V1Alpha1Reconciler::resource_ready(&resource));
    }
}
