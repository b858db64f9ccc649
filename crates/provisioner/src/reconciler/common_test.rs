//! Unit tests for shared reconciliation mechanics

#[cfg(test)]
mod tests {
    use crate::reconciler::common::*;
    use crate::test_utils::{test_binding, test_installation};
    use model::EnvVarMap;

    #[test]
    fn resource_name_is_deterministic_and_prefixed() {
        let binding = test_binding();
        let a = make_cluster_installation_name(&binding);
        let b = make_cluster_installation_name(&binding);
        assert_eq!(a, b);
        assert_eq!(a, "mm-w3c9");
    }

    #[test]
    fn resource_name_respects_dns_label_limit() {
        let mut binding = test_binding();
        binding.namespace = "n".repeat(200);
        let name = make_cluster_installation_name(&binding);
        assert!(name.len() <= 63);
        assert!(name.starts_with("mm-"));
    }

    #[test]
    fn license_secret_name_is_content_addressed() {
        let name = make_cluster_installation_name(&test_binding());

        // Identical licenses and resource name produce identical names
        assert_eq!(
            license_secret_name(&name, "L1"),
            license_secret_name(&name, "L1")
        );

        // Differing licenses differ in their hash segment
        let l1 = license_secret_name(&name, "L1");
        let l2 = license_secret_name(&name, "L2");
        assert_ne!(l1, l2);
        assert!(l1.starts_with("mm-w3c9-"));
        assert!(l1.ends_with("-license"));
        assert!(l2.starts_with("mm-w3c9-"));
        assert!(l2.ends_with("-license"));
    }

    #[test]
    fn license_secret_carries_license_payload() {
        let secret = build_license_secret("mm-w3c9-abc123-license", "ns1", "L1");
        let data = secret.string_data.unwrap();
        assert_eq!(data.get("license").map(String::as_str), Some("L1"));
        assert_eq!(
            secret.metadata.namespace.as_deref(),
            Some("ns1"),
        );
    }

    #[test]
    fn merged_env_is_sorted_and_literal() {
        let mut installation = test_installation();
        installation.mesh_env = EnvVarMap::from_pairs([("MM_Z", "26"), ("MM_A", "1")]);

        let env = merged_env(&installation);
        let names: Vec<&str> = env.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["MM_A", "MM_Z"]);
        assert_eq!(env[0].value.as_deref(), Some("1"));
    }

    #[test]
    fn env_matches_detects_single_variable_drift() {
        let installation = test_installation();
        let env = merged_env(&installation);
        assert!(env_matches(&env, &installation));

        let mut drifted = installation.clone();
        drifted.mesh_env = EnvVarMap::from_pairs([("MM_FEATUREFLAGS", "off")]);
        assert!(!env_matches(&env, &drifted));

        let mut extra = installation.clone();
        extra.mesh_env = EnvVarMap::from_pairs([
            ("MM_FEATUREFLAGS", "on"),
            ("MM_EXTRA", "1"),
        ]);
        assert!(!env_matches(&env, &extra));
    }

    #[test]
    fn sweep_keeps_only_the_current_license_secret() {
        let name = make_cluster_installation_name(&test_binding());
        let current = license_secret_name(&name, "L2");
        let stale = license_secret_name(&name, "L1");

        assert!(is_stale_license_secret(&stale, &name, Some(&current)));
        assert!(!is_stale_license_secret(&current, &name, Some(&current)));

        // Non-license secrets under the same prefix are untouched
        assert!(!is_stale_license_secret(
            &format!("{name}-database"),
            &name,
            Some(&current)
        ));
        // Other installations' secrets are untouched
        assert!(!is_stale_license_secret(
            "mm-zzzz-abc123-license",
            &name,
            Some(&current)
        ));

        // With no license on the installation, every license secret goes
        assert!(is_stale_license_secret(&current, &name, None));
    }

    #[test]
    fn resource_labels_carry_group_membership() {
        let mut installation = test_installation();
        assert!(!resource_labels(&installation).contains_key("meetmesh.io/group-id"));

        installation.group_id = Some("group7".to_string());
        let labels = resource_labels(&installation);
        assert_eq!(
            labels.get("meetmesh.io/group-id").map(String::as_str),
            Some("group7")
        );
        assert_eq!(
            labels.get(LABEL_INSTALLATION_ID).map(String::as_str),
            Some(installation.id.as_str())
        );
    }

    #[test]
    fn hibernating_annotations_answer_gone() {
        let running = running_ingress_annotations();
        let hibernating = hibernating_ingress_annotations();
        assert_ne!(running, hibernating);
        assert!(hibernating
            .values()
            .any(|v| v.contains("410")));
    }
}
