// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `filter.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::addon::StaticAddon;
    use crate::labels::{ADDON_NAME_LABEL, CLUSTER_NAME_LABEL};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    fn filter() -> CsrEventFilter {
        let registry = AddonRegistry::builder()
            .register(StaticAddon::new("foo", None))
            .build();
        CsrEventFilter::new(Arc::new(registry))
    }

    fn csr(name: Option<&str>, labels: &[(&str, &str)]) -> CertificateSigningRequest {
        let labels: BTreeMap<String, String> = labels
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        CertificateSigningRequest {
            metadata: ObjectMeta {
                name: name.map(String::from),
                labels: if labels.is_empty() {
                    None
                } else {
                    Some(labels)
                },
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_accepts_registered_addon_csr() {
        let filter = filter();
        let csr = csr(
            Some("addon-cluster1-foo-abc"),
            &[(ADDON_NAME_LABEL, "foo"), (CLUSTER_NAME_LABEL, "cluster1")],
        );
        assert!(filter.accepts(&csr));
        assert_eq!(
            filter.queue_key(&csr).as_deref(),
            Some("addon-cluster1-foo-abc")
        );
    }

    #[test]
    fn test_rejects_name_without_prefix() {
        let filter = filter();
        let csr = csr(Some("node-csr-xyz"), &[(ADDON_NAME_LABEL, "foo")]);
        assert!(!filter.accepts(&csr));
        assert!(filter.queue_key(&csr).is_none());
    }

    #[test]
    fn test_prefix_match_is_literal() {
        // Only the prefix is checked, no separator is required
        let filter = filter();
        let csr = csr(Some("addonfoo"), &[(ADDON_NAME_LABEL, "foo")]);
        assert!(filter.accepts(&csr));
    }

    #[test]
    fn test_rejects_unlabelled_csr() {
        let filter = filter();
        assert!(!filter.accepts(&csr(Some("addon-cluster1-foo-abc"), &[])));

        let mut empty_labels = csr(Some("addon-cluster1-foo-abc"), &[]);
        empty_labels.metadata.labels = Some(BTreeMap::new());
        assert!(!filter.accepts(&empty_labels));
    }

    #[test]
    fn test_rejects_unregistered_addon() {
        let filter = filter();
        let csr = csr(Some("addon-cluster1-bar-abc"), &[(ADDON_NAME_LABEL, "bar")]);
        assert!(!filter.accepts(&csr));
    }

    #[test]
    fn test_rejects_missing_addon_label() {
        let filter = filter();
        let csr = csr(
            Some("addon-cluster1-foo-abc"),
            &[(CLUSTER_NAME_LABEL, "cluster1")],
        );
        assert!(!filter.accepts(&csr));
    }

    #[test]
    fn test_rejects_nameless_csr() {
        let filter = filter();
        assert!(!filter.accepts(&csr(None, &[(ADDON_NAME_LABEL, "foo")])));
    }
}
