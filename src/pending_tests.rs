// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `pending.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::addon::{AddonRegistry, StaticAddon};
    use crate::labels::{ADDON_NAME_LABEL, CLUSTER_NAME_LABEL};
    use k8s_openapi::api::certificates::v1::CertificateSigningRequestStatus;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use k8s_openapi::ByteString;

    fn index() -> PendingCsrIndex {
        let registry = AddonRegistry::builder()
            .register(StaticAddon::new("foo", None))
            .register(StaticAddon::new("bar", None))
            .build();
        PendingCsrIndex::new(CsrEventFilter::new(Arc::new(registry)))
    }

    fn csr(name: &str, addon: &str, cluster: &str, signed: bool) -> CertificateSigningRequest {
        let labels = BTreeMap::from([
            (ADDON_NAME_LABEL.to_string(), addon.to_string()),
            (CLUSTER_NAME_LABEL.to_string(), cluster.to_string()),
        ]);
        CertificateSigningRequest {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(labels),
                ..Default::default()
            },
            status: signed.then(|| CertificateSigningRequestStatus {
                certificate: Some(ByteString(b"cert".to_vec())),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn apply(index: &PendingCsrIndex, csr: CertificateSigningRequest) {
        index.apply_watcher_event(&watcher::Event::Apply(csr));
    }

    fn names(refs: &[ObjectRef<CertificateSigningRequest>]) -> Vec<String> {
        let mut names: Vec<String> = refs.iter().map(|r| r.name.clone()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_indexes_unsigned_accepted_csrs_by_cluster() {
        let index = index();
        apply(&index, csr("addon-c1-foo-1", "foo", "c1", false));
        apply(&index, csr("addon-c1-foo-2", "foo", "c1", true));
        apply(&index, csr("addon-c2-foo-1", "foo", "c2", false));
        apply(&index, csr("addon-c1-baz-1", "baz", "c1", false));
        apply(&index, csr("node-csr-1", "foo", "c1", false));

        assert_eq!(
            names(&index.pending("c1", None)),
            vec!["addon-c1-foo-1".to_string()]
        );
        assert_eq!(
            names(&index.pending("c2", None)),
            vec!["addon-c2-foo-1".to_string()]
        );
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_pending_narrowed_to_addon() {
        let index = index();
        apply(&index, csr("addon-c1-foo-1", "foo", "c1", false));
        apply(&index, csr("addon-c1-foo-2", "foo", "c1", false));
        apply(&index, csr("addon-c1-bar-1", "bar", "c1", false));

        assert_eq!(
            names(&index.pending("c1", Some("foo"))),
            vec!["addon-c1-foo-1".to_string(), "addon-c1-foo-2".to_string()]
        );
        assert_eq!(
            names(&index.pending("c1", Some("bar"))),
            vec!["addon-c1-bar-1".to_string()]
        );
        assert!(index.pending("c3", Some("foo")).is_empty());
    }

    #[test]
    fn test_signing_removes_csr() {
        let index = index();
        apply(&index, csr("addon-c1-foo-1", "foo", "c1", false));
        apply(&index, csr("addon-c1-foo-1", "foo", "c1", true));

        assert!(index.pending("c1", None).is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn test_delete_removes_csr() {
        let index = index();
        apply(&index, csr("addon-c1-foo-1", "foo", "c1", false));
        index.apply_watcher_event(&watcher::Event::Delete(csr(
            "addon-c1-foo-1",
            "foo",
            "c1",
            false,
        )));

        assert!(index.pending("c1", None).is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn test_relabeled_csr_moves_cluster() {
        let index = index();
        apply(&index, csr("addon-c1-foo-1", "foo", "c1", false));
        apply(&index, csr("addon-c1-foo-1", "foo", "c2", false));

        assert!(index.pending("c1", None).is_empty());
        assert_eq!(
            names(&index.pending("c2", None)),
            vec!["addon-c1-foo-1".to_string()]
        );
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_missing_cluster_label_is_not_indexed() {
        let index = index();
        let mut unlabeled = csr("addon-c1-foo-1", "foo", "c1", false);
        if let Some(labels) = unlabeled.metadata.labels.as_mut() {
            labels.remove(CLUSTER_NAME_LABEL);
        }
        apply(&index, unlabeled);

        assert!(index.is_empty());
    }

    #[test]
    fn test_relist_swaps_entries_on_init_done() {
        let index = index();
        apply(&index, csr("addon-c1-foo-old", "foo", "c1", false));

        index.apply_watcher_event(&watcher::Event::Init);
        index.apply_watcher_event(&watcher::Event::InitApply(csr(
            "addon-c1-foo-new",
            "foo",
            "c1",
            false,
        )));
        assert_eq!(
            names(&index.pending("c1", None)),
            vec!["addon-c1-foo-old".to_string()],
            "previous entries are served until the relist completes"
        );

        index.apply_watcher_event(&watcher::Event::InitDone);
        assert_eq!(
            names(&index.pending("c1", None)),
            vec!["addon-c1-foo-new".to_string()]
        );
    }

    #[test]
    fn test_empty_index() {
        let index = index();
        assert!(index.pending("c1", None).is_empty());
        assert!(index.is_empty());
    }
}
