// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `events.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::sync::Arc;

    #[test]
    fn test_publishers_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NoopEventPublisher>();
        assert_send_sync::<KubeEventPublisher>();
    }

    #[test]
    fn test_signed_event() {
        let event = CsrEvent::signed("foo", "cluster1");

        assert_eq!(event.type_, EventType::Normal);
        assert_eq!(event.reason, "AddonCSRSigned");
        assert_eq!(event.action, "Sign");
        assert_eq!(
            event.note,
            "Signed certificate for add-on foo on cluster cluster1"
        );
    }

    #[test]
    fn test_event_conversion_keeps_note() {
        let event: Event = CsrEvent::signed("foo", "cluster1").into();

        assert_eq!(event.type_, EventType::Normal);
        assert_eq!(event.reason, "AddonCSRSigned");
        assert_eq!(event.action, "Sign");
        assert_eq!(
            event.note.as_deref(),
            Some("Signed certificate for add-on foo on cluster cluster1")
        );
        assert!(event.secondary.is_none());
    }

    #[test]
    fn test_reporter_instance() {
        let with_pod = reporter("addon-csr-signer", Some("signer-0".to_string()));
        assert_eq!(with_pod.controller, "addon-csr-signer");
        assert_eq!(with_pod.instance.as_deref(), Some("signer-0"));

        assert!(reporter("addon-csr-signer", None).instance.is_none());
    }

    #[tokio::test]
    async fn test_noop_publisher_behind_trait_object() {
        let publisher: Arc<dyn EventPublisher> = Arc::new(NoopEventPublisher);
        let csr = CertificateSigningRequest {
            metadata: ObjectMeta {
                name: Some("addon-cluster1-foo-abc".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        publisher
            .publish(&csr, CsrEvent::signed("foo", "cluster1"))
            .await;
    }
}
