// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes Events on signed CSRs.
//!
//! Once a certificate has been persisted the reconciler reports a [`CsrEvent`]
//! on the CSR, shown by `kubectl describe csr`. The certificate is already
//! stored at that point, so a failed publish is logged and otherwise ignored.

use crate::constants::{EVENT_ACTION_SIGN, EVENT_REASON_CSR_SIGNED};
use async_trait::async_trait;
use k8s_openapi::api::certificates::v1::CertificateSigningRequest;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::{Client, Resource, ResourceExt};
use tracing::warn;

/// An Event to record on a CSR.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsrEvent {
    pub type_: EventType,
    pub reason: &'static str,
    pub action: &'static str,
    pub note: String,
}

impl CsrEvent {
    /// `AddonCSRSigned` for a certificate issued to `addon` on `cluster`.
    #[must_use]
    pub fn signed(addon: &str, cluster: &str) -> Self {
        Self {
            type_: EventType::Normal,
            reason: EVENT_REASON_CSR_SIGNED,
            action: EVENT_ACTION_SIGN,
            note: format!("Signed certificate for add-on {addon} on cluster {cluster}"),
        }
    }
}

impl From<CsrEvent> for Event {
    fn from(event: CsrEvent) -> Self {
        Event {
            type_: event.type_,
            reason: event.reason.to_string(),
            note: Some(event.note),
            action: event.action.to_string(),
            secondary: None,
        }
    }
}

/// Sink for [`CsrEvent`]s.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, csr: &CertificateSigningRequest, event: CsrEvent);
}

/// Publisher that records Events through the API server.
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    /// Create a publisher reporting as `controller_name`, with the pod name
    /// from `POD_NAME` as the reporting instance.
    #[must_use]
    pub fn new(client: Client, controller_name: &str) -> Self {
        Self {
            recorder: Recorder::new(
                client,
                reporter(controller_name, std::env::var("POD_NAME").ok()),
            ),
        }
    }
}

fn reporter(controller_name: &str, instance: Option<String>) -> Reporter {
    Reporter {
        controller: controller_name.to_string(),
        instance,
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(&self, csr: &CertificateSigningRequest, event: CsrEvent) {
        let reason = event.reason;
        if let Err(e) = self
            .recorder
            .publish(&event.into(), &csr.object_ref(&()))
            .await
        {
            warn!(csr = %csr.name_any(), reason, error = %e, "Failed to record event on CSR");
        }
    }
}

/// Publisher that drops every event.
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(&self, _csr: &CertificateSigningRequest, _event: CsrEvent) {}
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod events_tests;
