// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Event filter for add-on CSRs.
//!
//! The CSR watch sees every certificate request in the hub cluster. Only a
//! small fraction of them were raised by add-on agents, so the controller
//! drops everything else before it reaches the work queue. A CSR is enqueued
//! when:
//!
//! 1. its name starts with `addon`,
//! 2. it carries at least one label, and
//! 3. its add-on name label names an add-on in the [`AddonRegistry`].
//!
//! Rejection is silent. The reconciler re-checks eligibility from the cache
//! anyway; the filter only keeps irrelevant CSRs out of the queue.

use crate::addon::AddonRegistry;
use crate::constants::ADDON_CSR_NAME_PREFIX;
use crate::labels;
use k8s_openapi::api::certificates::v1::CertificateSigningRequest;
use std::sync::Arc;

/// Predicate deciding which CSR change events are enqueued.
#[derive(Clone, Debug)]
pub struct CsrEventFilter {
    registry: Arc<AddonRegistry>,
}

impl CsrEventFilter {
    #[must_use]
    pub fn new(registry: Arc<AddonRegistry>) -> Self {
        Self { registry }
    }

    /// Whether a change to `csr` should be enqueued.
    #[must_use]
    pub fn accepts(&self, csr: &CertificateSigningRequest) -> bool {
        let Some(name) = csr.metadata.name.as_deref() else {
            return false;
        };
        if !name.starts_with(ADDON_CSR_NAME_PREFIX) {
            return false;
        }

        let Some(labels) = csr.metadata.labels.as_ref().filter(|l| !l.is_empty()) else {
            return false;
        };

        self.registry.contains(labels::addon_name(labels))
    }

    /// Queue key for an accepted CSR: its name.
    #[must_use]
    pub fn queue_key(&self, csr: &CertificateSigningRequest) -> Option<String> {
        if self.accepts(csr) {
            csr.metadata.name.clone()
        } else {
            None
        }
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod filter_tests;
