// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the CSR signing controller.
//!
//! The controller hands an `Arc<Context>` to every reconciliation. It bundles
//! the collaborators the reconciler depends on behind traits, so tests can
//! swap each of them for an in-memory fake:
//!
//! - [`ResourceCache`] for CSR, `ManagedCluster` and `ManagedClusterAddOn` lookups
//! - [`AddonRegistry`] for the add-on types known to this process
//! - [`StatusWriter`] for persisting issued certificates
//! - [`EventPublisher`] for Kubernetes Events
//! - [`RequeueBackoff`] for per-key retry delays

use crate::addon::AddonRegistry;
use crate::cache::ResourceCache;
use crate::events::EventPublisher;
use crate::reconcilers::retry::RequeueBackoff;
use crate::reconcilers::status::StatusWriter;
use std::sync::Arc;

/// Shared context passed to every reconciliation.
pub struct Context {
    /// Read-only views of cluster state
    pub cache: Arc<dyn ResourceCache>,

    /// Add-on types known to this process
    pub registry: Arc<AddonRegistry>,

    /// Persists `status.certificate`
    pub status_writer: Arc<dyn StatusWriter>,

    /// Records Kubernetes Events on signed CSRs
    pub events: Arc<dyn EventPublisher>,

    /// Requeue delays for failed keys
    pub backoff: RequeueBackoff,
}

impl Context {
    /// Create a context with the default requeue backoff.
    #[must_use]
    pub fn new(
        cache: Arc<dyn ResourceCache>,
        registry: Arc<AddonRegistry>,
        status_writer: Arc<dyn StatusWriter>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            cache,
            registry,
            status_writer,
            events,
            backoff: RequeueBackoff::default(),
        }
    }

    /// Replace the requeue backoff.
    #[must_use]
    pub fn with_backoff(mut self, backoff: RequeueBackoff) -> Self {
        self.backoff = backoff;
        self
    }
}
