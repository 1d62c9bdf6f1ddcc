// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Persisting issued certificates to the CSR status subresource.
//!
//! The only status field this controller owns is `status.certificate`. The
//! write is a JSON merge patch against the `status` subresource that carries
//! the `resourceVersion` the reconciler read from its cache:
//!
//! ```json
//! {
//!   "metadata": { "resourceVersion": "4711" },
//!   "status": { "certificate": "LS0tLS1CRUdJTi..." }
//! }
//! ```
//!
//! The API server rejects the patch with `409 Conflict` when the CSR changed
//! since that version was observed. This keeps a stale cache from writing a
//! second certificate over one issued by a concurrent attempt; the conflict is
//! surfaced as [`StatusWriteError::Conflict`] and the key is requeued.
//!
//! Conditions are not part of the patch. A merge patch replaces lists
//! wholesale, and the approval conditions belong to another controller.

use crate::errors::StatusWriteError;
use async_trait::async_trait;
use k8s_openapi::api::certificates::v1::CertificateSigningRequest;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde_json::{json, Map, Value};
use tracing::debug;

/// Writes a CSR's status back to the cluster.
#[async_trait]
pub trait StatusWriter: Send + Sync {
    /// Persist `csr.status.certificate`.
    ///
    /// A single attempt; retries are driven by the work queue.
    ///
    /// # Errors
    ///
    /// Returns [`StatusWriteError::Conflict`] when the CSR changed since it was
    /// read, and another [`StatusWriteError`] for every other failure.
    async fn update_status(&self, csr: &CertificateSigningRequest)
        -> Result<(), StatusWriteError>;
}

/// [`StatusWriter`] that patches the `status` subresource through the API server.
#[derive(Clone)]
pub struct KubeStatusWriter {
    client: Client,
}

impl KubeStatusWriter {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatusWriter for KubeStatusWriter {
    async fn update_status(
        &self,
        csr: &CertificateSigningRequest,
    ) -> Result<(), StatusWriteError> {
        let name = csr.name_any();
        let Some(patch) = certificate_patch(csr)? else {
            debug!(csr = %name, "No certificate to persist");
            return Ok(());
        };

        let api: Api<CertificateSigningRequest> = Api::all(self.client.clone());
        api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| StatusWriteError::from_kube(&name, e))?;

        debug!(
            csr = %name,
            resource_version = csr.resource_version().unwrap_or_default(),
            "Updated CSR status certificate"
        );
        Ok(())
    }
}

/// Build the merge patch persisting `csr.status.certificate`.
///
/// Returns `Ok(None)` when the CSR carries no certificate. The patch includes
/// `metadata.resourceVersion` whenever the CSR has one.
///
/// # Errors
///
/// Returns [`StatusWriteError::Serialize`] if the certificate cannot be encoded.
pub fn certificate_patch(
    csr: &CertificateSigningRequest,
) -> Result<Option<Value>, StatusWriteError> {
    let Some(certificate) = csr.status.as_ref().and_then(|s| s.certificate.as_ref()) else {
        return Ok(None);
    };

    let certificate = serde_json::to_value(certificate).map_err(|source| {
        StatusWriteError::Serialize {
            name: csr.name_any(),
            source,
        }
    })?;

    let mut patch = Map::new();
    if let Some(resource_version) = csr.resource_version() {
        patch.insert(
            "metadata".to_string(),
            json!({ "resourceVersion": resource_version }),
        );
    }
    patch.insert(
        "status".to_string(),
        json!({ "certificate": certificate }),
    );

    Ok(Some(Value::Object(patch)))
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
