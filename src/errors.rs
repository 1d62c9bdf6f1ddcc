// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the CSR signing controller.
//!
//! Every [`ReconcileError`] is scoped to one CSR and is retryable: the
//! controller requeues the key and re-evaluates the eligibility chain against
//! fresh cache state. Expected outcomes such as "not approved yet" or "cluster
//! not registered" are not errors; they are reported as
//! [`SkipReason`](crate::reconcilers::SkipReason)s instead. So is a
//! [`SignError`] that [`SignError::is_permanent`] reports, since the request it
//! rejects is immutable.

use thiserror::Error;

/// Failure to read from a resource cache.
///
/// A missing object is not an error; cache implementations report it as `Ok(None)`.
#[derive(Debug, Error)]
#[error("failed to read {kind} {name} from cache: {message}")]
pub struct CacheError {
    /// Kind of the object being read (e.g. `ManagedCluster`)
    pub kind: &'static str,
    /// Name (or `namespace/name`) of the object being read
    pub name: String,
    /// Description of the failure
    pub message: String,
}

impl CacheError {
    #[must_use]
    pub fn new(kind: &'static str, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Failure reported by a signing capability.
#[derive(Debug, Error)]
pub enum SignError {
    /// The CSR's `spec.request` could not be parsed as a PEM certificate request.
    #[error("invalid certificate request: {0}")]
    InvalidRequest(String),

    /// The CSR asks for a key usage the signer does not issue.
    #[error("unsupported key usage: {0}")]
    UnsupportedUsage(String),

    /// The certificate could not be generated.
    #[error("certificate generation failed: {0}")]
    Certificate(String),

    /// The signing authority could not be loaded.
    #[error("signing authority unavailable: {0}")]
    Authority(String),
}

impl SignError {
    /// Whether the failure is caused by the CSR itself.
    ///
    /// `spec.request` and `spec.usages` cannot change after creation, so
    /// signing such a CSR again fails the same way.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            SignError::InvalidRequest(_) | SignError::UnsupportedUsage(_)
        )
    }
}

/// Failure to persist a CSR's status subresource.
#[derive(Debug, Error)]
pub enum StatusWriteError {
    /// The write was rejected because the CSR changed since it was read.
    ///
    /// Safe to retry once the cache has caught up.
    #[error("conflict updating status of CSR {name}: {message}")]
    Conflict { name: String, message: String },

    /// The API server rejected the write or could not be reached.
    #[error("failed to update status of CSR {name}: {source}")]
    Api {
        name: String,
        #[source]
        source: kube::Error,
    },

    /// The status patch could not be built.
    #[error("failed to serialize status of CSR {name}: {source}")]
    Serialize {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StatusWriteError {
    /// Classify a kube client error returned by a status write.
    ///
    /// HTTP 409 responses become [`StatusWriteError::Conflict`].
    #[must_use]
    pub fn from_kube(name: &str, err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ref response) if is_conflict_code(response.code) => Self::Conflict {
                name: name.to_string(),
                message: response.message.clone(),
            },
            source => Self::Api {
                name: name.to_string(),
                source,
            },
        }
    }
}

/// Whether an HTTP status code reports an optimistic-concurrency conflict.
#[must_use]
pub fn is_conflict_code(code: u16) -> bool {
    code == 409
}

/// Error returned by a reconciliation attempt. Always causes a requeue.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("signer for add-on {addon} failed: {source}")]
    Sign {
        addon: String,
        #[source]
        source: SignError,
    },

    #[error(transparent)]
    StatusWrite(#[from] StatusWriteError),
}

impl ReconcileError {
    /// Whether this error is an optimistic-concurrency conflict on the status write.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ReconcileError::StatusWrite(StatusWriteError::Conflict { .. })
        )
    }

    /// Stable error category used as a metrics label.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            ReconcileError::Cache(_) => "cache_error",
            ReconcileError::Sign { .. } => "sign_error",
            ReconcileError::StatusWrite(StatusWriteError::Conflict { .. }) => "conflict",
            ReconcileError::StatusWrite(_) => "status_write_error",
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
