// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the add-on CSR signer.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group of the `ManagedCluster` resource
pub const CLUSTER_API_GROUP: &str = "cluster.open-cluster-management.io";

/// API version of the `ManagedCluster` resource
pub const CLUSTER_API_VERSION: &str = "v1";

/// API group of the `ManagedClusterAddOn` resource
pub const ADDON_API_GROUP: &str = "addon.open-cluster-management.io";

/// API version of the `ManagedClusterAddOn` resource
pub const ADDON_API_VERSION: &str = "v1alpha1";

/// Kind name for `CertificateSigningRequest` resource
pub const KIND_CSR: &str = "CertificateSigningRequest";

/// Kind name for `ManagedCluster` resource
pub const KIND_MANAGED_CLUSTER: &str = "ManagedCluster";

/// Kind name for `ManagedClusterAddOn` resource
pub const KIND_MANAGED_CLUSTER_ADDON: &str = "ManagedClusterAddOn";

// ============================================================================
// Certificate Signing Constants
// ============================================================================

/// Name prefix shared by every CSR raised by an add-on agent
pub const ADDON_CSR_NAME_PREFIX: &str = "addon";

/// Signer reserved for kube-apiserver client certificates.
///
/// CSRs addressed to this signer are issued by the hub's own authority and are
/// never signed by this controller.
pub const KUBE_APISERVER_CLIENT_SIGNER: &str = "kubernetes.io/kube-apiserver-client";

/// CSR condition type set by the approval flow
pub const CSR_CONDITION_APPROVED: &str = "Approved";

/// CSR condition type set when a request is rejected
pub const CSR_CONDITION_DENIED: &str = "Denied";

/// Default validity of issued certificates (1 year)
pub const DEFAULT_CERT_VALIDITY_DAYS: u32 = 365;

// ============================================================================
// Event Constants
// ============================================================================

/// Reporting component name on published Kubernetes Events
pub const CONTROLLER_NAME: &str = "addon-csr-signing-controller";

/// Event reason recorded when a CSR has been signed
pub const EVENT_REASON_CSR_SIGNED: &str = "AddonCSRSigned";

/// Event action recorded when a CSR has been signed
pub const EVENT_ACTION_SIGN: &str = "Sign";

// ============================================================================
// Controller Error Handling Constants
// ============================================================================

/// First requeue delay after a failed reconciliation (1 second)
pub const ERROR_REQUEUE_INITIAL_MILLIS: u64 = 1000;

/// Upper bound for the requeue delay after repeated failures (5 minutes)
pub const ERROR_REQUEUE_MAX_SECS: u64 = 300;

/// Requeue delay after an optimistic-concurrency conflict (1 second)
pub const CONFLICT_REQUEUE_MILLIS: u64 = 1000;

/// Default number of CSRs reconciled in parallel
pub const DEFAULT_CONTROLLER_CONCURRENCY: u16 = 4;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Default bind address for the metrics and health HTTP server
pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path for liveness probe endpoint
pub const HEALTHZ_PATH: &str = "/healthz";

/// Path for readiness probe endpoint
pub const READYZ_PATH: &str = "/readyz";
