// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions read by the CSR signing controller.
//!
//! The controller does not own these resources. They are defined by the Open
//! Cluster Management hub and only their existence matters to the signing
//! decision. The types below model the subset of fields that is useful for
//! logging and for generating development CRDs with `crdgen`; unknown fields
//! are ignored on deserialization.
//!
//! # Resource Types
//!
//! - [`ManagedCluster`] - A cluster registered with the hub (cluster-scoped)
//! - [`ManagedClusterAddOn`] - An add-on installed for one cluster (namespaced by
//!   the cluster name)
//!
//! # Example
//!
//! ```rust
//! use addon_csr_signer::crd::{ManagedClusterAddOn, ManagedClusterAddOnSpec};
//!
//! let addon = ManagedClusterAddOn::new(
//!     "foo",
//!     ManagedClusterAddOnSpec {
//!         install_namespace: Some("open-cluster-management-agent-addon".to_string()),
//!     },
//! );
//! assert_eq!(addon.spec.install_namespace.as_deref(), Some("open-cluster-management-agent-addon"));
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Standard Kubernetes condition as reported by the hub controllers.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition (e.g. `ManagedClusterConditionAvailable`, `Available`).
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Endpoint through which the hub reaches a managed cluster's API server.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// URL of the managed cluster's API server.
    pub url: String,

    /// Base64 encoded CA bundle for the API server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<String>,
}

/// `ManagedCluster` represents a cluster joined to the hub.
///
/// Presence in the cache is what the signing controller checks: a CSR whose
/// cluster label names a cluster that is not (or no longer) registered is
/// never signed.
///
/// # Example
///
/// ```yaml
/// apiVersion: cluster.open-cluster-management.io/v1
/// kind: ManagedCluster
/// metadata:
///   name: cluster1
/// spec:
///   hubAcceptsClient: true
///   leaseDurationSeconds: 60
/// ```
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cluster.open-cluster-management.io",
    version = "v1",
    kind = "ManagedCluster",
    doc = "ManagedCluster represents a cluster that has joined the hub."
)]
#[kube(status = "ManagedClusterStatus")]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterSpec {
    /// Whether the hub accepts the klusterlet of this cluster.
    #[serde(default)]
    pub hub_accepts_client: bool,

    /// API server endpoints of the managed cluster.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub managed_cluster_client_configs: Vec<ClientConfig>,

    /// Interval at which the klusterlet renews its lease, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_duration_seconds: Option<i32>,
}

/// `ManagedCluster` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// `ManagedClusterAddOn` records that an add-on is installed for one cluster.
///
/// The resource lives in the namespace named after the cluster and carries the
/// add-on name as its own name.
///
/// # Example
///
/// ```yaml
/// apiVersion: addon.open-cluster-management.io/v1alpha1
/// kind: ManagedClusterAddOn
/// metadata:
///   name: foo
///   namespace: cluster1
/// spec:
///   installNamespace: open-cluster-management-agent-addon
/// ```
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "addon.open-cluster-management.io",
    version = "v1alpha1",
    kind = "ManagedClusterAddOn",
    namespaced,
    doc = "ManagedClusterAddOn is the add-on installation record for one managed cluster."
)]
#[kube(status = "ManagedClusterAddOnStatus")]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterAddOnSpec {
    /// Namespace on the managed cluster the add-on agent is deployed into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_namespace: Option<String>,
}

/// Subject the add-on agent requests in its client certificate.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    /// User name of the certificate subject.
    pub user: String,

    /// Groups (organizations) of the certificate subject.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,

    /// Organizational units of the certificate subject.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub organization_unit: Vec<String>,
}

/// One registration an add-on agent performs with the hub.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationConfig {
    /// Signer the agent addresses its CSRs to.
    pub signer_name: String,

    /// Subject requested for the certificate.
    #[serde(default)]
    pub subject: Subject,
}

/// `ManagedClusterAddOn` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterAddOnStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub registrations: Vec<RegistrationConfig>,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
