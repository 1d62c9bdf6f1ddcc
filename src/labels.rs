// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Label constants read from add-on `CertificateSigningRequest`s.
//!
//! Add-on agents running on a managed cluster stamp every CSR they raise with
//! the add-on name and the cluster name, following the Open Cluster Management
//! conventions.

use std::collections::BTreeMap;

// ============================================================================
// Open Cluster Management Labels
// ============================================================================

/// Label carrying the name of the add-on that raised the CSR
pub const ADDON_NAME_LABEL: &str = "open-cluster-management.io/addon-name";

/// Label carrying the name of the managed cluster the add-on agent runs on
pub const CLUSTER_NAME_LABEL: &str = "open-cluster-management.io/cluster-name";

/// Returns the add-on name label value, or `""` when the label is missing.
#[must_use]
pub fn addon_name(labels: &BTreeMap<String, String>) -> &str {
    labels.get(ADDON_NAME_LABEL).map_or("", String::as_str)
}

/// Returns the cluster name label value when present.
///
/// A present but empty value is returned as `Some("")`.
#[must_use]
pub fn cluster_name(labels: &BTreeMap<String, String>) -> Option<&str> {
    labels.get(CLUSTER_NAME_LABEL).map(String::as_str)
}
