// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Read-only resource caches backed by reflector stores.
//!
//! The reconciler never queries the API server for the objects it inspects.
//! It reads them from in-memory [`Store`]s populated by reflectors the
//! controller drives, which makes every lookup O(1) but eventually consistent: a CSR the
//! reconciler sees may lag behind the API server by one or more updates.
//!
//! Lookups return `Ok(None)` for objects that are not in the cache. That is
//! distinct from an `Err`, which reports that the cache itself could not be
//! read.

use crate::crd::{ManagedCluster, ManagedClusterAddOn};
use crate::errors::CacheError;
use k8s_openapi::api::certificates::v1::CertificateSigningRequest;
use kube::runtime::reflector::{ObjectRef, Store};
use std::sync::Arc;

/// Lookups the reconciler performs against cached cluster state.
pub trait ResourceCache: Send + Sync {
    /// Look up a `CertificateSigningRequest` by name.
    ///
    /// # Errors
    ///
    /// Returns a [`CacheError`] if the cache cannot be read.
    fn get_csr(&self, name: &str) -> Result<Option<Arc<CertificateSigningRequest>>, CacheError>;

    /// Look up a `ManagedCluster` by name.
    ///
    /// # Errors
    ///
    /// Returns a [`CacheError`] if the cache cannot be read.
    fn get_cluster(&self, name: &str) -> Result<Option<Arc<ManagedCluster>>, CacheError>;

    /// Look up the `ManagedClusterAddOn` named `addon` in the namespace of `cluster`.
    ///
    /// # Errors
    ///
    /// Returns a [`CacheError`] if the cache cannot be read.
    fn get_cluster_addon(
        &self,
        cluster: &str,
        addon: &str,
    ) -> Result<Option<Arc<ManagedClusterAddOn>>, CacheError>;
}

/// Collection of the reflector stores the controller reads from.
///
/// Each store is populated by a reflector stream the controller drives.
#[derive(Clone)]
pub struct Stores {
    // Cluster-scoped resources
    pub csrs: Store<CertificateSigningRequest>,
    pub managed_clusters: Store<ManagedCluster>,

    // Namespace-scoped resources (namespace = cluster name)
    pub cluster_addons: Store<ManagedClusterAddOn>,
}

impl Stores {
    #[must_use]
    pub fn new(
        csrs: Store<CertificateSigningRequest>,
        managed_clusters: Store<ManagedCluster>,
        cluster_addons: Store<ManagedClusterAddOn>,
    ) -> Self {
        Self {
            csrs,
            managed_clusters,
            cluster_addons,
        }
    }

    /// Wait until every store has received its initial list.
    ///
    /// # Errors
    ///
    /// Returns a [`CacheError`] if a reflector is dropped before its store is ready.
    pub async fn wait_until_ready(&self) -> Result<(), CacheError> {
        self.csrs.wait_until_ready().await.map_err(|e| {
            CacheError::new(crate::constants::KIND_CSR, "*", e.to_string())
        })?;
        self.managed_clusters.wait_until_ready().await.map_err(|e| {
            CacheError::new(crate::constants::KIND_MANAGED_CLUSTER, "*", e.to_string())
        })?;
        self.cluster_addons.wait_until_ready().await.map_err(|e| {
            CacheError::new(
                crate::constants::KIND_MANAGED_CLUSTER_ADDON,
                "*",
                e.to_string(),
            )
        })?;
        Ok(())
    }
}

impl ResourceCache for Stores {
    fn get_csr(&self, name: &str) -> Result<Option<Arc<CertificateSigningRequest>>, CacheError> {
        Ok(self.csrs.get(&ObjectRef::new(name)))
    }

    fn get_cluster(&self, name: &str) -> Result<Option<Arc<ManagedCluster>>, CacheError> {
        Ok(self.managed_clusters.get(&ObjectRef::new(name)))
    }

    fn get_cluster_addon(
        &self,
        cluster: &str,
        addon: &str,
    ) -> Result<Option<Arc<ManagedClusterAddOn>>, CacheError> {
        Ok(self
            .cluster_addons
            .get(&ObjectRef::new(addon).within(cluster)))
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod cache_tests;
