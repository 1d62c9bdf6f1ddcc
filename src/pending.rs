// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Index of unsigned add-on CSRs by managed cluster.
//!
//! A `ManagedCluster` or `ManagedClusterAddOn` change re-queues the unsigned
//! CSRs raised for that cluster. The index is fed from the CSR watch, so
//! finding them is one map lookup rather than a scan of every CSR on the hub.
//!
//! During a relist the previous entries keep being served until `InitDone`,
//! matching how the reflector store swaps in a fresh list.

use crate::filter::CsrEventFilter;
use crate::labels;
use crate::reconcilers::is_signed;
use k8s_openapi::api::certificates::v1::CertificateSigningRequest;
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher;
use kube::ResourceExt;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Default)]
struct Entries {
    /// cluster name -> (CSR name -> add-on name)
    by_cluster: HashMap<String, BTreeMap<String, String>>,
    /// CSR name -> cluster name
    cluster_of: HashMap<String, String>,
}

impl Entries {
    fn insert(&mut self, csr: String, cluster: String, addon: String) {
        self.remove(&csr);
        self.by_cluster
            .entry(cluster.clone())
            .or_default()
            .insert(csr.clone(), addon);
        self.cluster_of.insert(csr, cluster);
    }

    fn remove(&mut self, csr: &str) {
        let Some(cluster) = self.cluster_of.remove(csr) else {
            return;
        };
        if let Some(csrs) = self.by_cluster.get_mut(&cluster) {
            csrs.remove(csr);
            if csrs.is_empty() {
                self.by_cluster.remove(&cluster);
            }
        }
    }
}

#[derive(Default)]
struct IndexState {
    live: Entries,
    relist: Option<Entries>,
}

/// Unsigned, filter-accepted CSRs keyed by their cluster label.
#[derive(Clone)]
pub struct PendingCsrIndex {
    filter: CsrEventFilter,
    state: Arc<Mutex<IndexState>>,
}

impl PendingCsrIndex {
    #[must_use]
    pub fn new(filter: CsrEventFilter) -> Self {
        Self {
            filter,
            state: Arc::new(Mutex::new(IndexState::default())),
        }
    }

    /// Update the index from one CSR watch event.
    pub fn apply_watcher_event(&self, event: &watcher::Event<CertificateSigningRequest>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match event {
            watcher::Event::Apply(csr) => self.upsert(&mut state.live, csr),
            watcher::Event::Delete(csr) => state.live.remove(&csr.name_any()),
            watcher::Event::Init => state.relist = Some(Entries::default()),
            watcher::Event::InitApply(csr) => {
                let relist = state.relist.get_or_insert_with(Entries::default);
                self.upsert(relist, csr);
            }
            watcher::Event::InitDone => {
                if let Some(fresh) = state.relist.take() {
                    state.live = fresh;
                }
            }
        }
    }

    fn upsert(&self, entries: &mut Entries, csr: &CertificateSigningRequest) {
        let name = csr.name_any();
        let cluster = labels::cluster_name(csr.labels());
        match cluster {
            Some(cluster) if self.filter.accepts(csr) && !is_signed(csr) => entries.insert(
                name,
                cluster.to_string(),
                labels::addon_name(csr.labels()).to_string(),
            ),
            _ => entries.remove(&name),
        }
    }

    /// Pending CSRs raised for `cluster`, narrowed to `addon` if given.
    #[must_use]
    pub fn pending(
        &self,
        cluster: &str,
        addon: Option<&str>,
    ) -> Vec<ObjectRef<CertificateSigningRequest>> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .live
            .by_cluster
            .get(cluster)
            .map(|csrs| {
                csrs.iter()
                    .filter(|(_, csr_addon)| addon.is_none_or(|addon| csr_addon.as_str() == addon))
                    .map(|(name, _)| ObjectRef::new(name))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of pending CSRs across all clusters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .live
            .cluster_of
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "pending_tests.rs"]
mod pending_tests;
