// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Work queue and dispatcher for the CSR signing reconciler.
//!
//! The controller is a kube-rs [`Controller`] driven by a reflector stream of
//! `CertificateSigningRequest`s. Every CSR change passes through the
//! [`CsrEventFilter`] before it is queued, so only add-on CSRs of registered
//! add-ons are ever reconciled. The controller deduplicates queued keys, never
//! reconciles one CSR on two workers at once and bounds parallelism with the
//! configured concurrency.
//!
//! `ManagedCluster` and `ManagedClusterAddOn` reflectors feed the resource
//! cache. Their changes also re-queue the unsigned add-on CSRs that reference
//! them, looked up in a [`PendingCsrIndex`] fed by the CSR watch, so a CSR
//! skipped because its cluster or add-on had not been observed yet is picked
//! up again once it is.
//!
//! Failed reconciliations are requeued with per-key exponential backoff;
//! status write conflicts are retried after a short fixed delay. Backoff state
//! of deleted CSRs is dropped the next time any CSR fails.

use crate::cache::Stores;
use crate::context::Context;
use crate::crd::{ManagedCluster, ManagedClusterAddOn};
use crate::errors::ReconcileError;
use crate::filter::CsrEventFilter;
use crate::metrics;
use crate::pending::PendingCsrIndex;
use crate::reconcilers::{reconcile_csr, SignOutcome};
use anyhow::Result;
use futures::{future, StreamExt, TryStreamExt};
use k8s_openapi::api::certificates::v1::CertificateSigningRequest;
use kube::runtime::controller::{self, Action};
use kube::runtime::reflector;
use kube::runtime::{watcher, Controller, WatchStreamExt};
use kube::{Api, Client, ResourceExt};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Run the CSR signing controller until `shutdown` resolves.
///
/// `build_context` receives the reflector-backed [`Stores`] and returns the
/// context shared by all reconciliations. `ready` is set once every store has
/// received its initial list.
///
/// # Errors
///
/// Returns an error if the controller cannot be started.
pub async fn run_csr_controller<F>(
    client: Client,
    filter: CsrEventFilter,
    concurrency: u16,
    ready: Arc<AtomicBool>,
    build_context: impl FnOnce(Stores) -> Context,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + Sync + 'static,
{
    info!(concurrency, "Starting CSR signing controller");

    let watcher_config = watcher::Config::default();

    let (csr_reader, csr_writer) = reflector::store::<CertificateSigningRequest>();
    let pending = PendingCsrIndex::new(filter.clone());
    let csr_index = pending.clone();
    let csr_stream = watcher(
        Api::<CertificateSigningRequest>::all(client.clone()),
        watcher_config.clone(),
    )
    .default_backoff()
    .reflect(csr_writer)
    .inspect_ok(move |event| csr_index.apply_watcher_event(event))
    .applied_objects()
    .try_filter(move |csr| future::ready(filter.accepts(csr)));

    let (cluster_reader, cluster_writer) = reflector::store::<ManagedCluster>();
    let cluster_stream = watcher(
        Api::<ManagedCluster>::all(client.clone()),
        watcher_config.clone(),
    )
    .default_backoff()
    .reflect(cluster_writer)
    .applied_objects();

    let (addon_reader, addon_writer) = reflector::store::<ManagedClusterAddOn>();
    let addon_stream = watcher(
        Api::<ManagedClusterAddOn>::all(client.clone()),
        watcher_config,
    )
    .default_backoff()
    .reflect(addon_writer)
    .applied_objects();

    let stores = Stores::new(csr_reader.clone(), cluster_reader, addon_reader);
    tokio::spawn(mark_ready_when_synced(stores.clone(), ready));

    let ctx = Arc::new(build_context(stores));

    let cluster_pending = pending.clone();
    let addon_pending = pending;

    Controller::for_stream(csr_stream, csr_reader)
        .with_config(controller::Config::default().concurrency(concurrency))
        .watches_stream(cluster_stream, move |cluster: ManagedCluster| {
            cluster_pending.pending(&cluster.name_any(), None)
        })
        .watches_stream(addon_stream, move |addon: ManagedClusterAddOn| {
            let Some(cluster) = addon.namespace() else {
                return Vec::new();
            };
            addon_pending.pending(&cluster, Some(&addon.name_any()))
        })
        .graceful_shutdown_on(shutdown)
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, _action)) => debug!(csr = %obj.name, "Reconciled CSR"),
                Err(controller::Error::ReconcilerFailed(err, obj)) => {
                    debug!(csr = %obj.name, error = %err, "Reconciliation failed");
                }
                Err(e) => warn!(error = %e, "Controller error"),
            }
        })
        .await;

    info!("CSR signing controller stopped");
    Ok(())
}

async fn mark_ready_when_synced(stores: Stores, ready: Arc<AtomicBool>) {
    match stores.wait_until_ready().await {
        Ok(()) => {
            info!("Resource caches synced");
            ready.store(true, Ordering::SeqCst);
        }
        Err(e) => error!(error = %e, "Resource caches failed to sync"),
    }
}

/// Reconcile one queued CSR and record the outcome in metrics.
async fn reconcile(
    csr: Arc<CertificateSigningRequest>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let name = csr.name_any();
    let start = Instant::now();

    let result = reconcile_csr(&ctx, &name).await;
    let duration = start.elapsed();

    match result {
        Ok(SignOutcome::Signed { addon, .. }) => {
            metrics::record_certificate_signed(&addon, duration);
            ctx.backoff.reset(&name);
            Ok(Action::await_change())
        }
        Ok(SignOutcome::Skipped(reason)) => {
            metrics::record_skip(reason.as_str(), duration);
            ctx.backoff.reset(&name);
            Ok(Action::await_change())
        }
        Err(err) => {
            metrics::record_error(err.error_type(), duration);
            Err(err)
        }
    }
}

/// Error policy for the CSR controller.
///
/// Conflicts are retried after a short fixed delay; every other failure
/// backs off exponentially per CSR.
#[allow(clippy::needless_pass_by_value)] // Signature required by kube::runtime::Controller
fn error_policy(
    csr: Arc<CertificateSigningRequest>,
    err: &ReconcileError,
    ctx: Arc<Context>,
) -> Action {
    let name = csr.name_any();
    forget_deleted_csrs(&ctx, &name);

    let delay = if err.is_conflict() {
        ctx.backoff.conflict_requeue()
    } else {
        ctx.backoff.next_requeue(&name)
    };

    if err.is_conflict() {
        debug!(
            csr = %name,
            error = %err,
            retry_after = ?delay,
            "CSR changed during reconciliation - will retry"
        );
    } else {
        error!(
            csr = %name,
            error = %err,
            retry_after = ?delay,
            "Reconciliation error - will retry"
        );
    }

    Action::requeue(delay)
}

/// Drop the backoff state of CSRs that are gone from the cache.
///
/// The controller never reconciles a deleted CSR, so its failure count would
/// otherwise never be reset. Keys whose lookup fails are kept.
fn forget_deleted_csrs(ctx: &Context, current: &str) {
    ctx.backoff.retain(|key| {
        key == current || !matches!(ctx.cache.get_csr(key), Ok(None))
    });
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod controller_tests;
