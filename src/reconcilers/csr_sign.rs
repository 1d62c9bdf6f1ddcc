// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Add-on CSR signing reconciler.
//!
//! Given the name of a `CertificateSigningRequest`, [`reconcile_csr`] decides
//! whether the request may be signed automatically and, if so, signs it with
//! the add-on's [`CsrSigner`] and persists the certificate.
//!
//! # Eligibility chain
//!
//! The checks run in this order. The first one that fails ends the attempt
//! with a [`SkipReason`]; a skip is a normal outcome and is not retried.
//!
//! | Step | Check                                         | Skip reason           |
//! |------|-----------------------------------------------|-----------------------|
//! | 1    | CSR is in the cache                           | `CsrNotFound`         |
//! | 2    | CSR is `Approved` and not `Denied`            | `NotApproved`         |
//! | 3    | `status.certificate` is empty                 | `AlreadySigned`       |
//! | 4    | signer is not the kube-apiserver client signer | `ReservedSigner`     |
//! | 5    | add-on label names a known add-on             | `AddonNotRegistered`  |
//! | 6    | add-on declares a registration                | `NoRegistration`      |
//! | 7    | CSR has a cluster label                       | `MissingClusterLabel` |
//! | 8    | `ManagedCluster` exists                       | `ClusterNotFound`     |
//! | 9    | `ManagedClusterAddOn` exists in the cluster   | `AddonNotInstalled`   |
//! | 10   | registration has a signer                     | `NoSigner`            |
//! | 11   | signer returned a non-empty certificate       | `EmptyCertificate`    |
//! | 11   | signer accepted the request                   | `SignRejected`        |
//!
//! Cache failures, signer failures and status write failures are returned as
//! [`ReconcileError`]s and the controller requeues the CSR. A signer that
//! rejects the request itself (a malformed PEM, or a usage it never issues)
//! ends the attempt with `SignRejected` instead.
//!
//! # Sign-once guarantee
//!
//! Step 3 runs on every attempt, and the status write carries the
//! `resourceVersion` the CSR was read at. A certificate that is already
//! persisted, or that a concurrent attempt persisted after our read, is never
//! overwritten.

use crate::addon::{AddonRegistry, AgentAddon, AgentAddonOptions, CsrSigner, RegistrationOption};
use crate::cache::ResourceCache;
use crate::constants::{
    CSR_CONDITION_APPROVED, CSR_CONDITION_DENIED, KUBE_APISERVER_CLIENT_SIGNER,
};
use crate::context::Context;
use crate::errors::{CacheError, ReconcileError, SignError};
use crate::events::CsrEvent;
use crate::labels;
use k8s_openapi::api::certificates::v1::{
    CertificateSigningRequest, CertificateSigningRequestStatus,
};
use k8s_openapi::ByteString;
use kube::ResourceExt;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Why a CSR was left untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The CSR is not in the cache (deleted, or not yet observed)
    CsrNotFound,
    /// The CSR has no `Approved` condition
    NotApproved,
    /// `status.certificate` is already set
    AlreadySigned,
    /// The CSR is addressed to the kube-apiserver client signer
    ReservedSigner,
    /// The add-on label names no registered add-on
    AddonNotRegistered,
    /// The add-on does not register with the hub
    NoRegistration,
    /// The CSR has no cluster label
    MissingClusterLabel,
    /// The `ManagedCluster` is not in the cache
    ClusterNotFound,
    /// The `ManagedClusterAddOn` is not in the cache
    AddonNotInstalled,
    /// The add-on's registration has no signer
    NoSigner,
    /// The signer returned an empty certificate
    EmptyCertificate,
    /// The signer rejected the request or its usages
    SignRejected,
}

impl SkipReason {
    /// Stable CamelCase identifier, used in logs and as a metrics label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::CsrNotFound => "CsrNotFound",
            SkipReason::NotApproved => "NotApproved",
            SkipReason::AlreadySigned => "AlreadySigned",
            SkipReason::ReservedSigner => "ReservedSigner",
            SkipReason::AddonNotRegistered => "AddonNotRegistered",
            SkipReason::NoRegistration => "NoRegistration",
            SkipReason::MissingClusterLabel => "MissingClusterLabel",
            SkipReason::ClusterNotFound => "ClusterNotFound",
            SkipReason::AddonNotInstalled => "AddonNotInstalled",
            SkipReason::NoSigner => "NoSigner",
            SkipReason::EmptyCertificate => "EmptyCertificate",
            SkipReason::SignRejected => "SignRejected",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a reconciliation attempt that did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignOutcome {
    /// A certificate was issued and persisted.
    Signed { addon: String, cluster: String },
    /// The CSR was left untouched.
    Skipped(SkipReason),
}

/// Why the eligibility chain stopped early.
#[derive(Debug)]
enum Halt {
    Skip(SkipReason),
    Fail(ReconcileError),
}

impl From<SkipReason> for Halt {
    fn from(reason: SkipReason) -> Self {
        Halt::Skip(reason)
    }
}

impl From<ReconcileError> for Halt {
    fn from(err: ReconcileError) -> Self {
        Halt::Fail(err)
    }
}

impl From<CacheError> for Halt {
    fn from(err: CacheError) -> Self {
        Halt::Fail(err.into())
    }
}

/// Reconcile the CSR named `name`.
///
/// # Errors
///
/// Returns a [`ReconcileError`] when the cache cannot be read, the signer
/// fails, or the certificate cannot be persisted. The caller requeues the CSR.
pub async fn reconcile_csr(ctx: &Context, name: &str) -> Result<SignOutcome, ReconcileError> {
    match sign_csr(ctx, name).await {
        Ok(outcome) => Ok(outcome),
        Err(Halt::Skip(reason)) => {
            debug!(csr = name, reason = reason.as_str(), "Skipping CSR");
            Ok(SignOutcome::Skipped(reason))
        }
        Err(Halt::Fail(err)) => Err(err),
    }
}

async fn sign_csr(ctx: &Context, name: &str) -> Result<SignOutcome, Halt> {
    let mut csr = fetch_csr(ctx.cache.as_ref(), name)?;

    check_approved(&csr)?;
    check_not_signed(&csr)?;
    check_signer_name(&csr)?;

    let addon_name = labels::addon_name(csr.labels()).to_string();
    let options = lookup_addon(&ctx.registry, &addon_name)?;
    let registration = require_registration(options)?;
    let cluster_name = require_cluster_label(&csr)?.to_string();

    check_cluster_exists(ctx.cache.as_ref(), &cluster_name)?;
    check_addon_installed(ctx.cache.as_ref(), &cluster_name, &addon_name)?;

    let signer = require_signer(&registration)?;
    let certificate = sign_request(signer.as_ref(), &csr, &addon_name)?;

    csr.status
        .get_or_insert_with(CertificateSigningRequestStatus::default)
        .certificate = Some(ByteString(certificate));

    ctx.status_writer
        .update_status(&csr)
        .await
        .map_err(ReconcileError::from)?;

    info!(
        csr = name,
        addon = %addon_name,
        cluster = %cluster_name,
        "Signed add-on CSR"
    );

    ctx.events
        .publish(&csr, CsrEvent::signed(&addon_name, &cluster_name))
        .await;

    Ok(SignOutcome::Signed {
        addon: addon_name,
        cluster: cluster_name,
    })
}

/// Step 1: read the CSR and take a private working copy.
fn fetch_csr(
    cache: &dyn ResourceCache,
    name: &str,
) -> Result<CertificateSigningRequest, Halt> {
    cache
        .get_csr(name)?
        .map(|csr| CertificateSigningRequest::clone(&csr))
        .ok_or(Halt::Skip(SkipReason::CsrNotFound))
}

/// Step 2
fn check_approved(csr: &CertificateSigningRequest) -> Result<(), Halt> {
    if is_approved(csr) {
        Ok(())
    } else {
        Err(SkipReason::NotApproved.into())
    }
}

/// Step 3
fn check_not_signed(csr: &CertificateSigningRequest) -> Result<(), Halt> {
    if is_signed(csr) {
        Err(SkipReason::AlreadySigned.into())
    } else {
        Ok(())
    }
}

/// Step 4
fn check_signer_name(csr: &CertificateSigningRequest) -> Result<(), Halt> {
    if csr.spec.signer_name == KUBE_APISERVER_CLIENT_SIGNER {
        Err(SkipReason::ReservedSigner.into())
    } else {
        Ok(())
    }
}

/// Step 5. A missing label is looked up as the empty name.
fn lookup_addon(registry: &AddonRegistry, addon_name: &str) -> Result<AgentAddonOptions, Halt> {
    registry
        .get(addon_name)
        .map(|addon| addon.options())
        .ok_or(Halt::Skip(SkipReason::AddonNotRegistered))
}

/// Step 6
fn require_registration(options: AgentAddonOptions) -> Result<RegistrationOption, Halt> {
    options
        .registration
        .ok_or(Halt::Skip(SkipReason::NoRegistration))
}

/// Step 7
fn require_cluster_label(csr: &CertificateSigningRequest) -> Result<&str, Halt> {
    labels::cluster_name(csr.labels()).ok_or(Halt::Skip(SkipReason::MissingClusterLabel))
}

/// Step 8
fn check_cluster_exists(cache: &dyn ResourceCache, cluster: &str) -> Result<(), Halt> {
    match cache.get_cluster(cluster)? {
        Some(_) => Ok(()),
        None => Err(SkipReason::ClusterNotFound.into()),
    }
}

/// Step 9
fn check_addon_installed(
    cache: &dyn ResourceCache,
    cluster: &str,
    addon: &str,
) -> Result<(), Halt> {
    match cache.get_cluster_addon(cluster, addon)? {
        Some(_) => Ok(()),
        None => Err(SkipReason::AddonNotInstalled.into()),
    }
}

/// Step 10
fn require_signer(registration: &RegistrationOption) -> Result<Arc<dyn CsrSigner>, Halt> {
    registration
        .csr_sign
        .clone()
        .ok_or(Halt::Skip(SkipReason::NoSigner))
}

/// Step 11
fn sign_request(
    signer: &dyn CsrSigner,
    csr: &CertificateSigningRequest,
    addon: &str,
) -> Result<Vec<u8>, Halt> {
    let certificate = signer
        .sign(csr)
        .map_err(|source| sign_failure(csr, addon, source))?;

    if certificate.is_empty() {
        warn!(
            csr = csr.metadata.name.as_deref().unwrap_or_default(),
            addon,
            "Signer returned an empty certificate"
        );
        return Err(SkipReason::EmptyCertificate.into());
    }

    Ok(certificate)
}

fn sign_failure(csr: &CertificateSigningRequest, addon: &str, source: SignError) -> Halt {
    if source.is_permanent() {
        warn!(
            csr = csr.metadata.name.as_deref().unwrap_or_default(),
            addon,
            error = %source,
            "Signer rejected the CSR"
        );
        return SkipReason::SignRejected.into();
    }

    ReconcileError::Sign {
        addon: addon.to_string(),
        source,
    }
    .into()
}

/// Whether the CSR carries an `Approved` condition and no `Denied` one.
///
/// An `Approved` condition counts when its status is `"True"` or empty. Any
/// `Denied` condition makes the CSR unapproved.
#[must_use]
pub fn is_approved(csr: &CertificateSigningRequest) -> bool {
    let Some(conditions) = csr
        .status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
    else {
        return false;
    };

    !conditions.iter().any(|c| c.type_ == CSR_CONDITION_DENIED)
        && conditions.iter().any(|c| {
            c.type_ == CSR_CONDITION_APPROVED && (c.status.is_empty() || c.status == "True")
        })
}

/// Whether the CSR already carries a non-empty certificate.
#[must_use]
pub fn is_signed(csr: &CertificateSigningRequest) -> bool {
    csr.status
        .as_ref()
        .and_then(|status| status.certificate.as_ref())
        .is_some_and(|certificate| !certificate.0.is_empty())
}

#[cfg(test)]
#[path = "csr_sign_tests.rs"]
mod csr_sign_tests;
