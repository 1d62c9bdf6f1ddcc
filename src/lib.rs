// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # addon-csr-signer - Add-on CSR auto-signing for Open Cluster Management
//!
//! Add-on agents running on managed clusters authenticate to the hub with
//! client certificates. They request those certificates by creating
//! `CertificateSigningRequest`s on the hub. Once a CSR has been approved, this
//! controller signs it with the signer registered for the add-on and writes
//! the certificate to `status.certificate`.
//!
//! ## Overview
//!
//! Two stages decide whether a CSR is signed:
//!
//! 1. The [`filter`] admits only CSRs whose name starts with `addon`, that
//!    carry labels, and whose add-on label names a registered add-on.
//! 2. The [`reconcilers::csr_sign`] reconciler runs an ordered eligibility
//!    chain (approved, not yet signed, not addressed to the kube-apiserver
//!    client signer, cluster and add-on present) before signing.
//!
//! ## Modules
//!
//! - [`addon`] - Add-on registry and the [`addon::CsrSigner`] capability
//! - [`signer`] - CA-backed signer issuing X.509 certificates
//! - [`cache`] - Read-only views of CSRs, clusters and cluster add-ons
//! - [`filter`] - Event filter deciding which CSRs are queued
//! - [`pending`] - Unsigned add-on CSRs indexed by cluster, for re-queueing
//! - [`reconcilers`] - Eligibility chain, status writes and requeue backoff
//! - [`controller`] - Work queue wiring on top of `kube::runtime`
//! - [`crd`] - `ManagedCluster` and `ManagedClusterAddOn` types
//! - [`config`] - Command-line and environment configuration
//! - [`metrics`] / [`server`] - Prometheus metrics and health probes
//!
//! ## Example
//!
//! ```rust,no_run
//! use addon_csr_signer::addon::{AddonRegistry, RegistrationOption, StaticAddon};
//! use addon_csr_signer::filter::CsrEventFilter;
//! use std::sync::Arc;
//!
//! let registry = AddonRegistry::builder()
//!     .register(StaticAddon::new("foo", Some(RegistrationOption::without_signer())))
//!     .build();
//! let filter = CsrEventFilter::new(Arc::new(registry));
//! ```

pub mod addon;
pub mod cache;
pub mod config;
pub mod constants;
pub mod context;
pub mod controller;
pub mod crd;
pub mod errors;
pub mod events;
pub mod filter;
pub mod labels;
pub mod metrics;
pub mod pending;
pub mod reconcilers;
pub mod server;
pub mod signer;
