// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation logic for add-on CSRs.
//!
//! - [`csr_sign`] - Eligibility chain and signing ([`reconcile_csr`])
//! - [`status`] - Persisting `status.certificate` ([`status::StatusWriter`])
//! - [`retry`] - Per-key requeue backoff ([`retry::RequeueBackoff`])
//!
//! # Example: Using the Reconciler
//!
//! ```rust,no_run
//! use addon_csr_signer::context::Context;
//! use addon_csr_signer::reconcilers::{reconcile_csr, SignOutcome};
//!
//! async fn handle(ctx: &Context, name: &str) -> anyhow::Result<()> {
//!     match reconcile_csr(ctx, name).await? {
//!         SignOutcome::Signed { addon, cluster } => {
//!             println!("signed {name} for {addon} on {cluster}");
//!         }
//!         SignOutcome::Skipped(reason) => println!("skipped {name}: {reason}"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod csr_sign;
pub mod retry;
pub mod status;

pub use csr_sign::{is_approved, is_signed, reconcile_csr, SignOutcome, SkipReason};
