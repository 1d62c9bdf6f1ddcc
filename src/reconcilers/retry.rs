// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-key requeue backoff for failed reconciliations.
//!
//! The controller's error policy asks [`RequeueBackoff`] how long to wait
//! before retrying a CSR. Consecutive failures of the same key back off
//! exponentially with randomization (jitter) to prevent a thundering herd;
//! a successful reconciliation resets the key, and keys of deleted CSRs are
//! pruned with [`RequeueBackoff::retain`].
//!
//! Optimistic-concurrency conflicts are treated separately: the write lost a
//! race with another update, and all a retry needs is a fresh cache read, so
//! conflicts are retried after a short fixed delay without growing the
//! key's backoff.

use crate::constants::{
    CONFLICT_REQUEUE_MILLIS, ERROR_REQUEUE_INITIAL_MILLIS, ERROR_REQUEUE_MAX_SECS,
};
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Backoff multiplier (exponential growth factor)
const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Randomization factor to prevent thundering herd (±10%)
const RANDOMIZATION_FACTOR: f64 = 0.1;

/// Exponent cap so the growth computation never overflows to infinity
const MAX_EXPONENT: u32 = 32;

/// Exponential backoff tracked per queue key.
pub struct RequeueBackoff {
    /// Delay after the first failure
    pub initial_interval: Duration,
    /// Maximum delay between retries
    pub max_interval: Duration,
    /// Delay after an optimistic-concurrency conflict
    pub conflict_interval: Duration,
    /// Backoff multiplier (typically 2.0 for doubling)
    pub multiplier: f64,
    /// Randomization factor (e.g., 0.1 for ±10%)
    pub randomization_factor: f64,
    /// Consecutive failures per key
    failures: Mutex<HashMap<String, u32>>,
}

impl RequeueBackoff {
    #[must_use]
    pub fn new(
        initial_interval: Duration,
        max_interval: Duration,
        conflict_interval: Duration,
        multiplier: f64,
        randomization_factor: f64,
    ) -> Self {
        Self {
            initial_interval,
            max_interval,
            conflict_interval,
            multiplier,
            randomization_factor,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Un-jittered delay for the `attempt`-th consecutive failure (1-based).
    #[must_use]
    pub fn interval_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(MAX_EXPONENT);
        let secs = self.initial_interval.as_secs_f64() * self.multiplier.powf(f64::from(exponent));
        Duration::from_secs_f64(secs.min(self.max_interval.as_secs_f64()))
    }

    /// Record a failure of `key` and return how long to wait before retrying it.
    pub fn next_requeue(&self, key: &str) -> Duration {
        let attempt = {
            let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
            let count = failures.entry(key.to_string()).or_insert(0);
            *count = count.saturating_add(1);
            *count
        };
        apply_jitter(self.interval_for(attempt), self.randomization_factor)
    }

    /// Delay before retrying a key whose status write hit a conflict.
    #[must_use]
    pub fn conflict_requeue(&self) -> Duration {
        self.conflict_interval
    }

    /// Forget the failure history of `key` after it reconciled successfully.
    pub fn reset(&self, key: &str) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Keep the failure history of the keys for which `keep` returns true.
    pub fn retain(&self, mut keep: impl FnMut(&str) -> bool) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|key, _| keep(key));
    }

    /// Number of consecutive failures recorded for `key`.
    #[must_use]
    pub fn failures(&self, key: &str) -> u32 {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
            .unwrap_or(0)
    }
}

impl Default for RequeueBackoff {
    fn default() -> Self {
        default_backoff()
    }
}

/// Create the default requeue backoff.
///
/// # Configuration
///
/// - **Initial interval**: 1 second
/// - **Max interval**: 5 minutes
/// - **Conflict interval**: 1 second
/// - **Multiplier**: 2.0 (exponential growth)
/// - **Randomization**: ±10% (prevents thundering herd)
///
/// # Retry Schedule
///
/// With these settings, consecutive failures of one CSR are retried after
/// approximately 1s, 2s, 4s, 8s, 16s, 32s, 64s, 128s, 256s and then every
/// 300s (capped at max interval) until the CSR reconciles.
#[must_use]
pub fn default_backoff() -> RequeueBackoff {
    RequeueBackoff::new(
        Duration::from_millis(ERROR_REQUEUE_INITIAL_MILLIS),
        Duration::from_secs(ERROR_REQUEUE_MAX_SECS),
        Duration::from_millis(CONFLICT_REQUEUE_MILLIS),
        BACKOFF_MULTIPLIER,
        RANDOMIZATION_FACTOR,
    )
}

/// Apply randomization (jitter) to an interval.
fn apply_jitter(interval: Duration, randomization_factor: f64) -> Duration {
    if randomization_factor == 0.0 {
        return interval;
    }

    let secs = interval.as_secs_f64();
    let delta = secs * randomization_factor;
    let min = secs - delta;
    let max = secs + delta;

    let jittered = rand::rng().random_range(min..=max);

    Duration::from_secs_f64(jittered.max(0.0))
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
