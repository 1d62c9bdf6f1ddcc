// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command-line and environment configuration for the `addon-csr-signer` binary.
//!
//! Every flag can also be set through the environment variable named next to it:
//!
//! | Flag                       | Environment variable     | Default        |
//! |----------------------------|--------------------------|----------------|
//! | `--addon`                  | `ADDON_NAMES`            | (none)         |
//! | `--ca-cert-file`           | `CA_CERT_FILE`           | (none)         |
//! | `--ca-key-file`            | `CA_KEY_FILE`            | (none)         |
//! | `--cert-validity-days`     | `CERT_VALIDITY_DAYS`     | `365`          |
//! | `--concurrency`            | `CONTROLLER_CONCURRENCY` | `4`            |
//! | `--metrics-bind-address`   | `METRICS_BIND_ADDRESS`   | `0.0.0.0:8080` |
//!
//! `ADDON_NAMES` is comma separated.

use crate::addon::{AddonRegistry, RegistrationOption, StaticAddon};
use crate::constants::{
    DEFAULT_CERT_VALIDITY_DAYS, DEFAULT_CONTROLLER_CONCURRENCY, DEFAULT_METRICS_BIND_ADDRESS,
};
use crate::signer::CaSigner;
use anyhow::{bail, Context as _, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Automatic signing of add-on agent CertificateSigningRequests
#[derive(Parser, Debug, Clone)]
#[command(name = "addon-csr-signer", version, about, long_about = None)]
pub struct Config {
    /// Add-on to sign CSRs for (repeatable)
    #[arg(
        long = "addon",
        env = "ADDON_NAMES",
        value_delimiter = ',',
        required = true
    )]
    pub addons: Vec<String>,

    /// PEM file holding the signing CA certificate
    #[arg(long, env = "CA_CERT_FILE", requires = "ca_key_file")]
    pub ca_cert_file: Option<PathBuf>,

    /// PEM file holding the signing CA private key
    #[arg(long, env = "CA_KEY_FILE", requires = "ca_cert_file")]
    pub ca_key_file: Option<PathBuf>,

    /// Upper bound on the lifetime of issued certificates, in days
    #[arg(long, env = "CERT_VALIDITY_DAYS", default_value_t = DEFAULT_CERT_VALIDITY_DAYS)]
    pub cert_validity_days: u32,

    /// Number of CSRs reconciled in parallel
    #[arg(long, env = "CONTROLLER_CONCURRENCY", default_value_t = DEFAULT_CONTROLLER_CONCURRENCY)]
    pub concurrency: u16,

    /// Address of the metrics and health probe server
    #[arg(long, env = "METRICS_BIND_ADDRESS", default_value = DEFAULT_METRICS_BIND_ADDRESS)]
    pub metrics_bind_address: SocketAddr,
}

impl Config {
    /// Build the add-on registry from the configured add-on names.
    ///
    /// With a CA configured every add-on signs through one shared [`CaSigner`].
    /// Without one the add-ons are still registered, so their CSRs pass the
    /// event filter, but nothing is signed.
    ///
    /// # Errors
    ///
    /// Returns an error if an add-on name is empty or repeated, or if the CA
    /// cannot be loaded.
    pub fn build_registry(&self) -> Result<AddonRegistry> {
        let registration = match (&self.ca_cert_file, &self.ca_key_file) {
            (Some(cert), Some(key)) => {
                let signer = CaSigner::from_files(cert, key, self.cert_validity_days)
                    .with_context(|| {
                        format!(
                            "failed to load signing CA from {} and {}",
                            cert.display(),
                            key.display()
                        )
                    })?;
                info!(
                    ca_cert = %cert.display(),
                    validity_days = self.cert_validity_days,
                    "Loaded signing CA"
                );
                RegistrationOption::with_signer(Arc::new(signer))
            }
            _ => {
                warn!("No signing CA configured - add-on CSRs will not be signed");
                RegistrationOption::without_signer()
            }
        };

        let mut builder = AddonRegistry::builder();
        let mut seen = Vec::with_capacity(self.addons.len());
        for name in self.addons.iter().map(|name| name.trim()) {
            if name.is_empty() {
                bail!("add-on names must not be empty");
            }
            if seen.contains(&name) {
                bail!("add-on {name} is configured more than once");
            }
            seen.push(name);
            builder = builder.register(StaticAddon::new(name, Some(registration.clone())));
        }

        let registry = builder.build();
        info!(addons = ?registry.names().collect::<Vec<_>>(), "Registered add-ons");
        Ok(registry)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
