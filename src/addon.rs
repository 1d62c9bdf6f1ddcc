// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Add-on registration capabilities.
//!
//! Each add-on type known to the hub process is described by an [`AgentAddon`].
//! Its options say whether the add-on registers with the hub at all and, if it
//! does, which [`CsrSigner`] (if any) issues certificates for its agents.
//!
//! The [`AddonRegistry`] maps add-on names to these descriptions. It is built
//! once at startup and shared read-only between the event filter and the
//! reconciler, so independent controllers (and tests) can each carry their own
//! table.
//!
//! # Example
//!
//! ```rust
//! use addon_csr_signer::addon::{AddonRegistry, RegistrationOption, StaticAddon};
//! use addon_csr_signer::errors::SignError;
//! use k8s_openapi::api::certificates::v1::CertificateSigningRequest;
//! use std::sync::Arc;
//!
//! let signer = |_csr: &CertificateSigningRequest| -> Result<Vec<u8>, SignError> {
//!     Ok(b"CERTDATA".to_vec())
//! };
//! let registry = AddonRegistry::builder()
//!     .register(StaticAddon::new("foo", Some(RegistrationOption::with_signer(Arc::new(signer)))))
//!     .build();
//!
//! assert!(registry.contains("foo"));
//! assert!(!registry.contains("bar"));
//! ```

use crate::errors::SignError;
use k8s_openapi::api::certificates::v1::CertificateSigningRequest;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Capability that turns an approved CSR into a certificate.
///
/// Implementations are selected per add-on through the [`AddonRegistry`] and are
/// invoked synchronously from the reconciler. An `Ok` with an empty payload
/// means "nothing to issue yet" and is never written to the CSR.
pub trait CsrSigner: Send + Sync {
    /// Sign the request and return the PEM-encoded certificate chain.
    ///
    /// # Errors
    ///
    /// Returns a [`SignError`] when the request cannot be signed. The reconciler
    /// propagates it, so the CSR is retried later.
    fn sign(&self, csr: &CertificateSigningRequest) -> Result<Vec<u8>, SignError>;
}

impl<F> CsrSigner for F
where
    F: Fn(&CertificateSigningRequest) -> Result<Vec<u8>, SignError> + Send + Sync,
{
    fn sign(&self, csr: &CertificateSigningRequest) -> Result<Vec<u8>, SignError> {
        self(csr)
    }
}

/// Registration behaviour of an add-on.
#[derive(Clone, Default)]
pub struct RegistrationOption {
    /// Signer for this add-on's CSRs. `None` opts the add-on out of automatic signing.
    pub csr_sign: Option<Arc<dyn CsrSigner>>,
}

impl RegistrationOption {
    /// Registration that signs CSRs with `signer`.
    #[must_use]
    pub fn with_signer(signer: Arc<dyn CsrSigner>) -> Self {
        Self {
            csr_sign: Some(signer),
        }
    }

    /// Registration without automatic signing.
    #[must_use]
    pub fn without_signer() -> Self {
        Self { csr_sign: None }
    }
}

impl fmt::Debug for RegistrationOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationOption")
            .field("csr_sign", &self.csr_sign.as_ref().map(|_| "<signer>"))
            .finish()
    }
}

/// Options an add-on declares to the hub.
#[derive(Clone, Debug, Default)]
pub struct AgentAddonOptions {
    /// Name of the add-on type
    pub addon_name: String,
    /// Registration configuration; `None` when the add-on agent does not register with the hub
    pub registration: Option<RegistrationOption>,
}

/// An add-on type known to this process.
pub trait AgentAddon: Send + Sync {
    /// Options the add-on declares.
    fn options(&self) -> AgentAddonOptions;
}

/// [`AgentAddon`] with fixed options, as configured at startup.
#[derive(Clone, Debug)]
pub struct StaticAddon {
    options: AgentAddonOptions,
}

impl StaticAddon {
    #[must_use]
    pub fn new(addon_name: impl Into<String>, registration: Option<RegistrationOption>) -> Self {
        Self {
            options: AgentAddonOptions {
                addon_name: addon_name.into(),
                registration,
            },
        }
    }
}

impl AgentAddon for StaticAddon {
    fn options(&self) -> AgentAddonOptions {
        self.options.clone()
    }
}

/// Immutable table of known add-on types, keyed by add-on name.
#[derive(Clone, Default)]
pub struct AddonRegistry {
    addons: BTreeMap<String, Arc<dyn AgentAddon>>,
}

impl AddonRegistry {
    #[must_use]
    pub fn builder() -> AddonRegistryBuilder {
        AddonRegistryBuilder::default()
    }

    /// Look up an add-on by name.
    #[must_use]
    pub fn get(&self, addon_name: &str) -> Option<&Arc<dyn AgentAddon>> {
        self.addons.get(addon_name)
    }

    /// Whether the add-on type is known.
    #[must_use]
    pub fn contains(&self, addon_name: &str) -> bool {
        self.addons.contains_key(addon_name)
    }

    /// Registered add-on names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.addons.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.addons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.addons.is_empty()
    }
}

impl fmt::Debug for AddonRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.addons.keys()).finish()
    }
}

/// Builder for [`AddonRegistry`].
#[derive(Default)]
pub struct AddonRegistryBuilder {
    addons: BTreeMap<String, Arc<dyn AgentAddon>>,
}

impl AddonRegistryBuilder {
    /// Register an add-on under the name found in its options.
    ///
    /// Registering the same name twice keeps the last registration.
    #[must_use]
    pub fn register<A>(mut self, addon: A) -> Self
    where
        A: AgentAddon + 'static,
    {
        let name = addon.options().addon_name;
        self.addons.insert(name, Arc::new(addon));
        self
    }

    #[must_use]
    pub fn build(self) -> AddonRegistry {
        AddonRegistry {
            addons: self.addons,
        }
    }
}

#[cfg(test)]
#[path = "addon_tests.rs"]
mod addon_tests;
