// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! CA-backed signing capability.
//!
//! [`CaSigner`] issues certificates for add-on CSRs from a CA certificate and
//! private key loaded at startup. The issued certificate keeps the subject and
//! subject alternative names of the request, takes its key usages from
//! `spec.usages` and is valid from five minutes in the past until the earlier
//! of the configured maximum validity and the CSR's `spec.expirationSeconds`.
//!
//! The signer never sees the agent's private key; it only reads the public key
//! embedded in the PEM certificate request.

use crate::addon::CsrSigner;
use crate::errors::SignError;
use chrono::{Datelike, Duration as ChronoDuration, Timelike, Utc};
use k8s_openapi::api::certificates::v1::CertificateSigningRequest;
use rcgen::{
    CertificateSigningRequestParams, ExtendedKeyUsagePurpose, IsCa, Issuer, KeyPair,
    KeyUsagePurpose,
};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Backdating applied to `notBefore` to tolerate clock skew between hub and agents
const CLOCK_SKEW_ALLOWANCE_MINUTES: i64 = 5;

/// Seconds in one day
const SECONDS_PER_DAY: u64 = 86_400;

/// Signs CSRs with a CA certificate and key.
pub struct CaSigner {
    /// CA key pair serialized as PEM (deserialized per signature since `KeyPair` isn't `Clone`)
    ca_key_pem: String,
    /// PEM-encoded CA certificate
    ca_cert_pem: String,
    /// Upper bound on the lifetime of issued certificates
    max_validity: Duration,
}

impl CaSigner {
    /// Create a signer from PEM-encoded CA material.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::Authority`] if the key or certificate cannot be parsed,
    /// or if `validity_days` is zero.
    pub fn from_pem(cert_pem: &str, key_pem: &str, validity_days: u32) -> Result<Self, SignError> {
        if validity_days == 0 {
            return Err(SignError::Authority(
                "certificate validity must be at least one day".to_string(),
            ));
        }

        let key = KeyPair::from_pem(key_pem)
            .map_err(|e| SignError::Authority(format!("failed to parse CA key: {e}")))?;
        let _issuer = Issuer::from_ca_cert_pem(cert_pem, &key)
            .map_err(|e| SignError::Authority(format!("failed to parse CA certificate: {e}")))?;

        Ok(Self {
            ca_key_pem: key_pem.to_string(),
            ca_cert_pem: cert_pem.to_string(),
            max_validity: Duration::from_secs(u64::from(validity_days) * SECONDS_PER_DAY),
        })
    }

    /// Create a signer from PEM files on disk.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::Authority`] if a file cannot be read or parsed.
    pub fn from_files(
        cert_path: &Path,
        key_path: &Path,
        validity_days: u32,
    ) -> Result<Self, SignError> {
        let cert_pem = std::fs::read_to_string(cert_path).map_err(|e| {
            SignError::Authority(format!("failed to read {}: {e}", cert_path.display()))
        })?;
        let key_pem = std::fs::read_to_string(key_path).map_err(|e| {
            SignError::Authority(format!("failed to read {}: {e}", key_path.display()))
        })?;
        Self::from_pem(&cert_pem, &key_pem, validity_days)
    }

    /// The CA certificate in PEM format.
    #[must_use]
    pub fn ca_cert_pem(&self) -> &str {
        &self.ca_cert_pem
    }

    /// Lifetime of a certificate issued for a CSR requesting `expiration_seconds`.
    ///
    /// Non-positive requests are ignored and the configured maximum applies.
    #[must_use]
    pub fn validity_for(&self, expiration_seconds: Option<i32>) -> Duration {
        match expiration_seconds.and_then(|s| u64::try_from(s).ok()) {
            Some(requested) if requested > 0 => {
                Duration::from_secs(requested).min(self.max_validity)
            }
            _ => self.max_validity,
        }
    }

    /// Issue a certificate for a PEM certificate request.
    ///
    /// # Errors
    ///
    /// Returns a [`SignError`] if the request cannot be parsed, asks for an
    /// unsupported usage, or the certificate cannot be signed.
    pub fn issue(
        &self,
        request_pem: &str,
        usages: &[String],
        validity: Duration,
    ) -> Result<String, SignError> {
        let mut csr_params = CertificateSigningRequestParams::from_pem(request_pem)
            .map_err(|e| SignError::InvalidRequest(format!("failed to parse CSR: {e}")))?;

        let (key_usages, extended_key_usages) = key_usages(usages)?;
        csr_params.params.is_ca = IsCa::NoCa;
        csr_params.params.key_usages = key_usages;
        csr_params.params.extended_key_usages = extended_key_usages;

        let start = Utc::now() - ChronoDuration::minutes(CLOCK_SKEW_ALLOWANCE_MINUTES);
        let month = u8::try_from(start.month())
            .map_err(|_| SignError::Certificate(format!("month out of range: {}", start.month())))?;
        let day = u8::try_from(start.day())
            .map_err(|_| SignError::Certificate(format!("day out of range: {}", start.day())))?;
        let not_before = rcgen::date_time_ymd(start.year(), month, day)
            + Duration::from_secs(u64::from(start.num_seconds_from_midnight()));
        csr_params.params.not_before = not_before;
        csr_params.params.not_after = not_before + validity;

        let ca_key = KeyPair::from_pem(&self.ca_key_pem)
            .map_err(|e| SignError::Authority(format!("failed to load CA key: {e}")))?;
        let issuer = Issuer::from_ca_cert_pem(&self.ca_cert_pem, &ca_key)
            .map_err(|e| SignError::Authority(format!("failed to create issuer: {e}")))?;

        let signed = csr_params
            .signed_by(&issuer)
            .map_err(|e| SignError::Certificate(format!("failed to sign certificate: {e}")))?;

        Ok(signed.pem())
    }
}

impl CsrSigner for CaSigner {
    fn sign(&self, csr: &CertificateSigningRequest) -> Result<Vec<u8>, SignError> {
        let request_pem = std::str::from_utf8(&csr.spec.request.0)
            .map_err(|e| SignError::InvalidRequest(format!("request is not PEM text: {e}")))?;
        let usages = csr.spec.usages.as_deref().unwrap_or_default();
        let validity = self.validity_for(csr.spec.expiration_seconds);

        debug!(
            csr = csr.metadata.name.as_deref().unwrap_or_default(),
            validity_secs = validity.as_secs(),
            "Issuing certificate"
        );

        self.issue(request_pem, usages, validity)
            .map(String::into_bytes)
    }
}

/// Map Kubernetes CSR usages to X.509 key usages and extended key usages.
///
/// An empty list yields the usages of an add-on client certificate:
/// digital signature, key encipherment and client auth.
///
/// # Errors
///
/// Returns [`SignError::UnsupportedUsage`] for CA usages (`cert sign`,
/// `crl sign`) and for unknown usage strings.
pub fn key_usages(
    usages: &[String],
) -> Result<(Vec<KeyUsagePurpose>, Vec<ExtendedKeyUsagePurpose>), SignError> {
    if usages.is_empty() {
        return Ok((
            vec![
                KeyUsagePurpose::DigitalSignature,
                KeyUsagePurpose::KeyEncipherment,
            ],
            vec![ExtendedKeyUsagePurpose::ClientAuth],
        ));
    }

    let mut key_usages = Vec::new();
    let mut extended = Vec::new();
    for usage in usages {
        match usage.as_str() {
            "signing" | "digital signature" => {
                push_unique(&mut key_usages, KeyUsagePurpose::DigitalSignature);
            }
            "content commitment" => push_unique(&mut key_usages, KeyUsagePurpose::ContentCommitment),
            "key encipherment" => push_unique(&mut key_usages, KeyUsagePurpose::KeyEncipherment),
            "key agreement" => push_unique(&mut key_usages, KeyUsagePurpose::KeyAgreement),
            "data encipherment" => push_unique(&mut key_usages, KeyUsagePurpose::DataEncipherment),
            "server auth" => push_unique(&mut extended, ExtendedKeyUsagePurpose::ServerAuth),
            "client auth" => push_unique(&mut extended, ExtendedKeyUsagePurpose::ClientAuth),
            "code signing" => push_unique(&mut extended, ExtendedKeyUsagePurpose::CodeSigning),
            "email protection" | "s/mime" => {
                push_unique(&mut extended, ExtendedKeyUsagePurpose::EmailProtection);
            }
            "timestamping" => push_unique(&mut extended, ExtendedKeyUsagePurpose::TimeStamping),
            "ocsp signing" => push_unique(&mut extended, ExtendedKeyUsagePurpose::OcspSigning),
            other => return Err(SignError::UnsupportedUsage(other.to_string())),
        }
    }

    Ok((key_usages, extended))
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

#[cfg(test)]
#[path = "signer_tests.rs"]
mod signer_tests;
