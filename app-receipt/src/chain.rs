// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Certificate chain building and validation.
//!
//! A chain is built from the signer's certificate upwards. At each step the
//! issuer is looked up among the trust anchor and the certificates embedded
//! in the receipt, by name and key identifier, and must have produced the
//! child's signature. Building stops once the anchor is reached.

use {
    crate::{
        anchor::TrustAnchor, certificate::Certificate, error::ReceiptError,
        pkcs7::EmbeddedCertificate,
    },
    chrono::{DateTime, Utc},
    log::debug,
};

/// Maximum number of certificates in a chain, anchor included.
pub const MAX_CHAIN_LENGTH: usize = 8;

/// Verify that `issuer` signed `cert`.
///
/// An algorithm we cannot verify makes the link unusable rather than the
/// receipt's own signature bad.
fn verify_link(cert: &Certificate, issuer: &Certificate) -> Result<(), ReceiptError> {
    cert.verify_signed_by_certificate(issuer)
        .map_err(|e| match e {
            ReceiptError::UnsupportedAlgorithm(algorithm) => ReceiptError::BrokenChain(format!(
                "{} cannot be verified under {}: {}",
                cert.subject_display(),
                issuer.subject_display(),
                algorithm
            )),
            e => e,
        })
}

/// A path from a signing certificate to a trust anchor.
///
/// Iteration starts at the signer's certificate and ends at the anchor.
#[derive(Clone, Debug)]
pub struct CertificateChain<'a> {
    leaf: &'a Certificate,
    issuers: Vec<&'a Certificate>,
}

impl<'a> CertificateChain<'a> {
    /// Build the chain for `leaf`.
    ///
    /// This verifies every link's signature but nothing else. See
    /// [Self::validate] for temporal and constraint checks.
    pub fn build(
        leaf: &'a Certificate,
        embedded: &'a [EmbeddedCertificate],
        anchor: &'a TrustAnchor,
    ) -> Result<Self, ReceiptError> {
        let mut chain = Self {
            leaf,
            issuers: vec![],
        };

        if anchor.matches(leaf) {
            debug!("signing certificate {} is the trust anchor", leaf.subject_display());
            return Ok(chain);
        }

        let mut pool = vec![anchor.certificate()];
        for cert in embedded {
            pool.push(cert.certificate()?);
        }

        let mut current = leaf;

        loop {
            if chain.certificate_count() >= MAX_CHAIN_LENGTH {
                return Err(ReceiptError::BrokenChain(format!(
                    "no trust anchor within {} certificates",
                    MAX_CHAIN_LENGTH
                )));
            }

            let mut failure = None;
            let mut parent = None;

            for candidate in pool.iter().copied() {
                if chain.iter().any(|c| c == candidate) || !current.is_issued_by_name(candidate) {
                    continue;
                }

                match verify_link(current, candidate) {
                    Ok(()) => {
                        parent = Some(candidate);
                        break;
                    }
                    Err(e) => {
                        debug!(
                            "{} does not verify under candidate issuer {}: {}",
                            current.subject_display(),
                            candidate.subject_display(),
                            e
                        );
                        failure.get_or_insert(e);
                    }
                }
            }

            match (parent, failure) {
                (Some(parent), _) => {
                    debug!(
                        "{} is issued by {}",
                        current.subject_display(),
                        parent.subject_display()
                    );

                    if anchor.matches(parent) {
                        chain.issuers.push(anchor.certificate());
                        return Ok(chain);
                    }

                    chain.issuers.push(parent);
                    current = parent;
                }
                (None, Some(e @ ReceiptError::CertificateSignatureVerificationFailed(_))) => {
                    return Err(e);
                }
                (None, Some(e)) => {
                    return Err(ReceiptError::BrokenChain(format!(
                        "{}: {}",
                        current.subject_display(),
                        e
                    )));
                }
                // A self-issued certificate or a CA whose issuer is unknown
                // is a root we were not asked to trust.
                (None, None) if current.subject_is_issuer() || current.is_ca() => {
                    return Err(ReceiptError::UntrustedRoot(current.subject_display()));
                }
                (None, None) => {
                    return Err(ReceiptError::BrokenChain(format!(
                        "issuer {} of {} not found",
                        current.issuer_name(),
                        current.subject_display()
                    )));
                }
            }
        }
    }

    /// Check every certificate is valid at `now` and that every issuer is
    /// allowed to issue certificates.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ReceiptError> {
        for cert in self.iter() {
            cert.check_validity(now)?;
        }

        for (depth, cert) in self.iter().enumerate().skip(1) {
            let constraints = match cert.basic_constraints() {
                Some(constraints) if constraints.ca => constraints,
                _ => {
                    return Err(ReceiptError::BrokenChain(format!(
                        "{} is not a certificate authority",
                        cert.subject_display()
                    )));
                }
            };

            if let Some(key_usage) = cert.key_usage() {
                if !key_usage.key_cert_sign() {
                    return Err(ReceiptError::BrokenChain(format!(
                        "{} may not sign certificates",
                        cert.subject_display()
                    )));
                }
            }

            // Intermediates below this certificate, the leaf excluded.
            let below = (depth - 1) as i64;
            if let Some(limit) = constraints.path_len_constraint {
                if below > limit {
                    return Err(ReceiptError::BrokenChain(format!(
                        "path length constraint of {} exceeded",
                        cert.subject_display()
                    )));
                }
            }
        }

        Ok(())
    }

    /// Build and validate the chain for `leaf` in one go.
    pub fn verify(
        leaf: &'a Certificate,
        embedded: &'a [EmbeddedCertificate],
        anchor: &'a TrustAnchor,
        now: DateTime<Utc>,
    ) -> Result<Self, ReceiptError> {
        let chain = Self::build(leaf, embedded, anchor)?;
        chain.validate(now)?;

        Ok(chain)
    }

    pub fn leaf(&self) -> &'a Certificate {
        self.leaf
    }

    /// The certificate matching the trust anchor.
    pub fn anchor(&self) -> &'a Certificate {
        self.issuers.last().copied().unwrap_or(self.leaf)
    }

    pub fn certificate_count(&self) -> usize {
        self.issuers.len() + 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Certificate> + '_ {
        std::iter::once(self.leaf).chain(self.issuers.iter().copied())
    }
}
