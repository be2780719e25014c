// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pinned trust anchors.
//!
//! App Store receipts chain to the Apple Inc. Root CA. The canonical source of
//! that certificate is <https://www.apple.com/certificateauthority/>.

use {
    crate::{certificate::Certificate, der::MalformedDer, error::ReceiptError},
    bytes::Bytes,
    once_cell::sync::Lazy,
    ring::digest::Digest,
};

/// DER encoding of the Apple Inc. Root Certificate.
pub(crate) const APPLE_INC_ROOT_DER: &[u8] =
    include_bytes!("apple-certs/AppleIncRootCertificate.cer");

/// Apple Inc. Root Certificate
static APPLE_INC_ROOT: Lazy<Result<TrustAnchor, MalformedDer>> = Lazy::new(|| {
    Certificate::from_der(Bytes::from_static(APPLE_INC_ROOT_DER)).map(TrustAnchor::from_certificate)
});

/// A certificate trusted by fiat. Chains must terminate at it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TrustAnchor {
    certificate: Certificate,
}

impl TrustAnchor {
    pub fn from_certificate(certificate: Certificate) -> Self {
        Self { certificate }
    }

    /// Construct an anchor from a DER encoded certificate.
    pub fn from_der(data: impl Into<Bytes>) -> Result<Self, ReceiptError> {
        Certificate::from_der(data)
            .map(Self::from_certificate)
            .map_err(ReceiptError::MalformedCertificate)
    }

    /// Construct an anchor from a PEM encoded certificate.
    pub fn from_pem(data: impl AsRef<[u8]>) -> Result<Self, ReceiptError> {
        Certificate::from_pem(data).map(Self::from_certificate)
    }

    /// The Apple Inc. Root CA embedded in this crate.
    pub fn apple_inc_root() -> Result<&'static TrustAnchor, ReceiptError> {
        (*APPLE_INC_ROOT)
            .as_ref()
            .map_err(|e| ReceiptError::MalformedCertificate(e.clone()))
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Whether `cert` is this anchor.
    ///
    /// Either the `TBSCertificate` encodings are identical, or subject and
    /// public key are, which accepts a re-issued anchor.
    pub fn matches(&self, cert: &Certificate) -> bool {
        self.certificate.tbs_certificate() == cert.tbs_certificate()
            || (self.certificate.subject_name() == cert.subject_name()
                && self.certificate.public_key_info().encoded()
                    == cert.public_key_info().encoded())
    }

    pub fn sha256_fingerprint(&self) -> Digest {
        self.certificate.sha256_fingerprint()
    }
}
