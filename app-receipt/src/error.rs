// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::der::MalformedDer,
    chrono::{DateTime, Utc},
    std::fmt::{Display, Formatter},
    thiserror::Error,
};

/// The verdict categories a failed validation can produce.
///
/// Every [ReceiptError] maps onto exactly one kind. The kind is the stable
/// contract; the error's message is diagnostic only.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    MalformedInput,
    UnsupportedContentType,
    UntrustedRoot,
    BrokenChain,
    Expired,
    NotYetValid,
    BadSignature,
    DigestMismatch,
    BundleMismatch,
    VersionMismatch,
    HashMismatch,
    MissingField,
    LeafNotFound,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::MalformedInput => "MalformedInput",
            Self::UnsupportedContentType => "UnsupportedContentType",
            Self::UntrustedRoot => "UntrustedRoot",
            Self::BrokenChain => "BrokenChain",
            Self::Expired => "Expired",
            Self::NotYetValid => "NotYetValid",
            Self::BadSignature => "BadSignature",
            Self::DigestMismatch => "DigestMismatch",
            Self::BundleMismatch => "BundleMismatch",
            Self::VersionMismatch => "VersionMismatch",
            Self::HashMismatch => "HashMismatch",
            Self::MissingField => "MissingField",
            Self::LeafNotFound => "LeafNotFound",
        })
    }
}

/// Unified error type for receipt parsing and validation.
#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error("{0}")]
    MalformedDer(#[from] MalformedDer),

    #[error("malformed PKCS#7 {stage}: {source}")]
    MalformedPkcs7 {
        stage: &'static str,
        source: MalformedDer,
    },

    #[error("malformed certificate: {0}")]
    MalformedCertificate(MalformedDer),

    #[error("PEM decoding error: {0}")]
    Pem(pem::PemError),

    #[error("malformed receipt attribute {attribute}: {detail}")]
    MalformedAttribute { attribute: i64, detail: String },

    #[error("invalid device identifier: {0}")]
    InvalidDeviceIdentifier(String),

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// An algorithm of the receipt's signer. Chain building reports
    /// algorithms it cannot verify as [Self::BrokenChain].
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("certificate chain does not terminate at the trust anchor: {0}")]
    UntrustedRoot(String),

    #[error("broken certificate chain: {0}")]
    BrokenChain(String),

    #[error("signature of certificate {0} does not verify under its issuer")]
    CertificateSignatureVerificationFailed(String),

    #[error("certificate {subject} expired at {not_after}")]
    CertificateExpired {
        subject: String,
        not_after: DateTime<Utc>,
    },

    #[error("certificate {subject} is not valid before {not_before}")]
    CertificateNotYetValid {
        subject: String,
        not_before: DateTime<Utc>,
    },

    #[error("receipt expired at {0}")]
    ReceiptExpired(DateTime<Utc>),

    #[error("signing certificate not found among embedded certificates")]
    LeafNotFound,

    #[error("bad signature: {0}")]
    BadSignature(String),

    #[error("message digest attribute does not match content digest")]
    DigestMismatch,

    #[error("bundle identifier mismatch: expected {expected:?}, got {actual:?}")]
    BundleMismatch { expected: String, actual: String },

    #[error("{field} mismatch: expected {expected:?}, got {actual:?}")]
    VersionMismatch {
        field: &'static str,
        expected: String,
        actual: Option<String>,
    },

    #[error("receipt hash does not match device identifier")]
    HashMismatch,

    #[error("receipt is missing {0}")]
    MissingField(&'static str),
}

impl ReceiptError {
    /// The verdict category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedDer(_)
            | Self::MalformedPkcs7 { .. }
            | Self::MalformedCertificate(_)
            | Self::Pem(_)
            | Self::MalformedAttribute { .. }
            | Self::InvalidDeviceIdentifier(_) => ErrorKind::MalformedInput,
            Self::UnsupportedContentType(_) => ErrorKind::UnsupportedContentType,
            Self::UnsupportedAlgorithm(_) | Self::BadSignature(_) => ErrorKind::BadSignature,
            Self::UntrustedRoot(_) => ErrorKind::UntrustedRoot,
            Self::BrokenChain(_) | Self::CertificateSignatureVerificationFailed(_) => {
                ErrorKind::BrokenChain
            }
            Self::CertificateExpired { .. } | Self::ReceiptExpired(_) => ErrorKind::Expired,
            Self::CertificateNotYetValid { .. } => ErrorKind::NotYetValid,
            Self::LeafNotFound => ErrorKind::LeafNotFound,
            Self::DigestMismatch => ErrorKind::DigestMismatch,
            Self::BundleMismatch { .. } => ErrorKind::BundleMismatch,
            Self::VersionMismatch { .. } => ErrorKind::VersionMismatch,
            Self::HashMismatch => ErrorKind::HashMismatch,
            Self::MissingField(_) => ErrorKind::MissingField,
        }
    }
}

/// Attaches a PKCS#7 parsing stage to DER errors.
pub(crate) trait StageContext<T> {
    fn stage(self, stage: &'static str) -> Result<T, ReceiptError>;
}

impl<T> StageContext<T> for Result<T, MalformedDer> {
    fn stage(self, stage: &'static str) -> Result<T, ReceiptError> {
        self.map_err(|source| ReceiptError::MalformedPkcs7 { stage, source })
    }
}
