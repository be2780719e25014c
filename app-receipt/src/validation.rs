// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End to end receipt validation.
//!
//! [validate] takes receipt bytes through these stages, failing on the
//! first error:
//!
//! 1. Parse the PKCS#7 envelope.
//! 2. Locate the signing certificate and verify its chain to the trust
//!    anchor.
//! 3. Verify the signer's signature and the message digest of the content.
//! 4. Decode the receipt payload.
//! 5. Check the payload against the caller's [Expectations].

use {
    crate::{
        anchor::TrustAnchor,
        certificate::Certificate,
        chain::CertificateChain,
        device::DeviceIdentifier,
        error::ReceiptError,
        pkcs7::{SignedData, SignerInfo},
        receipt::Receipt,
    },
    bytes::Bytes,
    chrono::{DateTime, Utc},
    log::{debug, warn},
    std::{
        fmt::{Display, Formatter},
        ops::Deref,
    },
};

/// What a receipt must satisfy to be accepted.
#[derive(Clone, Debug)]
pub struct Expectations {
    bundle_identifier: String,
    device_identifier: DeviceIdentifier,
    bundle_version: Option<String>,
    original_application_version: Option<String>,
    anchor: Option<TrustAnchor>,
    now: Option<DateTime<Utc>>,
    skip_signature_validation: bool,
    skip_hash_validation: bool,
}

impl Expectations {
    pub fn new(bundle_identifier: impl ToString, device_identifier: DeviceIdentifier) -> Self {
        Self {
            bundle_identifier: bundle_identifier.to_string(),
            device_identifier,
            bundle_version: None,
            original_application_version: None,
            anchor: None,
            now: None,
            skip_signature_validation: false,
            skip_hash_validation: false,
        }
    }

    /// Require the application version attribute to equal `version`.
    #[must_use]
    pub fn with_bundle_version(mut self, version: impl ToString) -> Self {
        self.bundle_version = Some(version.to_string());
        self
    }

    /// Require the original application version attribute to equal `version`.
    #[must_use]
    pub fn with_original_application_version(mut self, version: impl ToString) -> Self {
        self.original_application_version = Some(version.to_string());
        self
    }

    /// Trust `anchor` instead of the Apple Inc. Root CA.
    #[must_use]
    pub fn with_anchor(mut self, anchor: TrustAnchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    /// Evaluate validity periods at `now` instead of the current time.
    #[must_use]
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Do not verify certificates or signatures.
    #[must_use]
    pub fn skip_signature_validation(mut self) -> Self {
        self.skip_signature_validation = true;
        self
    }

    /// Do not check the receipt was issued to the device.
    #[must_use]
    pub fn skip_hash_validation(mut self) -> Self {
        self.skip_hash_validation = true;
        self
    }

    pub fn bundle_identifier(&self) -> &str {
        &self.bundle_identifier
    }

    pub fn device_identifier(&self) -> &DeviceIdentifier {
        &self.device_identifier
    }

    fn anchor(&self) -> Result<&TrustAnchor, ReceiptError> {
        match &self.anchor {
            Some(anchor) => Ok(anchor),
            None => TrustAnchor::apple_inc_root(),
        }
    }
}

/// Progress of a validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationStage {
    Start,
    Parsed,
    ChainVerified,
    ContentVerified,
    Decoded,
    DomainChecked,
}

impl Display for ValidationStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::Parsed => "parsed",
            Self::ChainVerified => "chain verified",
            Self::ContentVerified => "content verified",
            Self::Decoded => "decoded",
            Self::DomainChecked => "domain checked",
        })
    }
}

fn enter(stage: ValidationStage) {
    debug!("receipt validation stage: {}", stage);
}

/// A receipt that passed [validate].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VerifiedReceipt {
    receipt: Receipt,
    signer_certificate: Option<Certificate>,
    verification_time: DateTime<Utc>,
}

impl VerifiedReceipt {
    pub fn receipt(&self) -> &Receipt {
        &self.receipt
    }

    pub fn into_receipt(self) -> Receipt {
        self.receipt
    }

    /// The certificate whose signature was accepted.
    ///
    /// `None` when signature validation was skipped.
    pub fn signer_certificate(&self) -> Option<&Certificate> {
        self.signer_certificate.as_ref()
    }

    /// The time temporal checks were evaluated at.
    pub fn verification_time(&self) -> DateTime<Utc> {
        self.verification_time
    }
}

impl Deref for VerifiedReceipt {
    type Target = Receipt;

    fn deref(&self) -> &Self::Target {
        &self.receipt
    }
}

/// Validate a DER encoded receipt.
pub fn validate(data: &[u8], expectations: &Expectations) -> Result<VerifiedReceipt, ReceiptError> {
    let now = expectations.now.unwrap_or_else(Utc::now);

    enter(ValidationStage::Start);
    let signed_data = SignedData::from_der(Bytes::copy_from_slice(data))?;
    enter(ValidationStage::Parsed);

    let signer_certificate = if expectations.skip_signature_validation {
        debug!("skipping signature validation");
        None
    } else {
        Some(verify_signers(&signed_data, expectations.anchor()?, now)?)
    };
    enter(ValidationStage::ContentVerified);

    let receipt = Receipt::decode(
        signed_data.signed_content().clone(),
        signed_data.content_offset(),
    )?;
    enter(ValidationStage::Decoded);

    check_domain(&receipt, expectations, now)?;
    enter(ValidationStage::DomainChecked);

    Ok(VerifiedReceipt {
        receipt,
        signer_certificate,
        verification_time: now,
    })
}

/// Find a signer that verifies and return its certificate.
///
/// Signers are tried in encoded order. If none verifies, the error of the
/// first is returned.
fn verify_signers(
    signed_data: &SignedData,
    anchor: &TrustAnchor,
    now: DateTime<Utc>,
) -> Result<Certificate, ReceiptError> {
    let mut first_error = None;

    for (index, signer) in signed_data.signers().enumerate() {
        match verify_signer(signed_data, signer, anchor, now) {
            Ok(cert) => {
                debug!("accepted signer #{} ({})", index, cert.subject_display());
                return Ok(cert.clone());
            }
            Err(e) => {
                warn!("rejected signer #{}: {}", index, e);
                first_error.get_or_insert(e);
            }
        }
    }

    Err(first_error.unwrap_or_else(|| ReceiptError::BadSignature("no signers".into())))
}

fn verify_signer<'a>(
    signed_data: &'a SignedData,
    signer: &'a SignerInfo,
    anchor: &'a TrustAnchor,
    now: DateTime<Utc>,
) -> Result<&'a Certificate, ReceiptError> {
    let leaf = signer.find_certificate(signed_data.certificates())?;

    let chain = CertificateChain::verify(leaf, signed_data.certificates(), anchor, now)?;
    debug!(
        "chain of {} certificates verified",
        chain.certificate_count()
    );
    enter(ValidationStage::ChainVerified);

    let content = signed_data.signed_content();
    signer.verify_signature_with_certificate(leaf, content)?;
    signer.verify_message_digest(content)?;

    Ok(leaf)
}

fn check_domain(
    receipt: &Receipt,
    expectations: &Expectations,
    now: DateTime<Utc>,
) -> Result<(), ReceiptError> {
    if receipt.bundle_identifier() != expectations.bundle_identifier {
        return Err(ReceiptError::BundleMismatch {
            expected: expectations.bundle_identifier.clone(),
            actual: receipt.bundle_identifier().to_string(),
        });
    }

    if let Some(expected) = &expectations.bundle_version {
        if receipt.application_version() != expected {
            return Err(ReceiptError::VersionMismatch {
                field: "application version",
                expected: expected.clone(),
                actual: Some(receipt.application_version().to_string()),
            });
        }
    }

    if let Some(expected) = &expectations.original_application_version {
        if receipt.original_application_version() != Some(expected.as_str()) {
            return Err(ReceiptError::VersionMismatch {
                field: "original application version",
                expected: expected.clone(),
                actual: receipt.original_application_version().map(String::from),
            });
        }
    }

    if expectations.skip_hash_validation {
        debug!("skipping hash validation");
    } else {
        receipt.verify_hash(&expectations.device_identifier)?;
    }

    match receipt.expiration_date() {
        Some(expiration) if now > expiration => Err(ReceiptError::ReceiptExpired(expiration)),
        _ => Ok(()),
    }
}
