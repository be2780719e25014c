// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! X.509 certificates as found in receipt signatures.
//!
//! The types follow the ASN.1 definitions of RFC 5280 and are decoded with
//! bcder. The original bytes are retained so the exact `TBSCertificate`
//! octets can be handed to signature verification.

use {
    crate::{
        algorithm::{AlgorithmIdentifier, KeyAlgorithm, SignatureAlgorithm},
        asn1time::take_time,
        der::{decode_der, decode_exact, take_oid, take_string, DerResult, MalformedDer, Tlv},
        error::ReceiptError,
    },
    bcder::{
        decode::{BytesSource, Constructed, DecodeError, Source},
        BitString, ConstOid, Integer, Mode, OctetString, Oid, Tag,
    },
    bytes::Bytes,
    chrono::{DateTime, Utc},
    ring::{digest, signature},
    std::{
        convert::{Infallible, TryFrom},
        fmt::{Debug, Display, Formatter},
    },
};

/// Common name.
///
/// 2.5.4.3
const OID_COMMON_NAME: ConstOid = Oid(&[85, 4, 3]);

/// Country.
///
/// 2.5.4.6
const OID_COUNTRY_NAME: ConstOid = Oid(&[85, 4, 6]);

/// Locality.
///
/// 2.5.4.7
const OID_LOCALITY_NAME: ConstOid = Oid(&[85, 4, 7]);

/// State or province.
///
/// 2.5.4.8
const OID_STATE_PROVINCE_NAME: ConstOid = Oid(&[85, 4, 8]);

/// Organization.
///
/// 2.5.4.10
const OID_ORGANIZATION_NAME: ConstOid = Oid(&[85, 4, 10]);

/// Organizational unit.
///
/// 2.5.4.11
const OID_ORGANIZATIONAL_UNIT_NAME: ConstOid = Oid(&[85, 4, 11]);

/// Subject key identifier extension.
///
/// 2.5.29.14
const OID_SUBJECT_KEY_IDENTIFIER: ConstOid = Oid(&[85, 29, 14]);

/// Key usage extension.
///
/// 2.5.29.15
const OID_KEY_USAGE: ConstOid = Oid(&[85, 29, 15]);

/// Basic constraints extension.
///
/// 2.5.29.19
const OID_BASIC_CONSTRAINTS: ConstOid = Oid(&[85, 29, 19]);

/// Authority key identifier extension.
///
/// 2.5.29.35
const OID_AUTHORITY_KEY_IDENTIFIER: ConstOid = Oid(&[85, 29, 35]);

/// `keyCertSign` bit of the key usage extension.
const KEY_USAGE_KEY_CERT_SIGN: usize = 5;

/// `digitalSignature` bit of the key usage extension.
const KEY_USAGE_DIGITAL_SIGNATURE: usize = 0;

/// A single `AttributeTypeAndValue` of a distinguished name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NameAttribute {
    pub oid: Oid,
    /// The encoded `AttributeValue`.
    pub value: Bytes,
}

impl NameAttribute {
    pub fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            let oid = take_oid(cons)?;
            let value = cons.capture_one()?.into_bytes();

            Ok(Self { oid, value })
        })
    }

    /// The attribute value as a string, if it holds a character string type.
    pub fn value_string(&self) -> Option<String> {
        Mode::Der
            .decode(self.value.clone(), |cons| take_string(cons))
            .ok()
    }

    fn short_name(&self) -> Option<&'static str> {
        if self.oid == OID_COMMON_NAME {
            Some("CN")
        } else if self.oid == OID_COUNTRY_NAME {
            Some("C")
        } else if self.oid == OID_LOCALITY_NAME {
            Some("L")
        } else if self.oid == OID_STATE_PROVINCE_NAME {
            Some("ST")
        } else if self.oid == OID_ORGANIZATION_NAME {
            Some("O")
        } else if self.oid == OID_ORGANIZATIONAL_UNIT_NAME {
            Some("OU")
        } else {
            None
        }
    }
}

/// An X.501 distinguished name.
///
/// ```ASN.1
/// Name ::= CHOICE { -- only one possibility for now --
///   rdnSequence  RDNSequence }
///
/// RDNSequence ::= SEQUENCE OF RelativeDistinguishedName
///
/// RelativeDistinguishedName ::= SET SIZE (1..MAX) OF AttributeTypeAndValue
/// ```
///
/// Equality is a comparison of the DER encodings. Issuer and subject names
/// in a chain are copied verbatim by every CA we deal with, so no string
/// preparation is attempted.
#[derive(Clone)]
pub struct Name {
    raw: Bytes,
    attributes: Vec<NameAttribute>,
}

impl Name {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        let mut attributes = vec![];

        let raw = cons.capture(|cons| {
            cons.take_sequence(|cons| {
                while let Some(()) = cons.take_opt_set(|cons| {
                    let count = attributes.len();

                    while let Some(attribute) = NameAttribute::take_opt_from(cons)? {
                        attributes.push(attribute);
                    }

                    if attributes.len() == count {
                        Err(cons.content_err("empty RelativeDistinguishedName"))
                    } else {
                        Ok(())
                    }
                })? {}

                Ok(())
            })
        })?;

        Ok(Self {
            raw: raw.into_bytes(),
            attributes,
        })
    }

    /// The DER encoding of this name.
    pub fn encoded(&self) -> &[u8] {
        self.raw.as_ref()
    }

    /// All attributes, in encoding order.
    pub fn attributes(&self) -> &[NameAttribute] {
        &self.attributes
    }

    fn find_string(&self, oid: &ConstOid) -> Option<String> {
        self.attributes
            .iter()
            .find(|attr| &attr.oid == oid)
            .and_then(|attr| attr.value_string())
    }

    /// The first common name (CN) attribute.
    pub fn common_name(&self) -> Option<String> {
        self.find_string(&OID_COMMON_NAME)
    }

    /// The first organization (O) attribute.
    pub fn organization(&self) -> Option<String> {
        self.find_string(&OID_ORGANIZATION_NAME)
    }

    /// The first organizational unit (OU) attribute.
    pub fn organizational_unit(&self) -> Option<String> {
        self.find_string(&OID_ORGANIZATIONAL_UNIT_NAME)
    }

    /// The first country (C) attribute.
    pub fn country(&self) -> Option<String> {
        self.find_string(&OID_COUNTRY_NAME)
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Name {}

impl Display for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // Most specific attribute first, the way humans read them.
        for (i, attr) in self.attributes.iter().rev().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }

            match attr.short_name() {
                Some(name) => f.write_str(name)?,
                None => write!(f, "{}", attr.oid)?,
            }
            f.write_str("=")?;

            match attr.value_string() {
                Some(value) => f.write_str(&value)?,
                None => write!(f, "#{}", hex::encode(&attr.value))?,
            }
        }

        Ok(())
    }
}

impl Debug for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Name({})", self)
    }
}

/// Certificate version.
///
/// ```ASN.1
/// Version ::= INTEGER { v1(0), v2(1), v3(2) }
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Version {
    V1 = 0,
    V2 = 1,
    V3 = 2,
}

impl Version {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        match cons.take_primitive_if(Tag::INTEGER, |prim| prim.to_i8())? {
            0 => Ok(Self::V1),
            1 => Ok(Self::V2),
            2 => Ok(Self::V3),
            _ => Err(cons.content_err("unexpected Version value")),
        }
    }
}

/// Validity interval of a certificate.
///
/// ```ASN.1
/// Validity ::= SEQUENCE {
///   notBefore      Time,
///   notAfter       Time }
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Validity {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

impl Validity {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let not_before = take_time(cons)?;
            let not_after = take_time(cons)?;

            Ok(Self {
                not_before,
                not_after,
            })
        })
    }
}

/// An X.509 v3 extension.
///
/// ```ASN.1
/// Extension  ::=  SEQUENCE  {
///      extnID      OBJECT IDENTIFIER,
///      critical    BOOLEAN DEFAULT FALSE,
///      extnValue   OCTET STRING }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Extension {
    pub id: Oid,
    pub critical: bool,
    /// Content octets of the `extnValue` OCTET STRING.
    pub value: Bytes,
}

impl Extension {
    pub fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            let id = take_oid(cons)?;
            let critical = cons.take_opt_bool()?.unwrap_or(false);
            let value = OctetString::take_from(cons)?.into_bytes();

            Ok(Self {
                id,
                critical,
                value,
            })
        })
    }

    /// Decode `extnValue`, which must hold exactly one element.
    fn decode_value<F, T>(&self, op: F) -> Result<T, DecodeError<Infallible>>
    where
        F: FnOnce(&mut Constructed<&mut BytesSource>) -> Result<T, DecodeError<Infallible>>,
    {
        decode_exact(self.value.clone(), op)
    }
}

fn take_extensions<S: Source>(
    cons: &mut Constructed<S>,
) -> Result<Vec<Extension>, DecodeError<S::Error>> {
    cons.take_sequence(|cons| {
        let mut extensions: Vec<Extension> = vec![];

        while let Some(extension) = Extension::take_opt_from(cons)? {
            if extensions.iter().any(|e| e.id == extension.id) {
                return Err(cons.content_err("duplicate certificate extension"));
            }

            extensions.push(extension);
        }

        Ok(extensions)
    })
}

/// Decoded basic constraints extension.
///
/// ```ASN.1
/// BasicConstraints ::= SEQUENCE {
///      cA                      BOOLEAN DEFAULT FALSE,
///      pathLenConstraint       INTEGER (0..MAX) OPTIONAL }
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BasicConstraints {
    pub ca: bool,
    pub path_len_constraint: Option<i64>,
}

impl BasicConstraints {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let ca = cons.take_opt_bool()?.unwrap_or(false);
            let path_len_constraint =
                cons.take_opt_primitive_if(Tag::INTEGER, |prim| prim.to_i64())?;

            Ok(Self {
                ca,
                path_len_constraint,
            })
        })
    }
}

/// Decoded key usage extension.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyUsage(BitString);

impl KeyUsage {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        BitString::take_from(cons).map(Self)
    }

    pub fn digital_signature(&self) -> bool {
        self.0.bit(KEY_USAGE_DIGITAL_SIGNATURE)
    }

    pub fn key_cert_sign(&self) -> bool {
        self.0.bit(KEY_USAGE_KEY_CERT_SIGN)
    }
}

/// The `keyIdentifier` of an authority key identifier extension.
///
/// `authorityCertIssuer` and `authorityCertSerialNumber` are skipped.
fn take_authority_key_identifier<S: Source>(
    cons: &mut Constructed<S>,
) -> Result<Option<Bytes>, DecodeError<S::Error>> {
    cons.take_sequence(|cons| {
        let key_identifier = cons.take_opt_primitive_if(Tag::CTX_0, |prim| prim.take_all())?;
        cons.skip_all()?;

        Ok(key_identifier)
    })
}

/// A certificate's `SubjectPublicKeyInfo`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubjectPublicKeyInfo {
    pub algorithm: AlgorithmIdentifier,
    pub subject_public_key: BitString,
    raw: Bytes,
}

impl SubjectPublicKeyInfo {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        let mut res = None;

        let raw = cons.capture(|cons| {
            cons.take_sequence(|cons| {
                let algorithm = AlgorithmIdentifier::take_from(cons)?;
                let subject_public_key = BitString::take_from(cons)?;

                res = Some((algorithm, subject_public_key));

                Ok(())
            })
        })?;

        let (algorithm, subject_public_key) =
            res.ok_or_else(|| cons.content_err("missing SubjectPublicKeyInfo"))?;

        Ok(Self {
            algorithm,
            subject_public_key,
            raw: raw.into_bytes(),
        })
    }

    /// The DER encoding of the whole structure.
    pub fn encoded(&self) -> &[u8] {
        self.raw.as_ref()
    }
}

/// The signed portion of a certificate.
///
/// ```ASN.1
/// TBSCertificate  ::=  SEQUENCE  {
///      version         [0]  Version DEFAULT v1,
///      serialNumber         CertificateSerialNumber,
///      signature            AlgorithmIdentifier,
///      issuer               Name,
///      validity             Validity,
///      subject              Name,
///      subjectPublicKeyInfo SubjectPublicKeyInfo,
///      issuerUniqueID  [1]  IMPLICIT UniqueIdentifier OPTIONAL,
///      subjectUniqueID [2]  IMPLICIT UniqueIdentifier OPTIONAL,
///      extensions      [3]  Extensions OPTIONAL }
/// ```
///
/// The obsolete unique identifiers are skipped.
#[derive(Clone, Debug)]
pub struct TbsCertificate {
    pub version: Version,
    pub serial_number: Integer,
    pub signature: AlgorithmIdentifier,
    pub issuer: Name,
    pub validity: Validity,
    pub subject: Name,
    pub subject_public_key_info: SubjectPublicKeyInfo,
    pub extensions: Vec<Extension>,
    raw: Bytes,
}

impl TbsCertificate {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        // The signature covers the exact encoding, so keep it around.
        let mut res = None;

        let raw = cons.capture(|cons| {
            cons.take_sequence(|cons| {
                let version = cons
                    .take_opt_constructed_if(Tag::CTX_0, |cons| Version::take_from(cons))?
                    .unwrap_or(Version::V1);
                let serial_number = Integer::take_from(cons)?;
                let signature = AlgorithmIdentifier::take_from(cons)?;
                let issuer = Name::take_from(cons)?;
                let validity = Validity::take_from(cons)?;
                let subject = Name::take_from(cons)?;
                let subject_public_key_info = SubjectPublicKeyInfo::take_from(cons)?;
                cons.take_opt_value_if(Tag::CTX_1, |content| BitString::from_content(content))?;
                cons.take_opt_value_if(Tag::CTX_2, |content| BitString::from_content(content))?;
                let extensions = cons
                    .take_opt_constructed_if(Tag::CTX_3, |cons| take_extensions(cons))?
                    .unwrap_or_default();

                res = Some(Self {
                    version,
                    serial_number,
                    signature,
                    issuer,
                    validity,
                    subject,
                    subject_public_key_info,
                    extensions,
                    raw: Bytes::new(),
                });

                Ok(())
            })
        })?;

        let mut res = res.ok_or_else(|| cons.content_err("missing TBSCertificate"))?;
        res.raw = raw.into_bytes();

        Ok(res)
    }
}

/// An X.509 certificate parsed from DER.
///
/// ```ASN.1
/// Certificate  ::=  SEQUENCE  {
///      tbsCertificate       TBSCertificate,
///      signatureAlgorithm   AlgorithmIdentifier,
///      signature            BIT STRING  }
/// ```
#[derive(Clone)]
pub struct Certificate {
    raw: Bytes,
    tbs: TbsCertificate,
    basic_constraints: Option<BasicConstraints>,
    key_usage: Option<KeyUsage>,
    subject_key_identifier: Option<Bytes>,
    authority_key_identifier: Option<Bytes>,
    signature_algorithm: AlgorithmIdentifier,
    signature: BitString,
}

impl Certificate {
    /// Construct an instance from DER encoded data.
    ///
    /// The data must hold exactly one certificate.
    pub fn from_der(data: impl Into<Bytes>) -> Result<Self, MalformedDer> {
        decode_der(data.into(), 0, |cons| Self::take_from(cons))
    }

    /// Construct an instance by parsing PEM encoded ASN.1 data.
    ///
    /// The data is a human readable string likely containing
    /// `--------- BEGIN CERTIFICATE ----------`.
    pub fn from_pem(data: impl AsRef<[u8]>) -> Result<Self, ReceiptError> {
        let data = pem::parse(data.as_ref()).map_err(ReceiptError::Pem)?;

        Self::from_der(data.contents).map_err(ReceiptError::MalformedCertificate)
    }

    /// Parse a certificate from an element already located by a reader.
    ///
    /// Offsets in errors are relative to the reader's input.
    pub(crate) fn from_tlv(tlv: &Tlv) -> DerResult<Self> {
        tlv.decode(|cons| Self::take_from(cons))
    }

    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        let mut res = None;

        let raw = cons.capture(|cons| {
            cons.take_sequence(|cons| {
                let tbs = TbsCertificate::take_from(cons)?;
                let signature_algorithm = AlgorithmIdentifier::take_from(cons)?;
                let signature = BitString::take_from(cons)?;

                if tbs.signature != signature_algorithm {
                    return Err(cons.content_err("signature algorithm differs from TBSCertificate"));
                }

                res = Some((tbs, signature_algorithm, signature));

                Ok(())
            })
        })?;

        let (tbs, signature_algorithm, signature) =
            res.ok_or_else(|| cons.content_err("missing Certificate"))?;

        let mut basic_constraints = None;
        let mut key_usage = None;
        let mut subject_key_identifier = None;
        let mut authority_key_identifier = None;

        for extension in &tbs.extensions {
            if extension.id == OID_BASIC_CONSTRAINTS {
                basic_constraints = Some(
                    extension
                        .decode_value(|cons| BasicConstraints::take_from(cons))
                        .map_err(DecodeError::convert)?,
                );
            } else if extension.id == OID_KEY_USAGE {
                key_usage = Some(
                    extension
                        .decode_value(|cons| KeyUsage::take_from(cons))
                        .map_err(DecodeError::convert)?,
                );
            } else if extension.id == OID_SUBJECT_KEY_IDENTIFIER {
                subject_key_identifier = Some(
                    extension
                        .decode_value(|cons| OctetString::take_from(cons))
                        .map_err(DecodeError::convert)?
                        .into_bytes(),
                );
            } else if extension.id == OID_AUTHORITY_KEY_IDENTIFIER {
                authority_key_identifier = extension
                    .decode_value(|cons| take_authority_key_identifier(cons))
                    .map_err(DecodeError::convert)?;
            }
        }

        Ok(Self {
            raw: raw.into_bytes(),
            tbs,
            basic_constraints,
            key_usage,
            subject_key_identifier,
            authority_key_identifier,
            signature_algorithm,
            signature,
        })
    }

    /// Obtain the DER data that was used to construct this instance.
    pub fn encoded_der(&self) -> &[u8] {
        self.raw.as_ref()
    }

    /// The exact `TBSCertificate` octets covered by the signature.
    pub fn tbs_certificate(&self) -> &[u8] {
        self.tbs.raw.as_ref()
    }

    /// Encode the original contents of this certificate to PEM.
    pub fn encode_pem(&self) -> String {
        pem::encode(&pem::Pem {
            tag: "CERTIFICATE".to_string(),
            contents: self.raw.to_vec(),
        })
    }

    pub fn version(&self) -> Version {
        self.tbs.version
    }

    pub fn tbs(&self) -> &TbsCertificate {
        &self.tbs
    }

    pub fn serial_number(&self) -> &Integer {
        &self.tbs.serial_number
    }

    pub fn issuer_name(&self) -> &Name {
        &self.tbs.issuer
    }

    pub fn subject_name(&self) -> &Name {
        &self.tbs.subject
    }

    pub fn subject_common_name(&self) -> Option<String> {
        self.tbs.subject.common_name()
    }

    /// A printable identification of the subject, for diagnostics.
    pub fn subject_display(&self) -> String {
        self.tbs.subject.to_string()
    }

    pub fn validity(&self) -> Validity {
        self.tbs.validity
    }

    pub fn validity_not_before(&self) -> DateTime<Utc> {
        self.tbs.validity.not_before
    }

    pub fn validity_not_after(&self) -> DateTime<Utc> {
        self.tbs.validity.not_after
    }

    /// Check the validity window at `now`. Both bounds are inclusive.
    pub fn check_validity(&self, now: DateTime<Utc>) -> Result<(), ReceiptError> {
        let Validity {
            not_before,
            not_after,
        } = self.tbs.validity;

        if now < not_before {
            Err(ReceiptError::CertificateNotYetValid {
                subject: self.subject_display(),
                not_before,
            })
        } else if now > not_after {
            Err(ReceiptError::CertificateExpired {
                subject: self.subject_display(),
                not_after,
            })
        } else {
            Ok(())
        }
    }

    /// Whether the subject name is also the issuer's name.
    ///
    /// This does not prove the certificate is self-signed.
    pub fn subject_is_issuer(&self) -> bool {
        self.tbs.subject == self.tbs.issuer
    }

    pub fn public_key_info(&self) -> &SubjectPublicKeyInfo {
        &self.tbs.subject_public_key_info
    }

    /// Obtain the raw data constituting this certificate's public key.
    pub fn public_key_data(&self) -> &[u8] {
        self.tbs
            .subject_public_key_info
            .subject_public_key
            .octet_slice()
            .unwrap_or(&[])
    }

    /// Resolve the [KeyAlgorithm] of the certified public key.
    pub fn key_algorithm(&self) -> Result<KeyAlgorithm, ReceiptError> {
        KeyAlgorithm::try_from(&self.tbs.subject_public_key_info.algorithm)
    }

    pub fn signature_algorithm(&self) -> Result<SignatureAlgorithm, ReceiptError> {
        SignatureAlgorithm::try_from(&self.signature_algorithm)
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.tbs.extensions
    }

    pub fn basic_constraints(&self) -> Option<BasicConstraints> {
        self.basic_constraints
    }

    pub fn key_usage(&self) -> Option<&KeyUsage> {
        self.key_usage.as_ref()
    }

    pub fn subject_key_identifier(&self) -> Option<&[u8]> {
        self.subject_key_identifier.as_deref()
    }

    pub fn authority_key_identifier(&self) -> Option<&[u8]> {
        self.authority_key_identifier.as_deref()
    }

    /// Whether the certificate asserts it is a certificate authority.
    pub fn is_ca(&self) -> bool {
        self.basic_constraints.map(|bc| bc.ca).unwrap_or(false)
    }

    /// SHA-256 digest of the DER encoding.
    pub fn sha256_fingerprint(&self) -> digest::Digest {
        digest::digest(&digest::SHA256, &self.raw)
    }

    /// Verify a signature over `message` with this certificate's public key.
    ///
    /// Returns `Ok(false)` if the signature is well formed for the algorithm
    /// but does not verify.
    pub fn verify_signed_data(
        &self,
        signature_algorithm: SignatureAlgorithm,
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, ReceiptError> {
        let verify_algorithm =
            signature_algorithm.resolve_verification_algorithm(self.key_algorithm()?)?;

        let public_key = signature::UnparsedPublicKey::new(verify_algorithm, self.public_key_data());

        Ok(public_key.verify(message, signature).is_ok())
    }

    /// Verify that another certificate, `issuer`, signed this certificate.
    ///
    /// If this is a self-signed certificate, you can pass `self` as the
    /// argument.
    pub fn verify_signed_by_certificate(&self, issuer: &Certificate) -> Result<(), ReceiptError> {
        let signature_algorithm = self.signature_algorithm()?;

        let signature = match self.signature.octet_slice() {
            Some(signature) => signature,
            None => {
                return Err(ReceiptError::CertificateSignatureVerificationFailed(
                    self.subject_display(),
                ));
            }
        };

        if issuer.verify_signed_data(signature_algorithm, &self.tbs.raw, signature)? {
            Ok(())
        } else {
            Err(ReceiptError::CertificateSignatureVerificationFailed(
                self.subject_display(),
            ))
        }
    }

    /// Whether `issuer` could have issued this certificate, judging by names
    /// and key identifiers only.
    pub fn is_issued_by_name(&self, issuer: &Certificate) -> bool {
        if self.tbs.issuer != issuer.tbs.subject {
            return false;
        }

        match (
            self.authority_key_identifier(),
            issuer.subject_key_identifier(),
        ) {
            (Some(aki), Some(ski)) => aki == ski,
            _ => true,
        }
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Certificate {}

impl Debug for Certificate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("serial_number", &hex::encode(self.tbs.serial_number.as_slice()))
            .field("subject", &self.tbs.subject)
            .field("issuer", &self.tbs.issuer)
            .field("validity", &self.tbs.validity)
            .field("fingerprint", &hex::encode(self.sha256_fingerprint()))
            .finish()
    }
}
