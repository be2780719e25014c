// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! PKCS#7 / CMS containers.
//!
//! A receipt is a `ContentInfo` whose content is `SignedData` (RFC 5652
//! Section 5) wrapping a `data` payload. [ContentInfo] models every PKCS#7
//! content type as a variant so callers match on the one they accept.
//! [SignedData] exposes the payload, the embedded certificates and the
//! signers, and [SignerInfo] performs the per-signer cryptographic checks.
//!
//! # IMPORTANT SECURITY LIMITATIONS
//!
//! Nothing in this module validates certificates. A [SignerInfo] that
//! verifies only proves the payload was signed by the key in some embedded
//! certificate. Chain building against a trust anchor lives in
//! [crate::chain].

use {
    crate::{
        algorithm::{AlgorithmIdentifier, DigestAlgorithm, SignatureAlgorithm},
        asn1time::take_time,
        certificate::{Certificate, Name},
        der::{take_oid, DerResult, MalformedDer, Reader, Tlv},
        error::{ReceiptError, StageContext},
    },
    bcder::{
        decode::{Constructed, DecodeError, Source},
        encode, Captured, ConstOid, Integer, Mode, OctetString, Oid, Tag,
    },
    bytes::Bytes,
    chrono::{DateTime, Utc},
    log::debug,
    once_cell::sync::OnceCell,
    ring::{constant_time, digest::Digest},
    std::{
        convert::TryFrom,
        fmt::{Debug, Formatter},
    },
};

/// The data content type.
///
/// 1.2.840.113549.1.7.1
const OID_ID_DATA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 1]);

/// The signed-data content type.
///
/// 1.2.840.113549.1.7.2
const OID_ID_SIGNED_DATA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 2]);

/// The enveloped-data content type.
///
/// 1.2.840.113549.1.7.3
const OID_ENVELOPE_DATA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 3]);

/// The signed-and-enveloped-data content type.
///
/// 1.2.840.113549.1.7.4
const OID_SIGNED_AND_ENVELOPED_DATA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 4]);

/// The digested-data content type.
///
/// 1.2.840.113549.1.7.5
const OID_DIGESTED_DATA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 5]);

/// The encrypted-data content type.
///
/// 1.2.840.113549.1.7.6
const OID_ENCRYPTED_DATA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 6]);

/// Identifies the content-type attribute.
///
/// 1.2.840.113549.1.9.3
const OID_CONTENT_TYPE: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 3]);

/// Identifies the message-digest attribute.
///
/// 1.2.840.113549.1.9.4
const OID_MESSAGE_DIGEST: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 4]);

/// Identifies the signing-time attribute.
///
/// 1.2.840.113549.1.9.5
const OID_SIGNING_TIME: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 5]);

fn content_type_name(oid: &Oid) -> String {
    if oid == &OID_ID_DATA {
        "data".into()
    } else if oid == &OID_ID_SIGNED_DATA {
        "signedData".into()
    } else if oid == &OID_ENVELOPE_DATA {
        "envelopedData".into()
    } else if oid == &OID_SIGNED_AND_ENVELOPED_DATA {
        "signedAndEnvelopedData".into()
    } else if oid == &OID_DIGESTED_DATA {
        "digestedData".into()
    } else if oid == &OID_ENCRYPTED_DATA {
        "encryptedData".into()
    } else {
        oid.to_string()
    }
}

/// A PKCS#7 `ContentInfo`.
///
/// Only [ContentInfo::Signed] and [ContentInfo::Data] are decoded. The other
/// variants hold the undecoded `[0] EXPLICIT` content, if any.
#[derive(Clone, Debug)]
pub enum ContentInfo {
    Data(Bytes),
    Signed(Box<SignedData>),
    Enveloped(Option<Bytes>),
    SignedAndEnveloped(Option<Bytes>),
    Digest(Option<Bytes>),
    Encrypted(Option<Bytes>),
    Other(Oid, Option<Bytes>),
}

impl ContentInfo {
    /// Parse a DER encoded `ContentInfo`.
    ///
    /// The input must hold exactly one element.
    pub fn from_der(data: impl Into<Bytes>) -> Result<Self, ReceiptError> {
        let mut outer = Reader::new(data);
        let mut reader = outer.read_sequence().stage("content info")?;
        outer.finish().stage("content info")?;

        let content_type = reader.read_oid().stage("content info")?;
        let content = reader.read_optional(Tag::CTX_0).stage("content info")?;
        reader.finish().stage("content info")?;

        if content_type == OID_ID_SIGNED_DATA {
            let content = match content {
                Some(content) => content,
                None => {
                    return Err(MalformedDer::new(0, "signedData without content"))
                        .stage("content info")
                }
            };

            let mut explicit = content.reader();
            let signed_data = SignedData::take_from(&mut explicit)?;
            explicit.finish().stage("signed data")?;

            Ok(Self::Signed(Box::new(signed_data)))
        } else if content_type == OID_ID_DATA {
            let data = match &content {
                Some(content) => {
                    let mut explicit = content.reader();
                    let data = explicit.read_octet_string().stage("content info")?;
                    explicit.finish().stage("content info")?;
                    data
                }
                None => Bytes::new(),
            };

            Ok(Self::Data(data))
        } else {
            let content = content.map(|tlv| tlv.value());

            Ok(if content_type == OID_ENVELOPE_DATA {
                Self::Enveloped(content)
            } else if content_type == OID_SIGNED_AND_ENVELOPED_DATA {
                Self::SignedAndEnveloped(content)
            } else if content_type == OID_DIGESTED_DATA {
                Self::Digest(content)
            } else if content_type == OID_ENCRYPTED_DATA {
                Self::Encrypted(content)
            } else {
                Self::Other(content_type, content)
            })
        }
    }

    /// A human readable name of the content type.
    pub fn content_type_name(&self) -> String {
        match self {
            Self::Data(_) => "data".into(),
            Self::Signed(_) => "signedData".into(),
            Self::Enveloped(_) => "envelopedData".into(),
            Self::SignedAndEnveloped(_) => "signedAndEnvelopedData".into(),
            Self::Digest(_) => "digestedData".into(),
            Self::Encrypted(_) => "encryptedData".into(),
            Self::Other(oid, _) => oid.to_string(),
        }
    }
}

/// A certificate carried in `SignedData.certificates`.
///
/// Only the outer element is checked when the container is parsed. The
/// certificate itself is decoded on first access and the result kept.
#[derive(Clone)]
pub struct EmbeddedCertificate {
    tlv: Tlv,
    decoded: OnceCell<Result<Certificate, MalformedDer>>,
}

impl EmbeddedCertificate {
    fn new(tlv: Tlv) -> Self {
        Self {
            tlv,
            decoded: OnceCell::new(),
        }
    }

    /// The DER encoding of the certificate.
    pub fn encoded(&self) -> &[u8] {
        self.tlv.encoded().as_ref()
    }

    /// Offset of the certificate within the receipt.
    pub fn offset(&self) -> usize {
        self.tlv.offset()
    }

    /// Decode the certificate.
    pub fn certificate(&self) -> Result<&Certificate, ReceiptError> {
        self.decoded
            .get_or_init(|| Certificate::from_tlv(&self.tlv))
            .as_ref()
            .map_err(|e| ReceiptError::MalformedCertificate(e.clone()))
    }
}

impl Debug for EmbeddedCertificate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.decoded.get() {
            Some(Ok(cert)) => Debug::fmt(cert, f),
            _ => write!(
                f,
                "EmbeddedCertificate(offset={}, len={})",
                self.tlv.offset(),
                self.tlv.encoded().len()
            ),
        }
    }
}

/// Represents a CMS SignedData structure.
///
/// It contains the signed payload, the signers and the X.509 certificates
/// the signer chose to embed.
#[derive(Clone)]
pub struct SignedData {
    version: i64,
    digest_algorithms: Vec<AlgorithmIdentifier>,
    content: Bytes,
    content_offset: usize,
    certificates: Vec<EmbeddedCertificate>,
    signers: Vec<SignerInfo>,
}

impl SignedData {
    /// Parse a DER encoded `ContentInfo` that must hold `signedData`.
    ///
    /// Any other content type yields [ReceiptError::UnsupportedContentType].
    pub fn from_der(data: impl Into<Bytes>) -> Result<Self, ReceiptError> {
        match ContentInfo::from_der(data)? {
            ContentInfo::Signed(signed_data) => Ok(*signed_data),
            other => Err(ReceiptError::UnsupportedContentType(
                other.content_type_name(),
            )),
        }
    }

    fn take_from(reader: &mut Reader) -> Result<Self, ReceiptError> {
        let mut seq = reader.read_sequence().stage("signed data")?;

        let version = seq.read_small_integer().stage("signed data")?;

        let mut digest_algorithms = vec![];
        let mut set = seq.read_set().stage("digest algorithms")?;
        while !set.is_empty() {
            digest_algorithms.push(
                set.decode_next(|cons| AlgorithmIdentifier::take_from(cons))
                    .stage("digest algorithms")?,
            );
        }

        let (content, content_offset) = Self::take_encapsulated_content(&mut seq)?;

        let mut certificates = vec![];
        if let Some(tlv) = seq.read_optional(Tag::CTX_0).stage("certificates")? {
            let mut set = tlv.reader();

            while !set.is_empty() {
                let cert = set.read_tlv().stage("certificates")?;

                // Attribute certificates and the other CertificateChoices are
                // never used to sign receipts.
                if cert.tag() == Tag::SEQUENCE {
                    certificates.push(EmbeddedCertificate::new(cert));
                } else {
                    debug!(
                        "ignoring certificate choice {} at offset {}",
                        cert.tag(),
                        cert.offset()
                    );
                }
            }
        }

        // CRLs.
        seq.read_optional(Tag::CTX_1).stage("certificates")?;

        let mut signers = vec![];
        let mut set = seq.read_set().stage("signer infos")?;
        while !set.is_empty() {
            signers.push(SignerInfo::take_from(&mut set)?);
        }

        if signers.is_empty() {
            return Err(set.error("no signer infos")).stage("signer infos");
        }

        seq.finish().stage("signed data")?;

        Ok(Self {
            version,
            digest_algorithms,
            content,
            content_offset,
            certificates,
            signers,
        })
    }

    fn take_encapsulated_content(reader: &mut Reader) -> Result<(Bytes, usize), ReceiptError> {
        let mut seq = reader.read_sequence().stage("encapsulated content")?;

        let content_type = seq.read_oid().stage("encapsulated content")?;
        if content_type != OID_ID_DATA {
            return Err(ReceiptError::UnsupportedContentType(format!(
                "encapsulated {}",
                content_type_name(&content_type)
            )));
        }

        let explicit = match seq.read_optional(Tag::CTX_0).stage("encapsulated content")? {
            Some(explicit) => explicit,
            None => {
                return Err(seq.error("detached content")).stage("encapsulated content");
            }
        };
        seq.finish().stage("encapsulated content")?;

        let mut inner = explicit.reader();
        let content = inner
            .read_element(Tag::OCTET_STRING)
            .stage("encapsulated content")?;
        inner.finish().stage("encapsulated content")?;

        Ok((content.value(), content.value_offset()))
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn digest_algorithms(&self) -> &[AlgorithmIdentifier] {
        &self.digest_algorithms
    }

    /// Obtain encapsulated content that was signed.
    ///
    /// This is the defined `encapContentInfo eContent` value.
    pub fn signed_content(&self) -> &Bytes {
        &self.content
    }

    /// Offset of the first content octet within the receipt.
    pub fn content_offset(&self) -> usize {
        self.content_offset
    }

    /// Certificates embedded in the structure, in encoded order.
    pub fn certificates(&self) -> &[EmbeddedCertificate] {
        &self.certificates
    }

    /// Obtain signing information attached to this instance.
    ///
    /// Each iterated value represents an entity that cryptographically signed
    /// the content.
    pub fn signers(&self) -> impl Iterator<Item = &SignerInfo> {
        self.signers.iter()
    }
}

impl Debug for SignedData {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedData")
            .field("version", &self.version)
            .field("digest_algorithms", &self.digest_algorithms)
            .field("content", &hex::encode(&self.content))
            .field("certificates", &self.certificates)
            .field("signers", &self.signers)
            .finish()
    }
}

/// Identifies the certificate of a signer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SignerIdentifier {
    IssuerAndSerialNumber { issuer: Name, serial_number: Integer },
    SubjectKeyIdentifier(Bytes),
}

impl SignerIdentifier {
    /// ```ASN.1
    /// SignerIdentifier ::= CHOICE {
    ///   issuerAndSerialNumber IssuerAndSerialNumber,
    ///   subjectKeyIdentifier [0] SubjectKeyIdentifier }
    /// ```
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        if let Some(ski) = cons.take_opt_primitive_if(Tag::CTX_0, |prim| prim.take_all())? {
            return Ok(Self::SubjectKeyIdentifier(ski));
        }

        cons.take_sequence(|cons| {
            let issuer = Name::take_from(cons)?;
            let serial_number = Integer::take_from(cons)?;

            Ok(Self::IssuerAndSerialNumber {
                issuer,
                serial_number,
            })
        })
    }

    /// Whether `cert` is the certificate this identifier names.
    pub fn matches(&self, cert: &Certificate) -> bool {
        match self {
            Self::IssuerAndSerialNumber {
                issuer,
                serial_number,
            } => cert.issuer_name() == issuer && cert.serial_number() == serial_number,
            Self::SubjectKeyIdentifier(ski) => {
                cert.subject_key_identifier() == Some(ski.as_ref())
            }
        }
    }
}

/// A single signed attribute.
///
/// ```ASN.1
/// Attribute ::= SEQUENCE {
///   attrType OBJECT IDENTIFIER,
///   attrValues SET OF AttributeValue }
/// ```
#[derive(Clone, Debug)]
pub struct Attribute {
    pub typ: Oid,
    /// The encoded values.
    pub values: Vec<Captured>,
    encoded: Captured,
}

impl Attribute {
    pub fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        let mut res = None;

        let encoded = cons.capture(|cons| {
            res = cons.take_opt_sequence(|cons| {
                let typ = take_oid(cons)?;

                let values = cons.take_set(|cons| {
                    let mut values = vec![];

                    loop {
                        let value = cons.capture(|cons| cons.skip_one().map(|_| ()))?;
                        if value.is_empty() {
                            break;
                        }
                        values.push(value);
                    }

                    Ok(values)
                })?;

                Ok((typ, values))
            })?;

            Ok(())
        })?;

        Ok(res.map(|(typ, values)| Self {
            typ,
            values,
            encoded,
        }))
    }

    /// The sole value of a single-valued attribute.
    fn single_value(&self) -> Option<&Captured> {
        match self.values.as_slice() {
            [value] => Some(value),
            _ => None,
        }
    }
}

/// The `signedAttrs` of a [SignerInfo].
///
/// ```ASN.1
/// SignedAttributes ::= SET SIZE (1..MAX) OF Attribute
/// ```
#[derive(Clone, Debug)]
pub struct SignedAttributes {
    encoded: Bytes,
    offset: usize,
    attributes: Vec<Attribute>,
    content_type: Option<Oid>,
    message_digest: Option<Bytes>,
    signing_time: Option<DateTime<Utc>>,
}

impl SignedAttributes {
    fn from_tlv(tlv: &Tlv) -> DerResult<Self> {
        let (attributes, content_type, message_digest, signing_time) = tlv.decode(|cons| {
            cons.take_constructed_if(Tag::CTX_0, |cons| {
                let mut attributes: Vec<Attribute> = vec![];
                let mut content_type = None;
                let mut message_digest = None;
                let mut signing_time = None;

                while let Some(attribute) = Attribute::take_opt_from(cons)? {
                    if attributes.iter().any(|a| a.typ == attribute.typ) {
                        return Err(cons.content_err("duplicate signed attribute"));
                    }

                    let single_value = || {
                        attribute
                            .single_value()
                            .cloned()
                            .ok_or_else(|| cons.content_err("attribute must have exactly one value"))
                    };

                    if attribute.typ == OID_CONTENT_TYPE {
                        content_type = Some(single_value()?.decode(|cons| take_oid(cons))?);
                    } else if attribute.typ == OID_MESSAGE_DIGEST {
                        message_digest = Some(
                            single_value()?
                                .decode(|cons| OctetString::take_from(cons))?
                                .into_bytes(),
                        );
                    } else if attribute.typ == OID_SIGNING_TIME {
                        signing_time = Some(single_value()?.decode(|cons| take_time(cons))?);
                    }

                    attributes.push(attribute);
                }

                if attributes.is_empty() {
                    return Err(cons.content_err("empty signed attributes"));
                }

                Ok((attributes, content_type, message_digest, signing_time))
            })
        })?;

        Ok(Self {
            encoded: tlv.encoded().clone(),
            offset: tlv.offset(),
            attributes,
            content_type,
            message_digest,
            signing_time,
        })
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn content_type(&self) -> Option<&Oid> {
        self.content_type.as_ref()
    }

    pub fn message_digest(&self) -> Option<&[u8]> {
        self.message_digest.as_deref()
    }

    pub fn signing_time(&self) -> Option<DateTime<Utc>> {
        self.signing_time
    }

    /// The `[0] IMPLICIT` encoding exactly as found in the receipt.
    pub fn encoded(&self) -> &[u8] {
        self.encoded.as_ref()
    }

    /// Offset of the encoding within the receipt.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The octets a signature over these attributes is computed on.
    ///
    /// Per RFC 5652 Section 5.4 this is the DER encoding of the attributes
    /// as an explicit `SET OF`. DER orders `SET OF` members by their
    /// encodings, so the members are sorted regardless of how the signer
    /// ordered them.
    pub fn digested_data(&self) -> Vec<u8> {
        let mut encodings = self
            .attributes
            .iter()
            .map(|a| &a.encoded)
            .collect::<Vec<&Captured>>();
        encodings.sort_unstable_by(|a, b| a.as_slice().cmp(b.as_slice()));

        Captured::from_values(Mode::Der, encode::set(encodings)).to_vec()
    }
}

/// Represents a CMS SignerInfo structure.
///
/// Instances of this type are logically equivalent to a single
/// signed assertion within a [SignedData] payload. There can be multiple
/// signers per [SignedData], which is why this type exists on its own.
#[derive(Clone, Debug)]
pub struct SignerInfo {
    version: i64,
    sid: SignerIdentifier,
    digest_algorithm: AlgorithmIdentifier,
    signed_attributes: Option<SignedAttributes>,
    signature_algorithm: AlgorithmIdentifier,
    signature: Bytes,
    signature_offset: usize,
}

impl SignerInfo {
    fn take_from(reader: &mut Reader) -> Result<Self, ReceiptError> {
        let mut seq = reader.read_sequence().stage("signer info")?;

        let version = seq.read_small_integer().stage("signer info")?;

        let sid = seq
            .decode_next(|cons| SignerIdentifier::take_from(cons))
            .stage("signer info")?;

        let digest_algorithm = seq
            .decode_next(|cons| AlgorithmIdentifier::take_from(cons))
            .stage("signer info")?;

        let signed_attributes = match seq.read_optional(Tag::CTX_0).stage("signer info")? {
            Some(tlv) => Some(SignedAttributes::from_tlv(&tlv).stage("signed attributes")?),
            None => None,
        };

        let signature_algorithm = seq
            .decode_next(|cons| AlgorithmIdentifier::take_from(cons))
            .stage("signer info")?;
        let signature = seq
            .read_element(Tag::OCTET_STRING)
            .stage("signer info")?;

        // Unsigned attributes carry nothing receipt validation consumes.
        seq.read_optional(Tag::CTX_1).stage("signer info")?;
        seq.finish().stage("signer info")?;

        Ok(Self {
            version,
            sid,
            digest_algorithm,
            signed_attributes,
            signature_algorithm,
            signature: signature.value(),
            signature_offset: signature.value_offset(),
        })
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    /// Identifies the signing certificate.
    pub fn sid(&self) -> &SignerIdentifier {
        &self.sid
    }

    /// Obtain the signing X.509 certificate's issuer name and its serial number.
    pub fn certificate_issuer_and_serial(&self) -> Option<(&Name, &Integer)> {
        match &self.sid {
            SignerIdentifier::IssuerAndSerialNumber {
                issuer,
                serial_number,
            } => Some((issuer, serial_number)),
            SignerIdentifier::SubjectKeyIdentifier(_) => None,
        }
    }

    /// Obtain the message digest algorithm used by this signer.
    pub fn digest_algorithm(&self) -> Result<DigestAlgorithm, ReceiptError> {
        DigestAlgorithm::try_from(&self.digest_algorithm)
    }

    /// Obtain the cryptographic signing algorithm used by this signer.
    ///
    /// The declared algorithm can be a bare key algorithm, in which case the
    /// digest algorithm completes it.
    pub fn signature_algorithm(&self) -> Result<SignatureAlgorithm, ReceiptError> {
        SignatureAlgorithm::from_oid_and_digest_algorithm(
            &self.signature_algorithm.algorithm,
            self.digest_algorithm()?,
        )
    }

    /// Obtain the raw bytes constituting the cryptographic signature.
    pub fn signature(&self) -> &[u8] {
        self.signature.as_ref()
    }

    /// Offset of the first signature octet within the receipt.
    pub fn signature_offset(&self) -> usize {
        self.signature_offset
    }

    /// Obtain the `SignedAttributes` attached to this instance.
    pub fn signed_attributes(&self) -> Option<&SignedAttributes> {
        self.signed_attributes.as_ref()
    }

    /// Locate this signer's certificate among `certificates`.
    pub fn find_certificate<'a>(
        &self,
        certificates: &'a [EmbeddedCertificate],
    ) -> Result<&'a Certificate, ReceiptError> {
        for embedded in certificates {
            let cert = embedded.certificate()?;

            if self.sid.matches(cert) {
                return Ok(cert);
            }
        }

        Err(ReceiptError::LeafNotFound)
    }

    /// Obtain the raw bytes of content that were digested and signed.
    ///
    /// With signed attributes present this is their `SET OF` encoding.
    /// Otherwise it is the content itself.
    pub fn signed_content(&self, content: &[u8]) -> Vec<u8> {
        if let Some(attributes) = &self.signed_attributes {
            attributes.digested_data()
        } else {
            content.to_vec()
        }
    }

    /// Compute a message digest of `content` using this signer's digest algorithm.
    pub fn compute_digest(&self, content: &[u8]) -> Result<Digest, ReceiptError> {
        Ok(self.digest_algorithm()?.digest(content))
    }

    /// Verifies the signature of this signer over `content` using `cert`'s key.
    ///
    /// This only performs signature verification. The message digest
    /// attribute is checked by [Self::verify_message_digest].
    pub fn verify_signature_with_certificate(
        &self,
        cert: &Certificate,
        content: &[u8],
    ) -> Result<(), ReceiptError> {
        let signature_algorithm = self.signature_algorithm()?;
        let signed_content = self.signed_content(content);

        if cert.verify_signed_data(signature_algorithm, &signed_content, &self.signature)? {
            Ok(())
        } else {
            Err(ReceiptError::BadSignature(format!(
                "{} signature does not verify under {}",
                signature_algorithm,
                cert.subject_display()
            )))
        }
    }

    /// Verifies the content-type and message-digest signed attributes.
    ///
    /// A signer without signed attributes signs the content directly, so
    /// there is nothing to check.
    pub fn verify_message_digest(&self, content: &[u8]) -> Result<(), ReceiptError> {
        let attributes = match &self.signed_attributes {
            Some(attributes) => attributes,
            None => return Ok(()),
        };

        match attributes.content_type() {
            Some(oid) if oid == &OID_ID_DATA => {}
            Some(oid) => {
                return Err(ReceiptError::UnsupportedContentType(format!(
                    "signed content-type attribute {}",
                    content_type_name(oid)
                )));
            }
            None => {
                return Err(ReceiptError::BadSignature(
                    "content-type signed attribute missing".into(),
                ));
            }
        }

        let wanted = attributes.message_digest().ok_or_else(|| {
            ReceiptError::BadSignature("message-digest signed attribute missing".into())
        })?;

        let got = self.compute_digest(content)?;

        constant_time::verify_slices_are_equal(wanted, got.as_ref())
            .map_err(|_| ReceiptError::DigestMismatch)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{testutil::*, ErrorKind},
    };

    fn sandbox() -> SignedData {
        SignedData::from_der(Bytes::from_static(RECEIPT_SANDBOX_DER)).unwrap()
    }

    #[test]
    fn parse_sandbox() {
        let signed_data = sandbox();

        assert_eq!(signed_data.version(), 1);
        assert_eq!(signed_data.digest_algorithms().len(), 1);
        assert_eq!(signed_data.signed_content().as_ref(), RECEIPT_CONTENT_DER);
        assert_eq!(
            &RECEIPT_SANDBOX_DER[signed_data.content_offset()..][..RECEIPT_CONTENT_DER.len()],
            RECEIPT_CONTENT_DER
        );
        assert_eq!(signed_data.certificates().len(), 3);

        let signers = signed_data.signers().collect::<Vec<_>>();
        assert_eq!(signers.len(), 1);
        let signer = signers[0];

        assert_eq!(signer.version(), 1);
        assert_eq!(signer.digest_algorithm().unwrap(), DigestAlgorithm::Sha256);
        assert_eq!(
            signer.signature_algorithm().unwrap(),
            SignatureAlgorithm::Sha256Rsa
        );
        assert_eq!(signer.signature().len(), 256);

        let (issuer, serial) = signer.certificate_issuer_and_serial().unwrap();
        assert_eq!(issuer.common_name().as_deref(), Some("Receipt Test WWDR CA"));
        assert_eq!(i64::try_from(serial).ok(), Some(3));

        let attributes = signer.signed_attributes().unwrap();
        assert_eq!(attributes.attributes().len(), 3);
        assert!(attributes.signing_time().is_some());
        assert_eq!(attributes.message_digest().unwrap().len(), 32);
        assert_eq!(attributes.encoded()[0], 0xa0);

        // Already DER ordered, so only the tag differs.
        let digested = attributes.digested_data();
        assert_eq!(digested[0], 0x31);
        assert_eq!(&digested[1..], &attributes.encoded()[1..]);
    }

    #[test]
    fn verify_sandbox_signer() {
        let signed_data = sandbox();
        let signer = signed_data.signers().next().unwrap();

        let leaf = signer
            .find_certificate(signed_data.certificates())
            .unwrap();
        assert_eq!(
            leaf.subject_common_name().as_deref(),
            Some("Receipt Test Store Signer")
        );

        signer
            .verify_signature_with_certificate(leaf, signed_data.signed_content())
            .unwrap();
        signer
            .verify_message_digest(signed_data.signed_content())
            .unwrap();

        let mut content = signed_data.signed_content().to_vec();
        content[10] ^= 0x01;
        assert!(matches!(
            signer.verify_message_digest(&content),
            Err(ReceiptError::DigestMismatch)
        ));
    }

    #[test]
    fn wrong_certificate_is_bad_signature() {
        let signed_data = sandbox();
        let signer = signed_data.signers().next().unwrap();
        let root = signed_data
            .certificates()
            .iter()
            .map(|c| c.certificate().unwrap())
            .find(|c| c.subject_is_issuer())
            .unwrap();

        let err = signer
            .verify_signature_with_certificate(root, signed_data.signed_content())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadSignature);
    }

    #[test]
    fn signer_without_signed_attributes() {
        let signed_data = SignedData::from_der(Bytes::from_static(RECEIPT_EXPIRING_DER)).unwrap();
        let signer = signed_data.signers().next().unwrap();

        assert!(signer.signed_attributes().is_none());
        assert_eq!(
            signer.signature_algorithm().unwrap(),
            SignatureAlgorithm::Sha1Rsa
        );
        assert_eq!(
            signer.signed_content(signed_data.signed_content()),
            signed_data.signed_content().to_vec()
        );

        let leaf = signer
            .find_certificate(signed_data.certificates())
            .unwrap();
        signer
            .verify_signature_with_certificate(leaf, signed_data.signed_content())
            .unwrap();
        signer
            .verify_message_digest(signed_data.signed_content())
            .unwrap();
    }

    #[test]
    fn multiple_signers_in_order() {
        let signed_data =
            SignedData::from_der(Bytes::from_static(RECEIPT_TWO_SIGNERS_DER)).unwrap();
        let signers = signed_data.signers().collect::<Vec<_>>();
        assert_eq!(signers.len(), 2);

        assert_eq!(
            signers[0].signature_algorithm().unwrap(),
            SignatureAlgorithm::EcdsaSha256
        );
        let rogue = signers[0]
            .find_certificate(signed_data.certificates())
            .unwrap();
        assert_eq!(rogue.subject_common_name().as_deref(), Some("Rogue Signer"));
        signers[0]
            .verify_signature_with_certificate(rogue, signed_data.signed_content())
            .unwrap();
    }

    #[test]
    fn leaf_not_found() {
        let signed_data = sandbox();
        let signer = signed_data.signers().next().unwrap();

        let without_leaf = signed_data
            .certificates()
            .iter()
            .filter(|c| !signer.sid().matches(c.certificate().unwrap()))
            .cloned()
            .collect::<Vec<_>>();
        assert_eq!(without_leaf.len(), 2);

        assert!(matches!(
            signer.find_certificate(&without_leaf),
            Err(ReceiptError::LeafNotFound)
        ));
    }

    #[test]
    fn enveloped_data_is_unsupported() {
        let info = ContentInfo::from_der(Bytes::from_static(ENVELOPED_DER)).unwrap();
        assert!(matches!(info, ContentInfo::Enveloped(Some(_))));

        let err = SignedData::from_der(Bytes::from_static(ENVELOPED_DER)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedContentType);
        assert_eq!(err.to_string(), "unsupported content type: envelopedData");
    }

    #[test]
    fn data_content_info() {
        let data = seq(&[oid(&[42, 134, 72, 134, 247, 13, 1, 7, 1]), explicit(0, &octets(b"hi"))]);

        match ContentInfo::from_der(data.clone()).unwrap() {
            ContentInfo::Data(content) => assert_eq!(content.as_ref(), b"hi"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            SignedData::from_der(data).unwrap_err().kind(),
            ErrorKind::UnsupportedContentType
        );
    }

    #[test]
    fn truncation_is_malformed() {
        let data = &RECEIPT_SANDBOX_DER[..RECEIPT_SANDBOX_DER.len() - 8];
        let err = SignedData::from_der(Bytes::copy_from_slice(data)).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MalformedInput);
        assert!(matches!(
            err,
            ReceiptError::MalformedPkcs7 {
                stage: "content info",
                ..
            }
        ));
    }

    #[test]
    fn trailing_data_is_malformed() {
        let mut data = RECEIPT_SANDBOX_DER.to_vec();
        data.extend_from_slice(&[0x05, 0x00]);

        assert_eq!(
            SignedData::from_der(data).unwrap_err().kind(),
            ErrorKind::MalformedInput
        );
    }

    #[test]
    fn signed_attributes_are_sorted() {
        let content_type = seq(&[
            oid(&[42, 134, 72, 134, 247, 13, 1, 9, 3]),
            set(&[oid(&[42, 134, 72, 134, 247, 13, 1, 7, 1])]),
        ]);
        let message_digest = seq(&[
            oid(&[42, 134, 72, 134, 247, 13, 1, 9, 4]),
            set(&[octets(&[0xaa; 32])]),
        ]);

        // Deliberately in non-DER order.
        let encoded = tlv(Tag::CTX_0, true, &[message_digest.clone(), content_type.clone()].concat());

        let tlv = Tlv::from_der(encoded).unwrap();
        let attributes = SignedAttributes::from_tlv(&tlv).unwrap();
        assert_eq!(attributes.message_digest(), Some(&[0xaa; 32][..]));
        assert!(attributes.content_type().is_some());

        assert_eq!(attributes.digested_data(), set(&[content_type, message_digest]));
    }

    #[test]
    fn duplicate_signed_attribute_rejected() {
        let content_type = seq(&[
            oid(&[42, 134, 72, 134, 247, 13, 1, 9, 3]),
            set(&[oid(&[42, 134, 72, 134, 247, 13, 1, 7, 1])]),
        ]);

        let encoded = tlv(Tag::CTX_0, true, &[content_type.clone(), content_type].concat());

        let tlv = Tlv::from_der(encoded).unwrap();
        assert!(SignedAttributes::from_tlv(&tlv)
            .unwrap_err()
            .reason
            .contains("duplicate signed attribute"));
    }

    #[test]
    fn multi_valued_digest_attribute_rejected() {
        let message_digest = seq(&[
            oid(&[42, 134, 72, 134, 247, 13, 1, 9, 4]),
            set(&[octets(&[0xaa; 32]), octets(&[0xbb; 32])]),
        ]);

        let tlv = Tlv::from_der(tlv(Tag::CTX_0, true, &message_digest)).unwrap();
        assert!(SignedAttributes::from_tlv(&tlv)
            .unwrap_err()
            .reason
            .contains("exactly one value"));
    }

    #[test]
    fn signer_identified_by_subject_key_identifier() {
        let signed_data = sandbox();
        let leaf = signed_data
            .signers()
            .next()
            .unwrap()
            .find_certificate(signed_data.certificates())
            .unwrap();
        let ski = leaf.subject_key_identifier().unwrap();

        // A version 3 SignerInfo naming its certificate by key identifier.
        let signer_info = seq(&[
            integer(3),
            tlv(Tag::CTX_0, false, ski),
            seq(&[oid(&[96, 134, 72, 1, 101, 3, 4, 2, 1])]),
            seq(&[oid(&[42, 134, 72, 134, 247, 13, 1, 1, 1]), tlv(Tag::NULL, false, &[])]),
            octets(&[0x42; 16]),
        ]);
        let mut reader = Reader::new(signer_info);
        let signer = SignerInfo::take_from(&mut reader).unwrap();
        reader.finish().unwrap();

        assert_eq!(signer.version(), 3);
        assert_eq!(
            signer.sid(),
            &SignerIdentifier::SubjectKeyIdentifier(Bytes::copy_from_slice(ski))
        );
        assert!(signer.certificate_issuer_and_serial().is_none());
        assert_eq!(
            signer.signature_algorithm().unwrap(),
            SignatureAlgorithm::Sha256Rsa
        );

        let found = signer
            .find_certificate(signed_data.certificates())
            .unwrap();
        assert_eq!(
            found.subject_common_name().as_deref(),
            Some("Receipt Test Store Signer")
        );

        let root = Certificate::from_der(Bytes::from_static(TEST_ROOT_DER)).unwrap();
        assert!(!signer.sid().matches(&root));
    }
}
