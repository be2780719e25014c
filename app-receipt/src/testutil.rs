// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fixtures and DER builders shared by unit tests.
//!
//! The files under `testdata/` are produced by
//! `scripts/generate-testdata.py`.

use {
    crate::{anchor::TrustAnchor, certificate::Certificate, device::DeviceIdentifier},
    bcder::Tag,
    bytes::Bytes,
    chrono::{DateTime, Utc},
};

pub const TEST_ROOT_DER: &[u8] = include_bytes!("testdata/test-root.der");
pub const TEST_ROOT_PEM: &str = include_str!("testdata/test-root.pem");
pub const UNRELATED_ROOT_DER: &[u8] = include_bytes!("testdata/unrelated-root.der");

/// Payload of every signed receipt fixture except the expiring one.
pub const RECEIPT_CONTENT_DER: &[u8] = include_bytes!("testdata/receipt-content.der");

/// RSA SHA-256 signer with signed attributes. Embeds leaf, intermediate and root.
pub const RECEIPT_SANDBOX_DER: &[u8] = include_bytes!("testdata/receipt-sandbox.der");
/// Embeds only the leaf.
pub const RECEIPT_NO_INTERMEDIATE_DER: &[u8] =
    include_bytes!("testdata/receipt-no-intermediate.der");
/// A self-signed rogue signer followed by a legitimate one.
pub const RECEIPT_TWO_SIGNERS_DER: &[u8] = include_bytes!("testdata/receipt-two-signers.der");
/// Intermediate lacks the CA flag.
pub const RECEIPT_WEAK_CA_DER: &[u8] = include_bytes!("testdata/receipt-weak-ca.der");
/// ECDSA P-256 leaf and intermediate.
pub const RECEIPT_ECDSA_DER: &[u8] = include_bytes!("testdata/receipt-ecdsa.der");
/// SHA-1 signer without signed attributes. Expires 2020-01-01T00:00:00Z.
pub const RECEIPT_EXPIRING_DER: &[u8] = include_bytes!("testdata/receipt-expiring.der");
pub const ENVELOPED_DER: &[u8] = include_bytes!("testdata/enveloped.der");

/// The device the receipt fixtures were issued to.
pub fn device() -> DeviceIdentifier {
    DeviceIdentifier::parse_uuid("e0b0a1c2-d3e4-4f56-8789-0a1b2c3d4e5f").unwrap()
}

pub fn test_anchor() -> TrustAnchor {
    TrustAnchor::from_der(Bytes::from_static(TEST_ROOT_DER)).unwrap()
}

pub fn unrelated_anchor() -> TrustAnchor {
    TrustAnchor::from_der(Bytes::from_static(UNRELATED_ROOT_DER)).unwrap()
}

pub fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

/// A time at which every fixture certificate is valid.
pub fn verification_time() -> DateTime<Utc> {
    at("2024-01-15T00:00:00Z")
}

pub fn tlv(tag: Tag, constructed: bool, content: &[u8]) -> Vec<u8> {
    let mut out = vec![];
    bcder::encode::write_header(&mut out, tag, constructed, content.len()).unwrap();
    out.extend_from_slice(content);
    out
}

pub fn seq(elements: &[Vec<u8>]) -> Vec<u8> {
    tlv(Tag::SEQUENCE, true, &elements.concat())
}

pub fn set(elements: &[Vec<u8>]) -> Vec<u8> {
    tlv(Tag::SET, true, &elements.concat())
}

/// An OBJECT IDENTIFIER from its encoded content octets.
pub fn oid(content: &[u8]) -> Vec<u8> {
    tlv(Tag::OID, false, content)
}

pub fn octets(content: &[u8]) -> Vec<u8> {
    tlv(Tag::OCTET_STRING, false, content)
}

pub fn explicit(number: u32, inner: &[u8]) -> Vec<u8> {
    tlv(Tag::ctx(number), true, inner)
}

pub fn boolean(value: bool) -> Vec<u8> {
    tlv(Tag::BOOLEAN, false, &[if value { 0xff } else { 0x00 }])
}

pub fn bit_string(unused: u8, content: &[u8]) -> Vec<u8> {
    tlv(Tag::BIT_STRING, false, &[&[unused], content].concat())
}

pub fn integer(value: i64) -> Vec<u8> {
    let octets = value.to_be_bytes();

    let mut start = 0;
    while start < octets.len() - 1 {
        let redundant = match octets[start] {
            0x00 => octets[start + 1] & 0x80 == 0,
            0xff => octets[start + 1] & 0x80 != 0,
            _ => false,
        };
        if !redundant {
            break;
        }
        start += 1;
    }

    tlv(Tag::INTEGER, false, &octets[start..])
}

pub fn utf8(s: &str) -> Vec<u8> {
    tlv(Tag::UTF8_STRING, false, s.as_bytes())
}

pub fn ia5(s: &str) -> Vec<u8> {
    tlv(Tag::IA5_STRING, false, s.as_bytes())
}

/// A version 1 `ReceiptAttribute`.
pub fn receipt_attribute(attribute_type: i64, value: &[u8]) -> Vec<u8> {
    seq(&[integer(attribute_type), integer(1), octets(value)])
}

/// A distinguished name holding a single common name.
pub fn name(common_name: &str) -> Vec<u8> {
    seq(&[set(&[seq(&[oid(&[85, 4, 3]), utf8(common_name)])])])
}

fn extension(id: &[u8], critical: bool, value: &[u8]) -> Vec<u8> {
    let mut fields = vec![oid(id)];
    if critical {
        fields.push(boolean(true));
    }
    fields.push(octets(value));

    seq(&fields)
}

pub fn basic_constraints_extension(ca: bool, path_len_constraint: Option<i64>) -> Vec<u8> {
    let mut fields = vec![];
    if ca {
        fields.push(boolean(true));
    }
    fields.extend(path_len_constraint.map(integer));

    extension(&[85, 29, 19], true, &seq(&fields))
}

/// A key usage extension with the given first octet, `digitalSignature`
/// being the most significant bit.
pub fn key_usage_extension(bits: u8) -> Vec<u8> {
    extension(&[85, 29, 15], true, &bit_string(0, &[bits]))
}

pub fn subject_key_identifier_extension(id: &[u8]) -> Vec<u8> {
    extension(&[85, 29, 14], false, &octets(id))
}

pub fn authority_key_identifier_extension(id: &[u8]) -> Vec<u8> {
    extension(
        &[85, 29, 35],
        false,
        &seq(&[tlv(Tag::CTX_0, false, id)]),
    )
}

/// Describes a version 3 certificate to encode.
///
/// The signature is not valid for any key, so certificates built this way
/// only exercise name matching and constraint checks. The public key
/// defaults to the test root's.
pub struct CertificateTemplate {
    pub serial_number: i64,
    pub issuer: Vec<u8>,
    pub subject: Vec<u8>,
    pub public_key_info: Vec<u8>,
    /// Signature algorithm OID content octets.
    pub signature_algorithm: Vec<u8>,
    pub extensions: Vec<Vec<u8>>,
}

impl CertificateTemplate {
    pub fn new(issuer: &str, subject: &str) -> Self {
        let root = Certificate::from_der(Bytes::from_static(TEST_ROOT_DER)).unwrap();

        Self {
            serial_number: 2,
            issuer: name(issuer),
            subject: name(subject),
            public_key_info: root.public_key_info().encoded().to_vec(),
            // sha256WithRSAEncryption
            signature_algorithm: vec![42, 134, 72, 134, 247, 13, 1, 1, 11],
            extensions: vec![],
        }
    }

    pub fn to_der(&self) -> Vec<u8> {
        let algorithm = seq(&[
            oid(&self.signature_algorithm),
            tlv(Tag::NULL, false, &[]),
        ]);

        let mut tbs = vec![
            explicit(0, &integer(2)),
            integer(self.serial_number),
            algorithm.clone(),
            self.issuer.clone(),
            seq(&[
                tlv(Tag::UTC_TIME, false, b"150101000000Z"),
                tlv(Tag::UTC_TIME, false, b"400101000000Z"),
            ]),
            self.subject.clone(),
            self.public_key_info.clone(),
        ];
        if !self.extensions.is_empty() {
            tbs.push(explicit(3, &seq(&self.extensions)));
        }

        seq(&[seq(&tbs), algorithm, bit_string(0, &[0x5a; 32])])
    }

    pub fn build(&self) -> Certificate {
        Certificate::from_der(self.to_der()).unwrap()
    }
}
