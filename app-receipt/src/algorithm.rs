// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cryptographic algorithms encountered in receipt signatures and certificates.

use {
    crate::{der::take_oid, error::ReceiptError},
    bcder::{
        decode::{Constructed, DecodeError, Source},
        ConstOid, Mode, Oid,
    },
    bytes::Bytes,
    ring::{digest, signature},
    std::{
        convert::TryFrom,
        fmt::{Display, Formatter},
    },
};

/// SHA-1 digest algorithm.
///
/// 1.3.14.3.2.26
const OID_SHA1: ConstOid = Oid(&[43, 14, 3, 2, 26]);

/// SHA-256 digest algorithm.
///
/// 2.16.840.1.101.3.4.2.1
const OID_SHA256: ConstOid = Oid(&[96, 134, 72, 1, 101, 3, 4, 2, 1]);

/// SHA-384 digest algorithm.
///
/// 2.16.840.1.101.3.4.2.2
const OID_SHA384: ConstOid = Oid(&[96, 134, 72, 1, 101, 3, 4, 2, 2]);

/// SHA-512 digest algorithm.
///
/// 2.16.840.1.101.3.4.2.3
const OID_SHA512: ConstOid = Oid(&[96, 134, 72, 1, 101, 3, 4, 2, 3]);

/// RSA+SHA-1 encryption.
///
/// 1.2.840.113549.1.1.5
const OID_SHA1_RSA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 5]);

/// RSA+SHA-256 encryption.
///
/// 1.2.840.113549.1.1.11
const OID_SHA256_RSA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 11]);

/// RSA+SHA-384 encryption.
///
/// 1.2.840.113549.1.1.12
const OID_SHA384_RSA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 12]);

/// RSA+SHA-512 encryption.
///
/// 1.2.840.113549.1.1.13
const OID_SHA512_RSA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 13]);

/// RSA encryption.
///
/// CMS signers commonly declare this as the signature algorithm and leave the
/// digest to the `digestAlgorithm` field.
///
/// 1.2.840.113549.1.1.1
const OID_RSA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 1]);

/// ECDSA with SHA-256.
///
/// 1.2.840.10045.4.3.2
const OID_ECDSA_SHA256: ConstOid = Oid(&[42, 134, 72, 206, 61, 4, 3, 2]);

/// ECDSA with SHA-384.
///
/// 1.2.840.10045.4.3.3
const OID_ECDSA_SHA384: ConstOid = Oid(&[42, 134, 72, 206, 61, 4, 3, 3]);

/// Elliptic curve public key cryptography.
///
/// 1.2.840.10045.2.1
const OID_EC_PUBLIC_KEY: ConstOid = Oid(&[42, 134, 72, 206, 61, 2, 1]);

/// NIST P-256 curve.
///
/// 1.2.840.10045.3.1.7
const OID_EC_SECP256R1: ConstOid = Oid(&[42, 134, 72, 206, 61, 3, 1, 7]);

/// NIST P-384 curve.
///
/// 1.3.132.0.34
const OID_EC_SECP384R1: ConstOid = Oid(&[43, 129, 4, 0, 34]);

/// An ASN.1 `AlgorithmIdentifier`.
///
/// Parameters are retained as their raw encoding.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AlgorithmIdentifier {
    pub algorithm: Oid,
    pub parameters: Option<Bytes>,
}

impl AlgorithmIdentifier {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| Self::take_sequence(cons))
    }

    fn take_sequence<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        let algorithm = take_oid(cons)?;
        let parameters = cons.capture_all()?;

        let parameters = if parameters.is_empty() {
            None
        } else {
            Some(parameters.into_bytes())
        };

        Ok(Self {
            algorithm,
            parameters,
        })
    }

    /// Interpret the parameters as a named curve OID.
    fn named_curve(&self) -> Option<Oid> {
        let params = self.parameters.clone()?;

        Mode::Der.decode(params, |cons| take_oid(cons)).ok()
    }
}

/// A hashing algorithm used for digesting data.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DigestAlgorithm {
    /// SHA-1.
    ///
    /// Corresponds to OID 1.3.14.3.2.26. Still used by App Store receipts
    /// and by the receipt device hash.
    Sha1,
    /// SHA-256.
    ///
    /// Corresponds to OID 2.16.840.1.101.3.4.2.1.
    Sha256,
    /// SHA-384.
    ///
    /// Corresponds to OID 2.16.840.1.101.3.4.2.2.
    Sha384,
    /// SHA-512.
    ///
    /// Corresponds to OID 2.16.840.1.101.3.4.2.3.
    Sha512,
}

impl Display for DigestAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        })
    }
}

impl TryFrom<&Oid> for DigestAlgorithm {
    type Error = ReceiptError;

    fn try_from(v: &Oid) -> Result<Self, Self::Error> {
        if v == &OID_SHA1 {
            Ok(Self::Sha1)
        } else if v == &OID_SHA256 {
            Ok(Self::Sha256)
        } else if v == &OID_SHA384 {
            Ok(Self::Sha384)
        } else if v == &OID_SHA512 {
            Ok(Self::Sha512)
        } else {
            Err(ReceiptError::UnsupportedAlgorithm(format!(
                "digest algorithm {}",
                v
            )))
        }
    }
}

impl TryFrom<&AlgorithmIdentifier> for DigestAlgorithm {
    type Error = ReceiptError;

    fn try_from(v: &AlgorithmIdentifier) -> Result<Self, Self::Error> {
        Self::try_from(&v.algorithm)
    }
}

impl From<DigestAlgorithm> for digest::Context {
    fn from(alg: DigestAlgorithm) -> Self {
        digest::Context::new(match alg {
            DigestAlgorithm::Sha1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
            DigestAlgorithm::Sha256 => &digest::SHA256,
            DigestAlgorithm::Sha384 => &digest::SHA384,
            DigestAlgorithm::Sha512 => &digest::SHA512,
        })
    }
}

impl DigestAlgorithm {
    /// Obtain an object that can be used to digest content using this algorithm.
    pub fn digester(&self) -> digest::Context {
        digest::Context::from(*self)
    }

    /// Digest a single buffer.
    pub fn digest(&self, data: &[u8]) -> digest::Digest {
        let mut context = self.digester();
        context.update(data);
        context.finish()
    }
}

/// An elliptic curve a public key is defined on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EcdsaCurve {
    Secp256r1,
    Secp384r1,
}

/// Cryptographic algorithm of a public key.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyAlgorithm {
    /// RSA
    ///
    /// Corresponds to OID 1.2.840.113549.1.1.1.
    Rsa,

    /// Corresponds to OID 1.2.840.10045.2.1, with the curve taken from the
    /// algorithm parameters.
    Ecdsa(EcdsaCurve),
}

impl Display for KeyAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rsa => f.write_str("RSA"),
            Self::Ecdsa(EcdsaCurve::Secp256r1) => f.write_str("ECDSA (P-256)"),
            Self::Ecdsa(EcdsaCurve::Secp384r1) => f.write_str("ECDSA (P-384)"),
        }
    }
}

impl TryFrom<&AlgorithmIdentifier> for KeyAlgorithm {
    type Error = ReceiptError;

    fn try_from(v: &AlgorithmIdentifier) -> Result<Self, Self::Error> {
        if v.algorithm == OID_RSA {
            Ok(Self::Rsa)
        } else if v.algorithm == OID_EC_PUBLIC_KEY {
            let curve = v.named_curve().ok_or_else(|| {
                ReceiptError::UnsupportedAlgorithm("EC key without named curve".into())
            })?;

            if curve == OID_EC_SECP256R1 {
                Ok(Self::Ecdsa(EcdsaCurve::Secp256r1))
            } else if curve == OID_EC_SECP384R1 {
                Ok(Self::Ecdsa(EcdsaCurve::Secp384r1))
            } else {
                Err(ReceiptError::UnsupportedAlgorithm(format!(
                    "elliptic curve {}",
                    curve
                )))
            }
        } else {
            Err(ReceiptError::UnsupportedAlgorithm(format!(
                "key algorithm {}",
                v.algorithm
            )))
        }
    }
}

/// An algorithm used to digitally sign content.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SignatureAlgorithm {
    /// SHA-1 with RSA encryption.
    ///
    /// Corresponds to OID 1.2.840.113549.1.1.5.
    Sha1Rsa,

    /// SHA-256 with RSA encryption.
    ///
    /// Corresponds to OID 1.2.840.113549.1.1.11.
    Sha256Rsa,

    /// SHA-384 with RSA encryption.
    ///
    /// Corresponds to OID 1.2.840.113549.1.1.12.
    Sha384Rsa,

    /// SHA-512 with RSA encryption.
    ///
    /// Corresponds to OID 1.2.840.113549.1.1.13.
    Sha512Rsa,

    /// ECDSA with SHA-256.
    ///
    /// Corresponds to OID 1.2.840.10045.4.3.2.
    EcdsaSha256,

    /// ECDSA with SHA-384.
    ///
    /// Corresponds to OID 1.2.840.10045.4.3.3.
    EcdsaSha384,
}

impl Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Sha1Rsa => "sha1WithRSAEncryption",
            Self::Sha256Rsa => "sha256WithRSAEncryption",
            Self::Sha384Rsa => "sha384WithRSAEncryption",
            Self::Sha512Rsa => "sha512WithRSAEncryption",
            Self::EcdsaSha256 => "ecdsa-with-SHA256",
            Self::EcdsaSha384 => "ecdsa-with-SHA384",
        })
    }
}

impl TryFrom<&Oid> for SignatureAlgorithm {
    type Error = ReceiptError;

    fn try_from(v: &Oid) -> Result<Self, Self::Error> {
        if v == &OID_SHA1_RSA {
            Ok(Self::Sha1Rsa)
        } else if v == &OID_SHA256_RSA {
            Ok(Self::Sha256Rsa)
        } else if v == &OID_SHA384_RSA {
            Ok(Self::Sha384Rsa)
        } else if v == &OID_SHA512_RSA {
            Ok(Self::Sha512Rsa)
        } else if v == &OID_ECDSA_SHA256 {
            Ok(Self::EcdsaSha256)
        } else if v == &OID_ECDSA_SHA384 {
            Ok(Self::EcdsaSha384)
        } else {
            Err(ReceiptError::UnsupportedAlgorithm(format!(
                "signature algorithm {}",
                v
            )))
        }
    }
}

impl TryFrom<&AlgorithmIdentifier> for SignatureAlgorithm {
    type Error = ReceiptError;

    fn try_from(v: &AlgorithmIdentifier) -> Result<Self, Self::Error> {
        Self::try_from(&v.algorithm)
    }
}

impl SignatureAlgorithm {
    /// Resolve a signature algorithm from a signer's declared algorithm and digest.
    ///
    /// A bare `rsaEncryption` declaration is combined with the digest
    /// algorithm. Any other OID must name a full signature algorithm.
    pub fn from_oid_and_digest_algorithm(
        oid: &Oid,
        digest_algorithm: DigestAlgorithm,
    ) -> Result<Self, ReceiptError> {
        if oid == &OID_RSA {
            Ok(match digest_algorithm {
                DigestAlgorithm::Sha1 => Self::Sha1Rsa,
                DigestAlgorithm::Sha256 => Self::Sha256Rsa,
                DigestAlgorithm::Sha384 => Self::Sha384Rsa,
                DigestAlgorithm::Sha512 => Self::Sha512Rsa,
            })
        } else {
            Self::try_from(oid)
        }
    }

    /// The digest algorithm this signature algorithm hashes with.
    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        match self {
            Self::Sha1Rsa => DigestAlgorithm::Sha1,
            Self::Sha256Rsa | Self::EcdsaSha256 => DigestAlgorithm::Sha256,
            Self::Sha384Rsa | Self::EcdsaSha384 => DigestAlgorithm::Sha384,
            Self::Sha512Rsa => DigestAlgorithm::Sha512,
        }
    }

    /// Obtain the `ring` verification algorithm for a key of the given type.
    ///
    /// Fails if the signature algorithm can't be used with the key.
    pub fn resolve_verification_algorithm(
        &self,
        key_algorithm: KeyAlgorithm,
    ) -> Result<&'static dyn signature::VerificationAlgorithm, ReceiptError> {
        match (self, key_algorithm) {
            (Self::Sha1Rsa, KeyAlgorithm::Rsa) => {
                Ok(&signature::RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY)
            }
            (Self::Sha256Rsa, KeyAlgorithm::Rsa) => Ok(&signature::RSA_PKCS1_2048_8192_SHA256),
            (Self::Sha384Rsa, KeyAlgorithm::Rsa) => Ok(&signature::RSA_PKCS1_2048_8192_SHA384),
            (Self::Sha512Rsa, KeyAlgorithm::Rsa) => Ok(&signature::RSA_PKCS1_2048_8192_SHA512),
            (Self::EcdsaSha256, KeyAlgorithm::Ecdsa(EcdsaCurve::Secp256r1)) => {
                Ok(&signature::ECDSA_P256_SHA256_ASN1)
            }
            (Self::EcdsaSha384, KeyAlgorithm::Ecdsa(EcdsaCurve::Secp256r1)) => {
                Ok(&signature::ECDSA_P256_SHA384_ASN1)
            }
            (Self::EcdsaSha256, KeyAlgorithm::Ecdsa(EcdsaCurve::Secp384r1)) => {
                Ok(&signature::ECDSA_P384_SHA256_ASN1)
            }
            (Self::EcdsaSha384, KeyAlgorithm::Ecdsa(EcdsaCurve::Secp384r1)) => {
                Ok(&signature::ECDSA_P384_SHA384_ASN1)
            }
            (alg, key) => Err(ReceiptError::UnsupportedAlgorithm(format!(
                "{} with {} key",
                alg, key
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(data: &'static [u8]) -> Oid {
        Oid(Bytes::from_static(data))
    }

    #[test]
    fn digest_algorithms() {
        assert_eq!(
            DigestAlgorithm::try_from(&oid(&[43, 14, 3, 2, 26])).unwrap(),
            DigestAlgorithm::Sha1
        );
        assert_eq!(
            DigestAlgorithm::try_from(&oid(&[96, 134, 72, 1, 101, 3, 4, 2, 1])).unwrap(),
            DigestAlgorithm::Sha256
        );
        assert!(DigestAlgorithm::try_from(&oid(&[42, 3, 4])).is_err());

        assert_eq!(
            hex::encode(DigestAlgorithm::Sha1.digest(b"abc")),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn rsa_encryption_resolves_with_digest() {
        let rsa = oid(&[42, 134, 72, 134, 247, 13, 1, 1, 1]);

        assert_eq!(
            SignatureAlgorithm::from_oid_and_digest_algorithm(&rsa, DigestAlgorithm::Sha1)
                .unwrap(),
            SignatureAlgorithm::Sha1Rsa
        );
        assert_eq!(
            SignatureAlgorithm::from_oid_and_digest_algorithm(&rsa, DigestAlgorithm::Sha256)
                .unwrap(),
            SignatureAlgorithm::Sha256Rsa
        );
        assert_eq!(
            SignatureAlgorithm::from_oid_and_digest_algorithm(
                &oid(&[42, 134, 72, 206, 61, 4, 3, 2]),
                DigestAlgorithm::Sha1
            )
            .unwrap(),
            SignatureAlgorithm::EcdsaSha256
        );
    }

    #[test]
    fn key_algorithms() {
        let rsa = AlgorithmIdentifier {
            algorithm: oid(&[42, 134, 72, 134, 247, 13, 1, 1, 1]),
            parameters: Some(Bytes::from_static(&[0x05, 0x00])),
        };
        assert_eq!(KeyAlgorithm::try_from(&rsa).unwrap(), KeyAlgorithm::Rsa);

        let p384 = AlgorithmIdentifier {
            algorithm: oid(&[42, 134, 72, 206, 61, 2, 1]),
            parameters: Some(Bytes::from_static(&[0x06, 0x05, 43, 129, 4, 0, 34])),
        };
        assert_eq!(
            KeyAlgorithm::try_from(&p384).unwrap(),
            KeyAlgorithm::Ecdsa(EcdsaCurve::Secp384r1)
        );

        let implicit_curve = AlgorithmIdentifier {
            algorithm: oid(&[42, 134, 72, 206, 61, 2, 1]),
            parameters: Some(Bytes::from_static(&[0x05, 0x00])),
        };
        assert!(KeyAlgorithm::try_from(&implicit_curve).is_err());
    }

    #[test]
    fn mismatched_key_is_rejected() {
        assert!(SignatureAlgorithm::Sha256Rsa
            .resolve_verification_algorithm(KeyAlgorithm::Ecdsa(EcdsaCurve::Secp256r1))
            .is_err());
        assert!(SignatureAlgorithm::EcdsaSha256
            .resolve_verification_algorithm(KeyAlgorithm::Rsa)
            .is_err());
        assert!(SignatureAlgorithm::Sha1Rsa
            .resolve_verification_algorithm(KeyAlgorithm::Rsa)
            .is_ok());
    }

    #[test]
    fn algorithm_identifier_parameters() {
        let alg = Mode::Der
            .decode(
                Bytes::from_static(&[
                    0x30, 0x0d, 0x06, 0x09, 42, 134, 72, 134, 247, 13, 1, 1, 11, 0x05, 0x00,
                ]),
                |cons| AlgorithmIdentifier::take_from(cons),
            )
            .unwrap();
        assert_eq!(
            SignatureAlgorithm::try_from(&alg).unwrap(),
            SignatureAlgorithm::Sha256Rsa
        );
        assert_eq!(alg.parameters.as_deref(), Some(&[0x05, 0x00][..]));

        let absent = Mode::Der
            .decode(
                Bytes::from_static(&[0x30, 0x07, 0x06, 0x05, 43, 14, 3, 2, 26]),
                |cons| AlgorithmIdentifier::take_from(cons),
            )
            .unwrap();
        assert_eq!(absent.parameters, None);
        assert_eq!(
            DigestAlgorithm::try_from(&absent).unwrap(),
            DigestAlgorithm::Sha1
        );
    }
}
