// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Digest and signature algorithms.

use {
    crate::{asn1::rfc5280::AlgorithmIdentifier, CadesError},
    bcder::{ConstOid, Oid},
    bytes::Bytes,
    ring::{digest, signature},
    std::convert::TryFrom,
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

/// RSA encryption.
///
/// 1.2.840.113549.1.1.1
const OID_RSA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 1]);

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

/// A hashing algorithm used for digesting data.
///
/// Instances can be converted to and from [Oid] and the ASN.1
/// [AlgorithmIdentifier] via `From`/`TryFrom`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DigestAlgorithm {
    /// SHA-1.
    ///
    /// Corresponds to OID 1.3.14.3.2.26.
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

impl Default for DigestAlgorithm {
    fn default() -> Self {
        Self::Sha256
    }
}

impl From<DigestAlgorithm> for Oid {
    fn from(alg: DigestAlgorithm) -> Self {
        Oid(Bytes::from_static(match alg {
            DigestAlgorithm::Sha1 => OID_SHA1.0,
            DigestAlgorithm::Sha256 => OID_SHA256.0,
            DigestAlgorithm::Sha384 => OID_SHA384.0,
            DigestAlgorithm::Sha512 => OID_SHA512.0,
        }))
    }
}

impl TryFrom<&Oid> for DigestAlgorithm {
    type Error = CadesError;

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
            Err(CadesError::UnknownDigestAlgorithm(format!("{}", v)))
        }
    }
}

impl TryFrom<&AlgorithmIdentifier> for DigestAlgorithm {
    type Error = CadesError;

    fn try_from(v: &AlgorithmIdentifier) -> Result<Self, Self::Error> {
        Self::try_from(&v.algorithm)
    }
}

impl From<DigestAlgorithm> for AlgorithmIdentifier {
    fn from(alg: DigestAlgorithm) -> Self {
        Self {
            algorithm: alg.into(),
            parameters: None,
        }
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

    /// Digest `data` in one shot.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        let mut h = self.digester();
        h.update(data);
        h.finish().as_ref().to_vec()
    }

    /// Length in bytes of digests produced by this algorithm.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }
}

/// An algorithm used to digitally sign content.
///
/// Only RSA PKCS#1 v1.5 signatures are produced. SHA-1 based signatures
/// are not, as `ring` refuses to create them.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SignatureAlgorithm {
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
}

impl SignatureAlgorithm {
    /// The RSA signature algorithm that pairs with a digest algorithm.
    pub fn rsa_with_digest(digest_algorithm: DigestAlgorithm) -> Result<Self, CadesError> {
        match digest_algorithm {
            DigestAlgorithm::Sha256 => Ok(Self::Sha256Rsa),
            DigestAlgorithm::Sha384 => Ok(Self::Sha384Rsa),
            DigestAlgorithm::Sha512 => Ok(Self::Sha512Rsa),
            DigestAlgorithm::Sha1 => Err(CadesError::UnsupportedDigestAlgorithm(digest_algorithm)),
        }
    }

    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        match self {
            Self::Sha256Rsa => DigestAlgorithm::Sha256,
            Self::Sha384Rsa => DigestAlgorithm::Sha384,
            Self::Sha512Rsa => DigestAlgorithm::Sha512,
        }
    }

    pub(crate) fn rsa_encoding(&self) -> &'static dyn signature::RsaEncoding {
        match self {
            Self::Sha256Rsa => &signature::RSA_PKCS1_SHA256,
            Self::Sha384Rsa => &signature::RSA_PKCS1_SHA384,
            Self::Sha512Rsa => &signature::RSA_PKCS1_SHA512,
        }
    }
}

impl From<SignatureAlgorithm> for Oid {
    fn from(alg: SignatureAlgorithm) -> Self {
        Oid(Bytes::from_static(match alg {
            SignatureAlgorithm::Sha256Rsa => OID_SHA256_RSA.0,
            SignatureAlgorithm::Sha384Rsa => OID_SHA384_RSA.0,
            SignatureAlgorithm::Sha512Rsa => OID_SHA512_RSA.0,
        }))
    }
}

impl TryFrom<&Oid> for SignatureAlgorithm {
    type Error = CadesError;

    fn try_from(v: &Oid) -> Result<Self, Self::Error> {
        if v == &OID_SHA256_RSA {
            Ok(Self::Sha256Rsa)
        } else if v == &OID_SHA384_RSA {
            Ok(Self::Sha384Rsa)
        } else if v == &OID_SHA512_RSA {
            Ok(Self::Sha512Rsa)
        } else {
            Err(CadesError::UnknownSignatureAlgorithm(format!("{}", v)))
        }
    }
}

impl From<SignatureAlgorithm> for AlgorithmIdentifier {
    fn from(alg: SignatureAlgorithm) -> Self {
        Self {
            algorithm: alg.into(),
            parameters: None,
        }
    }
}

/// Resolve the verification algorithm for a CMS signer.
///
/// CMS signers commonly identify RSA signatures by the bare `rsaEncryption`
/// OID and leave the digest to `digestAlgorithm`, so both are consulted.
pub fn verification_algorithm(
    signature_algorithm: &Oid,
    digest_algorithm: DigestAlgorithm,
) -> Result<&'static dyn signature::VerificationAlgorithm, CadesError> {
    let algorithm = if signature_algorithm == &OID_RSA {
        SignatureAlgorithm::rsa_with_digest(digest_algorithm)?
    } else {
        SignatureAlgorithm::try_from(signature_algorithm)?
    };

    Ok(match algorithm {
        SignatureAlgorithm::Sha256Rsa => &signature::RSA_PKCS1_2048_8192_SHA256,
        SignatureAlgorithm::Sha384Rsa => &signature::RSA_PKCS1_2048_8192_SHA384,
        SignatureAlgorithm::Sha512Rsa => &signature::RSA_PKCS1_2048_8192_SHA512,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn digest_oid_round_trip() {
        for alg in [
            DigestAlgorithm::Sha1,
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Sha384,
            DigestAlgorithm::Sha512,
        ] {
            let oid = Oid::from(alg);
            assert_eq!(DigestAlgorithm::try_from(&oid).unwrap(), alg);
            assert_eq!(alg.digest(b"abc").len(), alg.output_len());
        }

        let unknown = Oid(Bytes::from_static(&[42, 3, 4]));
        assert!(matches!(
            DigestAlgorithm::try_from(&unknown),
            Err(CadesError::UnknownDigestAlgorithm(_))
        ));
    }

    #[test]
    fn sha1_known_answer() {
        assert_eq!(
            hex::encode(DigestAlgorithm::Sha1.digest(b"abc")),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn rsa_pairs_with_digest() {
        assert_eq!(
            SignatureAlgorithm::rsa_with_digest(DigestAlgorithm::Sha384).unwrap(),
            SignatureAlgorithm::Sha384Rsa
        );
        assert!(matches!(
            SignatureAlgorithm::rsa_with_digest(DigestAlgorithm::Sha1),
            Err(CadesError::UnsupportedDigestAlgorithm(DigestAlgorithm::Sha1))
        ));

        let rsa = Oid(Bytes::from_static(OID_RSA.0));
        assert!(verification_algorithm(&rsa, DigestAlgorithm::Sha256).is_ok());
        assert!(verification_algorithm(&rsa, DigestAlgorithm::Sha1).is_err());
    }
}
