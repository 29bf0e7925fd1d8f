// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Signature parameters.

use {
    crate::{algorithm::DigestAlgorithm, CadesError},
    bcder::Oid,
    chrono::{DateTime, Utc},
};

/// The CAdES profile a signature should be produced at or extended to.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum SignatureFormat {
    CadesBes,
    CadesEpes,
    CadesT,
    CadesC,
    CadesX,
    CadesXl,
    CadesA,
}

impl Default for SignatureFormat {
    fn default() -> Self {
        Self::CadesBes
    }
}

impl std::fmt::Display for SignatureFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::CadesBes => "CAdES-BES",
            Self::CadesEpes => "CAdES-EPES",
            Self::CadesT => "CAdES-T",
            Self::CadesC => "CAdES-C",
            Self::CadesX => "CAdES-X",
            Self::CadesXl => "CAdES-XL",
            Self::CadesA => "CAdES-A",
        })
    }
}

/// How signed content relates to the signature container.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SignaturePackaging {
    /// Content is encapsulated in the `SignedData`.
    Enveloping,
    /// Content lives elsewhere.
    Detached,
    /// The signature is embedded in the content. Not possible with CMS.
    Enveloped,
}

impl Default for SignaturePackaging {
    fn default() -> Self {
        Self::Enveloping
    }
}

/// The signature policy to commit to in an EPES signature.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SignaturePolicy {
    NoPolicy,
    /// The policy is implied by the signed data or its context.
    Implicit,
    /// A policy identified by OID, together with the digest of its document.
    Explicit {
        id: Oid,
        digest_algorithm: DigestAlgorithm,
        digest_value: Vec<u8>,
    },
}

impl Default for SignaturePolicy {
    fn default() -> Self {
        Self::NoPolicy
    }
}

/// How the extension driver decides a signer has already been extended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExtensionGuard {
    /// A signer with any unsigned attribute counts as already extended and is
    /// skipped entirely.
    UnsignedAttributeCount,
    /// The signer's level is detected from its attributes and only the stages
    /// above it are applied. Archive time-stamps are always renewed.
    SignatureLevel,
}

impl Default for ExtensionGuard {
    fn default() -> Self {
        Self::UnsignedAttributeCount
    }
}

/// Everything that controls how a signature is produced and extended.
#[derive(Clone, Debug)]
pub struct SignatureParameters {
    format: SignatureFormat,
    packaging: SignaturePackaging,
    digest_algorithm: DigestAlgorithm,
    signing_date: Option<DateTime<Utc>>,
    claimed_role: Option<String>,
    policy: SignaturePolicy,
    pades_usage: bool,
    extended_validation_type: u8,
    extension_guard: ExtensionGuard,
}

impl Default for SignatureParameters {
    fn default() -> Self {
        Self {
            format: SignatureFormat::default(),
            packaging: SignaturePackaging::default(),
            digest_algorithm: DigestAlgorithm::default(),
            signing_date: None,
            claimed_role: None,
            policy: SignaturePolicy::default(),
            pades_usage: false,
            extended_validation_type: 1,
            extension_guard: ExtensionGuard::default(),
        }
    }
}

impl SignatureParameters {
    /// The format to sign at or extend to.
    pub fn format(&self) -> SignatureFormat {
        self.format
    }

    pub fn set_format(&mut self, format: SignatureFormat) {
        self.format = format;
    }

    pub fn packaging(&self) -> SignaturePackaging {
        self.packaging
    }

    pub fn set_packaging(&mut self, packaging: SignaturePackaging) {
        self.packaging = packaging;
    }

    /// Digest algorithm for the message digest and the signing certificate
    /// reference.
    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest_algorithm
    }

    pub fn set_digest_algorithm(&mut self, algorithm: DigestAlgorithm) {
        self.digest_algorithm = algorithm;
    }

    /// The claimed signing time.
    ///
    /// Written as the signing-time attribute and used as a fallback
    /// validation time when a signature carries none.
    pub fn signing_date(&self) -> Option<DateTime<Utc>> {
        self.signing_date
    }

    pub fn set_signing_date(&mut self, date: DateTime<Utc>) {
        self.signing_date = Some(date);
    }

    pub fn clear_signing_date(&mut self) {
        self.signing_date = None;
    }

    pub fn claimed_role(&self) -> Option<&str> {
        self.claimed_role.as_deref()
    }

    pub fn set_claimed_role(&mut self, role: impl ToString) {
        self.claimed_role = Some(role.to_string());
    }

    pub fn policy(&self) -> &SignaturePolicy {
        &self.policy
    }

    pub fn set_policy(&mut self, policy: SignaturePolicy) {
        self.policy = policy;
    }

    /// Whether the signature is destined for a PDF.
    ///
    /// PAdES carries the signing time and role in the PDF signature
    /// dictionary, so neither is written as a signed attribute.
    pub fn pades_usage(&self) -> bool {
        self.pades_usage
    }

    pub fn set_pades_usage(&mut self, value: bool) {
        self.pades_usage = value;
    }

    /// Selects the CAdES-X flavor: 1 for escTimeStamp, 2 for certCrlTimestamp.
    pub fn extended_validation_type(&self) -> u8 {
        self.extended_validation_type
    }

    pub fn set_extended_validation_type(&mut self, value: u8) {
        self.extended_validation_type = value;
    }

    pub fn extension_guard(&self) -> ExtensionGuard {
        self.extension_guard
    }

    pub fn set_extension_guard(&mut self, guard: ExtensionGuard) {
        self.extension_guard = guard;
    }

    /// Reject packagings CMS cannot express.
    pub fn ensure_packaging(&self) -> Result<(), CadesError> {
        match self.packaging {
            SignaturePackaging::Enveloping | SignaturePackaging::Detached => Ok(()),
            packaging => Err(CadesError::UnsupportedPackaging(packaging)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let params = SignatureParameters::default();

        assert_eq!(params.format(), SignatureFormat::CadesBes);
        assert_eq!(params.digest_algorithm(), DigestAlgorithm::Sha256);
        assert_eq!(params.extended_validation_type(), 1);
        assert_eq!(params.policy(), &SignaturePolicy::NoPolicy);
        assert_eq!(params.extension_guard(), ExtensionGuard::UnsignedAttributeCount);
        assert!(params.signing_date().is_none());
        assert!(!params.pades_usage());
    }

    #[test]
    fn enveloped_is_rejected() {
        let mut params = SignatureParameters::default();
        params.ensure_packaging().unwrap();

        params.set_packaging(SignaturePackaging::Detached);
        params.ensure_packaging().unwrap();

        params.set_packaging(SignaturePackaging::Enveloped);
        let err = params.ensure_packaging().unwrap_err();
        assert!(matches!(
            err,
            CadesError::UnsupportedPackaging(SignaturePackaging::Enveloped)
        ));
        assert!(err.is_configuration());
    }

    #[test]
    fn formats_are_ordered() {
        assert!(SignatureFormat::CadesBes < SignatureFormat::CadesEpes);
        assert!(SignatureFormat::CadesXl < SignatureFormat::CadesA);
        assert_eq!(SignatureFormat::CadesXl.to_string(), "CAdES-XL");
    }
}
