// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::{algorithm::DigestAlgorithm, settings::SignaturePackaging, timestamp::TimeStampError},
    bcder::decode::DecodeError,
    pem::PemError,
    std::convert::Infallible,
    thiserror::Error,
};

/// Unified error type for CAdES operations.
#[derive(Debug, Error)]
pub enum CadesError {
    #[error("signature format requires a time-stamp source but none is configured")]
    MissingTimestampSource,

    #[error("signature format requires a certificate verifier but none is configured")]
    MissingCertificateVerifier,

    #[error("no signing time available from the signature or the parameters")]
    MissingSigningTime,

    #[error("unsupported signature packaging: {0:?}")]
    UnsupportedPackaging(SignaturePackaging),

    #[error("invalid extended validation data type: {0} (must be 1 or 2)")]
    InvalidExtendedValidationType(u8),

    #[error("digest algorithm not supported for this operation: {0:?}")]
    UnsupportedDigestAlgorithm(DigestAlgorithm),

    #[error("unknown digest algorithm: {0}")]
    UnknownDigestAlgorithm(String),

    #[error("unknown signature algorithm: {0}")]
    UnknownSignatureAlgorithm(String),

    #[error("ASN.1 decode error: {0}")]
    Asn1Decode(DecodeError<Infallible>),

    #[error("missing unsigned attribute: {0}")]
    MissingUnsignedAttribute(&'static str),

    #[error("missing signed attribute: {0}")]
    MissingSignedAttribute(&'static str),

    #[error("malformed attribute: {0}")]
    MalformedAttribute(&'static str),

    #[error("malformed certificate")]
    MalformedCertificate,

    #[error("malformed certificate revocation list")]
    MalformedCrl,

    #[error("malformed OCSP response")]
    MalformedOcspResponse,

    #[error("data is not a CMS SignedData structure")]
    NotSignedData,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PEM error: {0}")]
    Pem(PemError),

    #[error("time-stamp protocol error: {0}")]
    TimeStampProtocol(#[from] TimeStampError),

    #[error("certificate verification failed: {0}")]
    Verification(String),

    #[error("private key rejected: {0}")]
    KeyRejected(String),

    #[error("error when creating signature")]
    SignatureCreation,

    #[error("signature verification failed")]
    SignatureVerification,

    #[error("cannot determine the original archive time-stamp ordering")]
    ArchiveTimestampOrdering,

    #[error("signature is detached and no original data provided")]
    DetachedContentMissing,

    #[error("signing certificate not found")]
    SigningCertificateNotFound,

    #[error("signer not found")]
    SignerNotFound,
}

impl CadesError {
    /// Whether this is a configuration error.
    ///
    /// Configuration errors are raised before any collaborator is consulted
    /// and apply equally to every signer of a container.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingTimestampSource
                | Self::MissingCertificateVerifier
                | Self::MissingSigningTime
                | Self::UnsupportedPackaging(_)
                | Self::InvalidExtendedValidationType(_)
                | Self::UnsupportedDigestAlgorithm(_)
                | Self::UnknownDigestAlgorithm(_)
        )
    }
}

impl From<DecodeError<Infallible>> for CadesError {
    fn from(e: DecodeError<Infallible>) -> Self {
        Self::Asn1Decode(e)
    }
}

impl From<PemError> for CadesError {
    fn from(e: PemError) -> Self {
        Self::Pem(e)
    }
}

impl From<ring::error::KeyRejected> for CadesError {
    fn from(e: ring::error::KeyRejected) -> Self {
        Self::KeyRejected(e.to_string())
    }
}
