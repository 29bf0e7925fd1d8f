// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! CAdES profile stages.

Each CAdES level is a [ProfileStage]. The BES and EPES stages contribute
signed attributes when a signature is created. The T, C, X, XL and A stages
take an existing [SignerRecord] and return a new one with more unsigned
attributes.

Which stages run for a requested [SignatureFormat] is decided by
[signing_stages] and [extension_stages]. A fresh list is built for every
request; stages carry no state between invocations.
*/

mod a;
mod bes;
mod c;
mod epes;
mod t;
mod x;
mod xl;

pub use {
    a::ArchiveStage, bes::BesStage, c::CompleteReferencesStage, epes::EpesStage,
    t::SignatureTimestampStage, x::ExtendedValidationStage, xl::ValidationValuesStage,
};

use {
    crate::{
        algorithm::DigestAlgorithm,
        asn1::rfc5652::Attribute,
        certificate::CapturedCertificate,
        settings::{SignatureFormat, SignatureParameters},
        signature::{SignatureLevel, SignerView},
        signer::SignerRecord,
        timestamp::{TimestampSource, TimestampToken, TimestampType},
        validation::CertificateVerifier,
        CadesError, CadesSignature,
    },
    bcder::{ConstOid, Oid},
    bytes::Bytes,
    log::debug,
};

/// The external services stages may consult.
#[derive(Clone, Copy, Default)]
pub struct Collaborators<'a> {
    timestamp_source: Option<&'a dyn TimestampSource>,
    certificate_verifier: Option<&'a dyn CertificateVerifier>,
}

impl<'a> Collaborators<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timestamp_source(mut self, source: &'a dyn TimestampSource) -> Self {
        self.timestamp_source = Some(source);
        self
    }

    pub fn with_certificate_verifier(mut self, verifier: &'a dyn CertificateVerifier) -> Self {
        self.certificate_verifier = Some(verifier);
        self
    }

    pub fn timestamp_source(&self) -> Result<&'a dyn TimestampSource, CadesError> {
        self.timestamp_source
            .ok_or(CadesError::MissingTimestampSource)
    }

    pub fn certificate_verifier(&self) -> Result<&'a dyn CertificateVerifier, CadesError> {
        self.certificate_verifier
            .ok_or(CadesError::MissingCertificateVerifier)
    }
}

impl<'a> std::fmt::Debug for Collaborators<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("timestamp_source", &self.timestamp_source.is_some())
            .field("certificate_verifier", &self.certificate_verifier.is_some())
            .finish()
    }
}

/// Everything a stage sees while extending one signer.
#[derive(Clone, Copy, Debug)]
pub struct ExtensionContext<'a> {
    pub parameters: &'a SignatureParameters,
    pub collaborators: Collaborators<'a>,
    /// The container the signer belongs to, as it was before extension.
    pub signature: &'a CadesSignature,
    /// Whether the signer is a counter-signature.
    pub counter_signature: bool,
    /// The signed content when it is not encapsulated.
    ///
    /// For counter-signatures this is the signature value they sign.
    pub original: Option<&'a [u8]>,
}

impl<'a> ExtensionContext<'a> {
    /// View `record` as a member of the container.
    pub fn view<'b>(&'b self, record: &'b SignerRecord) -> SignerView<'b> {
        if self.counter_signature {
            self.signature.counter_signer(record)
        } else {
            self.signature.signer(record)
        }
    }
}

/// One CAdES level.
pub trait ProfileStage {
    /// The format this stage produces.
    fn format(&self) -> SignatureFormat;

    fn level(&self) -> SignatureLevel {
        self.format().into()
    }

    /// Verify configuration and collaborators.
    ///
    /// Called for every stage of a chain before any stage does work.
    fn check(
        &self,
        _parameters: &SignatureParameters,
        _collaborators: &Collaborators,
    ) -> Result<(), CadesError> {
        Ok(())
    }

    /// Signed attributes this stage contributes when signing.
    fn signed_attributes(
        &self,
        _parameters: &SignatureParameters,
        _certificate: &CapturedCertificate,
    ) -> Result<Vec<Attribute>, CadesError> {
        Ok(vec![])
    }

    /// Produce an extended copy of `record`.
    fn apply(
        &self,
        record: &SignerRecord,
        context: &ExtensionContext,
    ) -> Result<SignerRecord, CadesError>;
}

/// The stages whose signed attributes go into a new signature.
pub fn signing_stages(format: SignatureFormat) -> Vec<Box<dyn ProfileStage>> {
    match format {
        SignatureFormat::CadesBes => vec![Box::new(BesStage)],
        _ => vec![Box::new(BesStage), Box::new(EpesStage)],
    }
}

/// The stages that extend an existing signature to `format`.
pub fn extension_stages(format: SignatureFormat) -> Vec<Box<dyn ProfileStage>> {
    let mut stages: Vec<Box<dyn ProfileStage>> = vec![];

    if format >= SignatureFormat::CadesT {
        stages.push(Box::new(SignatureTimestampStage));
    }
    if format >= SignatureFormat::CadesC {
        stages.push(Box::new(CompleteReferencesStage));
    }
    if format >= SignatureFormat::CadesX {
        stages.push(Box::new(ExtendedValidationStage));
    }
    if format >= SignatureFormat::CadesXl {
        stages.push(Box::new(ValidationValuesStage));
    }
    if format >= SignatureFormat::CadesA {
        stages.push(Box::new(ArchiveStage));
    }

    stages
}

fn owned_oid(oid: &ConstOid) -> Oid {
    Oid(Bytes::copy_from_slice(oid.as_ref()))
}

/// Time-stamp `data` with the source's preferred digest, or SHA-1.
fn request_timestamp(
    source: &dyn TimestampSource,
    data: &[u8],
    typ: TimestampType,
) -> Result<TimestampToken, CadesError> {
    let algorithm = source
        .preferred_digest_algorithm()
        .unwrap_or(DigestAlgorithm::Sha1);
    let digest = algorithm.digest(data);

    debug!(
        "requesting {:?} over {} bytes with {:?} ({})",
        typ,
        data.len(),
        algorithm,
        hex::encode(&digest)
    );

    Ok(source.request_timestamp(&digest, algorithm)?.with_type(typ))
}

/// `record` with `token` appended under the attribute for its type.
fn with_timestamp(record: &SignerRecord, token: &TimestampToken) -> SignerRecord {
    record.with_unsigned_attributes(record.unsigned_attributes().with_value(
        owned_oid(&token.timestamp_type().attribute_oid()),
        token.encoded().clone(),
    ))
}
