// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! CAdES-C: complete certificate and revocation references.

The references are hashes. The referenced objects themselves are only
embedded by CAdES-XL.
*/

use {
    super::{owned_oid, Collaborators, ExtensionContext, ProfileStage},
    crate::{
        algorithm::DigestAlgorithm,
        asn1::{
            common::{GeneralizedTime, RawValue, UtcTime},
            rfc5126::{
                CompleteCertificateRefs, CompleteRevocationRefs, CrlIdentifier, CrlListId,
                CrlOcspRef, CrlValidatedId, OcspIdentifier, OcspListId, OcspResponsesId,
                OtherCertId, OtherHash, OID_CERTIFICATE_REFS, OID_REVOCATION_REFS,
            },
        },
        certificate::CapturedCertificate,
        settings::{SignatureFormat, SignatureParameters},
        signer::SignerRecord,
        validation::ValidationContext,
        CadesError,
    },
    bcder::OctetString,
    bytes::Bytes,
    log::{debug, info},
};

/// Adds complete certificate references and complete revocation references.
#[derive(Clone, Copy, Debug, Default)]
pub struct CompleteReferencesStage;

fn sha1_hash(data: &[u8]) -> OtherHash {
    OtherHash::Sha1(OctetString::new(Bytes::from(
        DigestAlgorithm::Sha1.digest(data),
    )))
}

/// References to every needed certificate except the signing certificate.
pub fn certificate_refs(
    needed: &[CapturedCertificate],
    signing_certificate: &CapturedCertificate,
) -> CompleteCertificateRefs {
    CompleteCertificateRefs(
        needed
            .iter()
            .filter(|cert| *cert != signing_certificate)
            .map(|cert| OtherCertId {
                other_cert_hash: sha1_hash(cert.encoded()),
                issuer_serial: Some(cert.issuer_serial()),
            })
            .collect(),
    )
}

/// The revocation references that establish the status of `certificate`.
fn revocation_ref(context: &dyn ValidationContext, certificate: &CapturedCertificate) -> CrlOcspRef {
    let crls = context
        .needed_crls_for(certificate)
        .iter()
        .map(|crl| CrlValidatedId {
            crl_hash: sha1_hash(crl.encoded()),
            crl_identifier: Some(CrlIdentifier {
                crl_issuer: crl.issuer().clone(),
                crl_issued_time: UtcTime::from(crl.this_update()),
                crl_number: crl.crl_number(),
            }),
        })
        .collect::<Vec<_>>();

    let responses = context
        .needed_ocsp_for(certificate)
        .iter()
        .map(|response| OcspResponsesId {
            ocsp_identifier: OcspIdentifier {
                ocsp_responder_id: response.responder_id().clone(),
                produced_at: GeneralizedTime::from(response.produced_at()),
            },
            ocsp_rep_hash: Some(sha1_hash(response.encoded())),
        })
        .collect::<Vec<_>>();

    CrlOcspRef {
        crl_ids: if crls.is_empty() {
            None
        } else {
            Some(CrlListId { crls })
        },
        ocsp_ids: if responses.is_empty() {
            None
        } else {
            Some(OcspListId {
                ocsp_responses: responses,
            })
        },
        other_rev: None,
    }
}

/// One revocation reference group per needed certificate, in path order.
pub fn revocation_refs(
    context: &dyn ValidationContext,
    needed: &[CapturedCertificate],
) -> CompleteRevocationRefs {
    CompleteRevocationRefs(
        needed
            .iter()
            .map(|cert| revocation_ref(context, cert))
            .collect(),
    )
}

impl ProfileStage for CompleteReferencesStage {
    fn format(&self) -> SignatureFormat {
        SignatureFormat::CadesC
    }

    fn check(
        &self,
        _parameters: &SignatureParameters,
        collaborators: &Collaborators,
    ) -> Result<(), CadesError> {
        collaborators.certificate_verifier().map(|_| ())
    }

    fn apply(
        &self,
        record: &SignerRecord,
        context: &ExtensionContext,
    ) -> Result<SignerRecord, CadesError> {
        let verifier = context.collaborators.certificate_verifier()?;
        let view = context.view(record);

        let signing_certificate = view.signing_certificate()?;
        let time = view
            .signing_time()?
            .or_else(|| context.parameters.signing_date())
            .ok_or(CadesError::MissingSigningTime)?;

        let validation = verifier.validate_certificate(
            &signing_certificate,
            time,
            &view.validation_sources()?,
        )?;
        let needed = validation.needed_certificates();

        let cert_refs = certificate_refs(&needed, &signing_certificate);
        let rev_refs = revocation_refs(validation.as_ref(), &needed);

        debug!(
            "{} certificate references, {} revocation reference groups",
            cert_refs.0.len(),
            rev_refs.0.len()
        );
        info!("complete validation references added for validation at {}", time);

        let unsigned = record
            .unsigned_attributes()
            .with_value(
                owned_oid(&OID_CERTIFICATE_REFS),
                RawValue::from_values(cert_refs.encode_ref()),
            )
            .with_value(
                owned_oid(&OID_REVOCATION_REFS),
                RawValue::from_values(rev_refs.encode_ref()),
            );

        Ok(record.with_unsigned_attributes(unsigned))
    }
}
