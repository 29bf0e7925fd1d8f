// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CAdES-XL: the referenced validation data itself.

use {
    super::{owned_oid, Collaborators, ExtensionContext, ProfileStage},
    crate::{
        asn1::{
            common::RawValue,
            rfc5126::{CertificateValues, RevocationValues, OID_CERT_VALUES, OID_REVOCATION_VALUES},
        },
        settings::{SignatureFormat, SignatureParameters},
        signer::SignerRecord,
        CadesError,
    },
    chrono::Utc,
    log::info,
};

/// Embeds certificate values and revocation values.
#[derive(Clone, Copy, Debug, Default)]
pub struct ValidationValuesStage;

fn non_empty(values: Vec<RawValue>) -> Option<Vec<RawValue>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

impl ProfileStage for ValidationValuesStage {
    fn format(&self) -> SignatureFormat {
        SignatureFormat::CadesXl
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
        // Unlike the references, the values may be gathered at any time.
        let time = view
            .signing_time()?
            .or_else(|| context.parameters.signing_date())
            .unwrap_or_else(Utc::now);

        let validation = verifier.validate_certificate(
            &signing_certificate,
            time,
            &view.validation_sources()?,
        )?;

        let certificate_values = CertificateValues(
            validation
                .needed_certificates()
                .iter()
                .filter(|cert| *cert != &signing_certificate)
                .map(|cert| cert.raw().clone())
                .collect(),
        );

        let revocation_values = RevocationValues {
            crl_vals: non_empty(
                validation
                    .needed_crls()
                    .iter()
                    .map(|crl| crl.raw().clone())
                    .collect(),
            ),
            ocsp_vals: non_empty(
                validation
                    .needed_ocsp_responses()
                    .iter()
                    .map(|response| response.raw().clone())
                    .collect(),
            ),
            other_rev_vals: None,
        };

        info!(
            "embedded {} certificates and {} revocation values",
            certificate_values.0.len(),
            revocation_values.crl_vals.as_ref().map_or(0, Vec::len)
                + revocation_values.ocsp_vals.as_ref().map_or(0, Vec::len)
        );

        let unsigned = record
            .unsigned_attributes()
            .with_value(
                owned_oid(&OID_CERT_VALUES),
                RawValue::from_values(certificate_values.encode_ref()),
            )
            .with_value(
                owned_oid(&OID_REVOCATION_VALUES),
                RawValue::from_values(revocation_values.encode_ref()),
            );

        Ok(record.with_unsigned_attributes(unsigned))
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{algorithm::DigestAlgorithm, testutil::*, validation::StaticCertificateVerifier, CadesSignature},
    };

    #[test]
    fn values_become_available_to_verifiers() {
        let signer = signer_certificate();
        let intermediate = issue_certificate("Intermediate", 2);
        let crl = issue_crl(9, &[]);
        let ocsp = issue_ocsp_response(test_time(2));

        let verifier = StaticCertificateVerifier::new(vec![intermediate.clone()])
            .with_crl(&signer, crl.clone())
            .with_ocsp_response(&intermediate, ocsp.clone());
        let params = SignatureParameters::default();

        let signed = sign_bes(b"xl", DigestAlgorithm::Sha256);
        let signature = CadesSignature::parse(&signed).unwrap();
        let context = ExtensionContext {
            parameters: &params,
            collaborators: Collaborators::new().with_certificate_verifier(&verifier),
            signature: &signature,
            counter_signature: false,
            original: None,
        };

        let extended = ValidationValuesStage
            .apply(&signature.signers()[0], &context)
            .unwrap();
        let unsigned = extended.unsigned_attributes();
        assert_eq!(unsigned.attributes()[0].typ, OID_CERT_VALUES);
        assert_eq!(unsigned.attributes()[1].typ, OID_REVOCATION_VALUES);

        let view = signature.signer(&extended);
        assert_eq!(view.certificates().unwrap(), vec![signer, intermediate]);
        assert_eq!(view.crls().unwrap(), vec![crl]);
        assert_eq!(view.ocsp_responses().unwrap(), vec![ocsp]);
    }

    #[test]
    fn empty_revocation_values_are_omitted() {
        let verifier = StaticCertificateVerifier::new(vec![]);
        let params = SignatureParameters::default();

        let signed = sign_bes(b"xl empty", DigestAlgorithm::Sha256);
        let signature = CadesSignature::parse(&signed).unwrap();
        let context = ExtensionContext {
            parameters: &params,
            collaborators: Collaborators::new().with_certificate_verifier(&verifier),
            signature: &signature,
            counter_signature: false,
            original: None,
        };

        let extended = ValidationValuesStage
            .apply(&signature.signers()[0], &context)
            .unwrap();
        let values = extended
            .unsigned_attributes()
            .first_value(&OID_REVOCATION_VALUES)
            .unwrap();

        // SEQUENCE {}
        assert_eq!(values.as_slice(), &[0x30, 0x00]);
        assert_eq!(
            extended
                .unsigned_attributes()
                .first_value(&OID_CERT_VALUES)
                .unwrap()
                .as_slice(),
            &[0x30, 0x00]
        );
    }
}
