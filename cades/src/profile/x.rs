// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! CAdES-X: a time-stamp over the validation references.

Type 1 adds an escTimeStamp covering the signature value, the signature
time-stamp and both reference attributes. Type 2 adds a certCrlTimestamp
covering the reference attributes only.
*/

use {
    super::{request_timestamp, with_timestamp, Collaborators, ExtensionContext, ProfileStage},
    crate::{
        settings::{SignatureFormat, SignatureParameters},
        signer::SignerRecord,
        timestamp::TimestampType,
        CadesError,
    },
    log::info,
};

/// Adds an escTimeStamp or a certCrlTimestamp, per
/// [SignatureParameters::extended_validation_type].
#[derive(Clone, Copy, Debug, Default)]
pub struct ExtendedValidationStage;

fn timestamp_type(parameters: &SignatureParameters) -> Result<TimestampType, CadesError> {
    match parameters.extended_validation_type() {
        1 => Ok(TimestampType::ValidationDataFull),
        2 => Ok(TimestampType::ValidationDataRefsOnly),
        other => Err(CadesError::InvalidExtendedValidationType(other)),
    }
}

impl ProfileStage for ExtendedValidationStage {
    fn format(&self) -> SignatureFormat {
        SignatureFormat::CadesX
    }

    fn check(
        &self,
        parameters: &SignatureParameters,
        collaborators: &Collaborators,
    ) -> Result<(), CadesError> {
        timestamp_type(parameters)?;
        collaborators.timestamp_source().map(|_| ())
    }

    fn apply(
        &self,
        record: &SignerRecord,
        context: &ExtensionContext,
    ) -> Result<SignerRecord, CadesError> {
        let typ = timestamp_type(context.parameters)?;
        let source = context.collaborators.timestamp_source()?;
        let view = context.view(record);

        let data = match typ {
            TimestampType::ValidationDataFull => view.timestamp_x1_data()?,
            _ => view.timestamp_x2_data()?,
        };

        let token = request_timestamp(source, &data, typ)?;
        info!(
            "extended validation time-stamp (type {}) generated at {}",
            context.parameters.extended_validation_type(),
            token.generation_time()
        );

        Ok(with_timestamp(record, &token))
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{
            algorithm::DigestAlgorithm,
            asn1::{
                common::RawValue,
                rfc5126::{
                    OID_CERTIFICATE_REFS, OID_CERT_CRL_TIMESTAMP, OID_ESC_TIME_STAMP,
                    OID_REVOCATION_REFS, OID_SIGNATURE_TIME_STAMP_TOKEN,
                },
            },
            profile::{CompleteReferencesStage, SignatureTimestampStage},
            testutil::*,
            timestamp::Rfc3161TimestampSource,
            validation::StaticCertificateVerifier,
            CadesSignature,
        },
        bcder::{
            encode::{self, PrimitiveContent},
            ConstOid,
        },
    };

    /// DER of the attribute type followed by DER of its SET of values.
    fn type_and_values(record: &SignerRecord, oid: &ConstOid) -> Vec<u8> {
        let attr = record.unsigned_attributes().get(oid).unwrap();

        let mut data = RawValue::from_values(attr.typ.encode_ref()).as_slice().to_vec();
        data.extend_from_slice(RawValue::from_values(encode::set(&attr.values)).as_slice());
        data
    }

    #[test]
    fn rejects_unknown_type() {
        let tsa = StubTsa::new();
        let source = Rfc3161TimestampSource::new(&tsa);
        let collaborators = Collaborators::new().with_timestamp_source(&source);

        for value in [0, 3, 255] {
            let mut params = SignatureParameters::default();
            params.set_extended_validation_type(value);

            let err = ExtendedValidationStage
                .check(&params, &collaborators)
                .unwrap_err();
            assert!(matches!(err, CadesError::InvalidExtendedValidationType(v) if v == value));
            assert!(err.is_configuration());
        }

        assert!(matches!(
            ExtendedValidationStage.check(&SignatureParameters::default(), &Collaborators::new()),
            Err(CadesError::MissingTimestampSource)
        ));
    }

    #[test]
    fn both_types_cover_their_data() {
        let tsa = StubTsa::new();
        let source = Rfc3161TimestampSource::new(&tsa);
        let verifier = StaticCertificateVerifier::new(vec![]);
        let collaborators = Collaborators::new()
            .with_timestamp_source(&source)
            .with_certificate_verifier(&verifier);

        let signed = sign_bes(b"x", DigestAlgorithm::Sha256);
        let signature = CadesSignature::parse(&signed).unwrap();

        for (value, oid) in [(1, OID_ESC_TIME_STAMP), (2, OID_CERT_CRL_TIMESTAMP)] {
            let mut params = SignatureParameters::default();
            params.set_extended_validation_type(value);
            let context = ExtensionContext {
                parameters: &params,
                collaborators,
                signature: &signature,
                counter_signature: false,
                original: None,
            };

            let record = SignatureTimestampStage
                .apply(&signature.signers()[0], &context)
                .unwrap();
            let record = CompleteReferencesStage.apply(&record, &context).unwrap();
            let extended = ExtendedValidationStage.apply(&record, &context).unwrap();

            let unsigned = extended.unsigned_attributes();
            assert_eq!(unsigned.len(), 4);
            assert_eq!(unsigned.attributes()[3].typ, oid);

            let view = signature.signer(&extended);
            let (tokens, data) = if value == 1 {
                (view.timestamps_x1().unwrap(), view.timestamp_x1_data().unwrap())
            } else {
                (view.timestamps_x2().unwrap(), view.timestamp_x2_data().unwrap())
            };
            assert_eq!(tokens.len(), 1);
            assert!(tokens[0].matches_data(&data).unwrap());
        }
    }

    #[test]
    fn covered_bytes_are_composed_in_order() {
        let tsa = StubTsa::new();
        let source = Rfc3161TimestampSource::new(&tsa);
        let verifier = StaticCertificateVerifier::new(vec![issue_certificate("CA", 2)])
            .with_crl(&signer_certificate(), issue_crl(1, &[]));
        let collaborators = Collaborators::new()
            .with_timestamp_source(&source)
            .with_certificate_verifier(&verifier);

        let signed = sign_bes(b"composition", DigestAlgorithm::Sha256);
        let signature = CadesSignature::parse(&signed).unwrap();
        let params = SignatureParameters::default();
        let context = ExtensionContext {
            parameters: &params,
            collaborators,
            signature: &signature,
            counter_signature: false,
            original: None,
        };

        let record = SignatureTimestampStage
            .apply(&signature.signers()[0], &context)
            .unwrap();
        let record = CompleteReferencesStage.apply(&record, &context).unwrap();

        let refs = [
            type_and_values(&record, &OID_CERTIFICATE_REFS),
            type_and_values(&record, &OID_REVOCATION_REFS),
        ]
        .concat();
        let type_1 = [
            record.signature_value().to_vec(),
            type_and_values(&record, &OID_SIGNATURE_TIME_STAMP_TOKEN),
            refs.clone(),
        ]
        .concat();

        let view = signature.signer(&record);
        assert_eq!(view.timestamp_x1_data().unwrap(), type_1);
        assert_eq!(view.timestamp_x2_data().unwrap(), refs);
        assert!(!refs
            .windows(record.signature_value().len())
            .any(|window| window == record.signature_value()));

        let extended = ExtendedValidationStage.apply(&record, &context).unwrap();
        assert!(signature.signer(&extended).timestamps_x1().unwrap()[0]
            .matches_data(&type_1)
            .unwrap());

        let mut refs_only = SignatureParameters::default();
        refs_only.set_extended_validation_type(2);
        let context = ExtensionContext {
            parameters: &refs_only,
            ..context
        };
        let extended = ExtendedValidationStage.apply(&record, &context).unwrap();
        let token = &signature.signer(&extended).timestamps_x2().unwrap()[0];
        assert!(token.matches_data(&refs).unwrap());
        assert!(!token.matches_data(&type_1).unwrap());
    }

    #[test]
    fn missing_references_fail() {
        let tsa = StubTsa::new();
        let source = Rfc3161TimestampSource::new(&tsa);
        let params = SignatureParameters::default();

        let signed = sign_bes(b"no refs", DigestAlgorithm::Sha256);
        let signature = CadesSignature::parse(&signed).unwrap();
        let context = ExtensionContext {
            parameters: &params,
            collaborators: Collaborators::new().with_timestamp_source(&source),
            signature: &signature,
            counter_signature: false,
            original: None,
        };

        assert!(matches!(
            ExtendedValidationStage.apply(&signature.signers()[0], &context),
            Err(CadesError::MissingUnsignedAttribute(_))
        ));
        assert_eq!(tsa.request_count(), 0);
    }
}
