// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! High-level signing and extension entry points.

[CadesService] holds the collaborators and exposes the three operations
most callers need: sign a document at any CAdES level, extend all signers
of an existing signature, or extend a single one.
*/

use {
    crate::{
        asn1::rfc5652::SignerIdentifier,
        certificate::CapturedCertificate,
        document::Document,
        extension::{ExtensionOutput, SignatureExtensionDriver},
        profile::{signing_stages, Collaborators},
        settings::{SignatureFormat, SignaturePackaging, SignatureParameters},
        signing::{SignedDataBuilder, SignerBuilder, SigningKey},
        CadesError, CadesSignature,
    },
    log::info,
};

/// Signs and extends CAdES signatures with a fixed set of collaborators.
#[derive(Clone, Copy, Debug, Default)]
pub struct CadesService<'a> {
    collaborators: Collaborators<'a>,
}

impl<'a> CadesService<'a> {
    pub fn new(collaborators: Collaborators<'a>) -> Self {
        Self { collaborators }
    }

    pub fn collaborators(&self) -> &Collaborators<'a> {
        &self.collaborators
    }

    /// Sign `document` and extend the result to the requested format.
    ///
    /// `chain` is embedded next to the signing certificate. The first signer
    /// failure during extension is returned as the error.
    pub fn sign_document(
        &self,
        document: &dyn Document,
        parameters: &SignatureParameters,
        signing_key: &dyn SigningKey,
        certificate: CapturedCertificate,
        chain: &[CapturedCertificate],
    ) -> Result<Vec<u8>, CadesError> {
        // Reject bad configuration before reading the document or
        // contacting anything.
        let driver = SignatureExtensionDriver::new(parameters, self.collaborators)?;

        let mut attributes = vec![];
        for stage in signing_stages(parameters.format()) {
            attributes.extend(stage.signed_attributes(parameters, &certificate)?);
        }

        let content = document.to_bytes()?;
        let detached = parameters.packaging() == SignaturePackaging::Detached;

        let signer = SignerBuilder::new(signing_key, certificate)
            .digest_algorithm(parameters.digest_algorithm())
            .signed_attributes(attributes);

        let signed = SignedDataBuilder::default()
            .signed_content(content.clone())
            .detached(detached)
            .signer(signer)
            .certificates(chain.iter().cloned())
            .build_der()?;

        info!(
            "signed {} bytes at {}",
            content.len(),
            parameters.format().min(SignatureFormat::CadesEpes)
        );

        if parameters.format() <= SignatureFormat::CadesEpes {
            return Ok(signed);
        }

        let signature = CadesSignature::parse(&signed)?;
        let original = if detached {
            Some(content.as_slice())
        } else {
            None
        };

        driver.extend_all(&signature, original).into_result()
    }

    /// Extend every signer of the signature in `data`.
    ///
    /// `original` supplies the content of a detached signature.
    pub fn extend_signatures(
        &self,
        data: &[u8],
        parameters: &SignatureParameters,
        original: Option<&dyn Document>,
    ) -> Result<ExtensionOutput, CadesError> {
        let driver = SignatureExtensionDriver::new(parameters, self.collaborators)?;
        let signature = CadesSignature::parse(data)?;
        let original = original.map(|document| document.to_bytes()).transpose()?;

        Ok(driver.extend_all(&signature, original.as_deref()))
    }

    /// Extend only the signer identified by `sid`.
    pub fn extend_signer(
        &self,
        data: &[u8],
        sid: &SignerIdentifier,
        parameters: &SignatureParameters,
        original: Option<&dyn Document>,
    ) -> Result<ExtensionOutput, CadesError> {
        let driver = SignatureExtensionDriver::new(parameters, self.collaborators)?;
        let signature = CadesSignature::parse(data)?;
        let original = original.map(|document| document.to_bytes()).transpose()?;

        driver.extend_one(&signature, sid, original.as_deref())
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{
            algorithm::DigestAlgorithm,
            asn1::rfc5126::{
                CertificateValues, CompleteCertificateRefs, CompleteRevocationRefs,
                RevocationValues, OID_ARCHIVE_TIMESTAMP_V2, OID_CERTIFICATE_REFS,
                OID_CERT_CRL_TIMESTAMP, OID_CERT_VALUES, OID_ESC_TIME_STAMP, OID_REVOCATION_REFS,
                OID_REVOCATION_VALUES, OID_SIGNATURE_TIME_STAMP_TOKEN, OID_SIGNING_CERTIFICATE,
                OID_SIGNING_CERTIFICATE_V2,
            },
            document::{FileDocument, InMemoryDocument},
            extension::SignerOutcome,
            signature::SignatureLevel,
            testutil::*,
            timestamp::Rfc3161TimestampSource,
            validation::StaticCertificateVerifier,
        },
        bcder::{decode::Constructed, ConstOid, Mode},
        std::io::Write,
    };

    fn params(format: SignatureFormat) -> SignatureParameters {
        let mut params = SignatureParameters::default();
        params.set_format(format);
        params.set_signing_date(test_time(0));
        params
    }

    fn attribute_types(signature: &CadesSignature) -> Vec<Vec<u8>> {
        signature.signers()[0]
            .unsigned_attributes()
            .iter()
            .map(|attr| attr.typ.as_ref().to_vec())
            .collect()
    }

    fn oids(oids: &[ConstOid]) -> Vec<Vec<u8>> {
        oids.iter().map(|oid| oid.as_ref().to_vec()).collect()
    }

    #[test]
    fn full_chain_to_archive() {
        let tsa = StubTsa::new();
        let source = Rfc3161TimestampSource::new(&tsa);
        let intermediate = issue_certificate("Intermediate CA", 2);
        let root = issue_certificate("Root CA", 3);
        let verifier = StaticCertificateVerifier::new(vec![intermediate.clone(), root.clone()]);
        let service = CadesService::new(
            Collaborators::new()
                .with_timestamp_source(&source)
                .with_certificate_verifier(&verifier),
        );

        let signed = service
            .sign_document(
                &InMemoryDocument::new(b"long lived".to_vec()),
                &params(SignatureFormat::CadesA),
                &signing_key(),
                signer_certificate(),
                &[],
            )
            .unwrap();

        let signature = CadesSignature::parse(&signed).unwrap();
        assert_eq!(
            attribute_types(&signature),
            oids(&[
                OID_SIGNATURE_TIME_STAMP_TOKEN,
                OID_CERTIFICATE_REFS,
                OID_REVOCATION_REFS,
                OID_ESC_TIME_STAMP,
                OID_CERT_VALUES,
                OID_REVOCATION_VALUES,
                OID_ARCHIVE_TIMESTAMP_V2,
            ])
        );

        let record = &signature.signers()[0];
        let view = signature.signer(record);
        assert_eq!(view.level(), SignatureLevel::A);
        view.verify_signature().unwrap();
        view.verify_message_digest(b"long lived").unwrap();

        let unsigned = record.unsigned_attributes();
        let value = |oid: &ConstOid| unsigned.first_value(oid).unwrap().as_slice().to_vec();

        let refs = Constructed::decode(value(&OID_CERTIFICATE_REFS).as_slice(), Mode::Der, |cons| {
            CompleteCertificateRefs::take_from(cons)
        })
        .unwrap();
        assert_eq!(
            refs.0
                .iter()
                .map(|id| id.issuer_serial.clone())
                .collect::<Vec<_>>(),
            vec![Some(intermediate.issuer_serial()), Some(root.issuer_serial())]
        );

        let rev_refs = Constructed::decode(value(&OID_REVOCATION_REFS).as_slice(), Mode::Der, |cons| {
            CompleteRevocationRefs::take_from(cons)
        })
        .unwrap();
        assert_eq!(rev_refs.0.len(), 3);
        assert!(rev_refs.0.iter().all(|r| r.crl_ids.is_none() && r.ocsp_ids.is_none()));

        let values = Constructed::decode(value(&OID_CERT_VALUES).as_slice(), Mode::Der, |cons| {
            CertificateValues::take_from(cons)
        })
        .unwrap();
        assert_eq!(
            values.0,
            vec![intermediate.raw().clone(), root.raw().clone()]
        );

        let revocation = Constructed::decode(
            value(&OID_REVOCATION_VALUES).as_slice(),
            Mode::Der,
            |cons| RevocationValues::take_from(cons),
        )
        .unwrap();
        assert_eq!(revocation, RevocationValues::default());

        // Every token covers exactly the bytes it claims to.
        let signature_ts = view.signature_timestamps().unwrap();
        assert!(signature_ts[0]
            .matches_data(&view.signature_timestamp_data())
            .unwrap());

        // The x1 data must be computed over the attributes as they were
        // when the token was taken, which is unchanged by later stages.
        let x1 = view.timestamps_x1().unwrap();
        assert!(x1[0].matches_data(&view.timestamp_x1_data().unwrap()).unwrap());

        let archive = view.archive_timestamps().unwrap();
        let before_archive = record.with_unsigned_attributes(
            unsigned.filtered(|_, attr| attr.typ != OID_ARCHIVE_TIMESTAMP_V2),
        );
        assert!(archive[0]
            .matches_data(
                &signature
                    .signer(&before_archive)
                    .archive_timestamp_data(0, None)
                    .unwrap()
            )
            .unwrap());

        assert_eq!(verifier.validation_times(), vec![test_time(0), test_time(0)]);
        assert_eq!(tsa.request_count(), 3);
    }

    #[test]
    fn attributes_only_grow() {
        let tsa = StubTsa::new();
        let source = Rfc3161TimestampSource::new(&tsa);
        let verifier = StaticCertificateVerifier::new(vec![issue_certificate("CA", 2)])
            .with_crl(&signer_certificate(), issue_crl(1, &[]));
        let service = CadesService::new(
            Collaborators::new()
                .with_timestamp_source(&source)
                .with_certificate_verifier(&verifier),
        );

        let mut current = sign_bes(b"growth", DigestAlgorithm::Sha256);
        let original = CadesSignature::parse(&current).unwrap().signers()[0].clone();

        let formats = [
            SignatureFormat::CadesT,
            SignatureFormat::CadesC,
            SignatureFormat::CadesX,
            SignatureFormat::CadesXl,
            SignatureFormat::CadesA,
            SignatureFormat::CadesA,
        ];

        let mut previous = original.unsigned_attributes().clone();
        for format in formats {
            let mut parameters = params(format);
            parameters.set_extension_guard(crate::settings::ExtensionGuard::SignatureLevel);

            let output = service
                .extend_signatures(&current, &parameters, None)
                .unwrap();
            assert!(output.outcomes[0].is_extended());
            current = output.data;

            let record = CadesSignature::parse(&current).unwrap().signers()[0].clone();
            assert_eq!(record.signed_attributes(), original.signed_attributes());
            assert_eq!(record.signature_value(), original.signature_value());

            let table = record.unsigned_attributes();
            assert!(table.len() > previous.len());
            assert_eq!(&table.attributes()[..previous.len()], previous.attributes());
            previous = table.clone();
        }

        assert_eq!(previous.count(&OID_ARCHIVE_TIMESTAMP_V2), 2);
    }

    #[test]
    fn signing_certificate_version() {
        let service = CadesService::default();

        for (algorithm, v1) in [
            (DigestAlgorithm::Sha1, true),
            (DigestAlgorithm::Sha256, false),
            (DigestAlgorithm::Sha512, false),
        ] {
            let mut parameters = params(SignatureFormat::CadesBes);
            parameters.set_digest_algorithm(algorithm);

            let signed = service
                .sign_document(
                    &InMemoryDocument::new(b"versions".to_vec()),
                    &parameters,
                    &signing_key(),
                    signer_certificate(),
                    &[],
                )
                .unwrap();
            let signature = CadesSignature::parse(&signed).unwrap();
            let table = signature.signers()[0].signed_attributes();

            assert_eq!(table.contains(&OID_SIGNING_CERTIFICATE), v1);
            assert_eq!(table.contains(&OID_SIGNING_CERTIFICATE_V2), !v1);
            signature
                .signer(&signature.signers()[0])
                .verify_message_digest(b"versions")
                .unwrap();
        }
    }

    #[test]
    fn extended_validation_type_two() {
        let tsa = StubTsa::new();
        let source = Rfc3161TimestampSource::new(&tsa);
        let verifier = StaticCertificateVerifier::new(vec![]);
        let service = CadesService::new(
            Collaborators::new()
                .with_timestamp_source(&source)
                .with_certificate_verifier(&verifier),
        );

        let mut parameters = params(SignatureFormat::CadesX);
        parameters.set_extended_validation_type(2);

        let signed = service
            .sign_document(
                &InMemoryDocument::new(b"type two".to_vec()),
                &parameters,
                &signing_key(),
                signer_certificate(),
                &[],
            )
            .unwrap();
        let signature = CadesSignature::parse(&signed).unwrap();

        assert_eq!(
            attribute_types(&signature),
            oids(&[
                OID_SIGNATURE_TIME_STAMP_TOKEN,
                OID_CERTIFICATE_REFS,
                OID_REVOCATION_REFS,
                OID_CERT_CRL_TIMESTAMP,
            ])
        );

        let view = signature.signer(&signature.signers()[0]);
        let tokens = view.timestamps_x2().unwrap();
        assert!(tokens[0].matches_data(&view.timestamp_x2_data().unwrap()).unwrap());
    }

    #[test]
    fn configuration_errors_precede_io() {
        let tsa = StubTsa::new();
        let source = Rfc3161TimestampSource::new(&tsa);
        let service = CadesService::new(Collaborators::new().with_timestamp_source(&source));

        let mut parameters = params(SignatureFormat::CadesX);
        let err = service
            .sign_document(
                &InMemoryDocument::new(b"config".to_vec()),
                &parameters,
                &signing_key(),
                signer_certificate(),
                &[],
            )
            .unwrap_err();
        assert!(matches!(err, CadesError::MissingCertificateVerifier));
        assert!(err.is_configuration());

        parameters.set_format(SignatureFormat::CadesT);
        parameters.set_extended_validation_type(5);
        // X is not part of a T chain, so its type is not checked.
        service
            .sign_document(
                &InMemoryDocument::new(b"config".to_vec()),
                &parameters,
                &signing_key(),
                signer_certificate(),
                &[],
            )
            .unwrap();
        assert_eq!(tsa.request_count(), 1);

        let verifier = StaticCertificateVerifier::new(vec![]);
        let service = CadesService::new(
            Collaborators::new()
                .with_timestamp_source(&source)
                .with_certificate_verifier(&verifier),
        );
        parameters.set_format(SignatureFormat::CadesA);
        let err = service
            .extend_signatures(&sign_bes(b"x", DigestAlgorithm::Sha256), &parameters, None)
            .unwrap_err();
        assert!(matches!(err, CadesError::InvalidExtendedValidationType(5)));
        assert_eq!(tsa.request_count(), 1);
        assert!(verifier.validation_times().is_empty());
    }

    #[test]
    fn sibling_failure_does_not_abort() {
        let tsa = StubTsa::new();
        let source = Rfc3161TimestampSource::new(&tsa);
        let verifier = StaticCertificateVerifier::new(vec![]);
        let service = CadesService::new(
            Collaborators::new()
                .with_timestamp_source(&source)
                .with_certificate_verifier(&verifier),
        );

        let mut parameters = SignatureParameters::default();
        parameters.set_format(SignatureFormat::CadesXl);

        let output = service
            .extend_signatures(&sign_two_signers(b"two"), &parameters, None)
            .unwrap();

        assert!(matches!(
            output.outcomes[0],
            SignerOutcome::Extended {
                from: SignatureLevel::Bes,
                to: SignatureLevel::Xl
            }
        ));
        assert!(matches!(
            output.outcomes[1],
            SignerOutcome::Failed(CadesError::MissingSigningTime)
        ));

        let signature = CadesSignature::parse(&output.data).unwrap();
        assert_eq!(signature.signers()[0].unsigned_attributes().len(), 6);
        assert!(signature.signers()[1].unsigned_attributes().is_empty());
    }

    #[test]
    fn extend_single_signer() {
        let tsa = StubTsa::new();
        let source = Rfc3161TimestampSource::new(&tsa);
        let service = CadesService::new(Collaborators::new().with_timestamp_source(&source));

        let signed = sign_two_signers(b"single");
        let sid = CadesSignature::parse(&signed).unwrap().signers()[0].sid().clone();

        let output = service
            .extend_signer(&signed, &sid, &params(SignatureFormat::CadesT), None)
            .unwrap();
        let signature = CadesSignature::parse(&output.data).unwrap();

        assert_eq!(signature.signers()[0].unsigned_attributes().len(), 1);
        assert!(signature.signers()[1].unsigned_attributes().is_empty());
    }

    #[test]
    fn detached_archive_with_original_document() {
        let tsa = StubTsa::new();
        let source = Rfc3161TimestampSource::new(&tsa);
        let verifier = StaticCertificateVerifier::new(vec![]);
        let service = CadesService::new(
            Collaborators::new()
                .with_timestamp_source(&source)
                .with_certificate_verifier(&verifier),
        );

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"detached on disk").unwrap();
        let document = FileDocument::new(file.path());

        let mut bes = params(SignatureFormat::CadesBes);
        bes.set_packaging(SignaturePackaging::Detached);
        let signed = service
            .sign_document(&document, &bes, &signing_key(), signer_certificate(), &[])
            .unwrap();
        assert!(CadesSignature::parse(&signed)
            .unwrap()
            .encapsulated_content()
            .is_none());

        let mut a = params(SignatureFormat::CadesA);
        a.set_packaging(SignaturePackaging::Detached);

        // Without the document every stage up to A succeeds, then archive
        // data cannot be built and the signer stays as it was.
        let output = service.extend_signatures(&signed, &a, None).unwrap();
        assert!(matches!(
            output.outcomes[0],
            SignerOutcome::Failed(CadesError::DetachedContentMissing)
        ));
        assert_eq!(output.data, signed);

        let output = service
            .extend_signatures(&signed, &a, Some(&document as &dyn Document))
            .unwrap();
        let data = output.into_result().unwrap();

        let signature = CadesSignature::parse(&data).unwrap();
        let record = &signature.signers()[0];
        let view = signature.signer(record);
        assert_eq!(view.level(), SignatureLevel::A);

        let before_archive = record.with_unsigned_attributes(
            record
                .unsigned_attributes()
                .filtered(|_, attr| attr.typ != OID_ARCHIVE_TIMESTAMP_V2),
        );
        assert!(view.archive_timestamps().unwrap()[0]
            .matches_data(
                &signature
                    .signer(&before_archive)
                    .archive_timestamp_data(0, Some(b"detached on disk"))
                    .unwrap()
            )
            .unwrap());

        // The same extension through the one-step signing path.
        let signed = service
            .sign_document(&document, &a, &signing_key(), signer_certificate(), &[])
            .unwrap();
        let signature = CadesSignature::parse(&signed).unwrap();
        assert_eq!(
            signature.signer(&signature.signers()[0]).level(),
            SignatureLevel::A
        );
    }

    #[test]
    fn chain_is_embedded() {
        let service = CadesService::default();
        let intermediate = issue_certificate("Intermediate", 2);

        let signed = service
            .sign_document(
                &InMemoryDocument::new(b"chain".to_vec()),
                &params(SignatureFormat::CadesEpes),
                &signing_key(),
                signer_certificate(),
                &[intermediate.clone()],
            )
            .unwrap();

        let signature = CadesSignature::parse(&signed).unwrap();
        let certificates = signature.signer(&signature.signers()[0]).certificates().unwrap();
        assert!(certificates.contains(&intermediate));
        assert!(certificates.contains(&signer_certificate()));
        assert_eq!(
            signature.signed_data().certificates.as_ref().unwrap().0.len(),
            2
        );
    }
}
