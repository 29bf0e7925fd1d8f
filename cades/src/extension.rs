// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Extending every signer of a container.

[SignatureExtensionDriver] runs a chain of profile stages over the
signers of a [CadesSignature] and re-assembles the container. Failures are
isolated per signer: a signer that cannot be extended is carried through
unchanged and reported in the [ExtensionOutput], and its siblings are
still processed.

Configuration problems, such as a stage needing a collaborator that is not
available, are detected when the driver is constructed and never reach
the per-signer loop.
*/

use {
    crate::{
        asn1::{rfc5126::OID_ARCHIVE_TIMESTAMP_V2, rfc5652::SignerIdentifier},
        profile::{extension_stages, Collaborators, ExtensionContext, ProfileStage},
        settings::{ExtensionGuard, SignatureParameters},
        signature::SignatureLevel,
        signer::SignerRecord,
        CadesError, CadesSignature,
    },
    log::{debug, info, warn},
};

/// What happened to one signer.
#[derive(Debug)]
pub enum SignerOutcome {
    /// The stages ran. `from` and `to` are the detected levels before and
    /// after.
    Extended {
        from: SignatureLevel,
        to: SignatureLevel,
    },
    /// The extension guard decided the signer was already extended.
    Skipped { reason: String },
    /// A stage failed. The signer was left as it was.
    Failed(CadesError),
}

impl SignerOutcome {
    pub fn is_extended(&self) -> bool {
        matches!(self, Self::Extended { .. })
    }
}

/// A re-assembled container and the outcome for each signer processed.
#[derive(Debug)]
pub struct ExtensionOutput {
    /// DER of the `ContentInfo`.
    pub data: Vec<u8>,
    /// One entry per processed top-level signer, in container order.
    pub outcomes: Vec<SignerOutcome>,
}

impl ExtensionOutput {
    /// The container, or the first signer failure.
    pub fn into_result(self) -> Result<Vec<u8>, CadesError> {
        for outcome in self.outcomes {
            if let SignerOutcome::Failed(e) = outcome {
                return Err(e);
            }
        }

        Ok(self.data)
    }
}

/// Applies a stage chain to the signers of containers.
pub struct SignatureExtensionDriver<'a> {
    parameters: &'a SignatureParameters,
    collaborators: Collaborators<'a>,
    stages: Vec<Box<dyn ProfileStage>>,
}

impl<'a> SignatureExtensionDriver<'a> {
    /// Construct a driver extending to the format in `parameters`.
    ///
    /// Every stage of the chain is checked here.
    pub fn new(
        parameters: &'a SignatureParameters,
        collaborators: Collaborators<'a>,
    ) -> Result<Self, CadesError> {
        parameters.ensure_packaging()?;

        let stages = extension_stages(parameters.format());
        for stage in &stages {
            stage.check(parameters, &collaborators)?;
        }

        debug!(
            "extension chain to {} has {} stages",
            parameters.format(),
            stages.len()
        );

        Ok(Self {
            parameters,
            collaborators,
            stages,
        })
    }

    pub fn stages(&self) -> &[Box<dyn ProfileStage>] {
        &self.stages
    }

    /// Extend every signer of `signature`.
    ///
    /// `original` is the signed content of a detached signature.
    pub fn extend_all(&self, signature: &CadesSignature, original: Option<&[u8]>) -> ExtensionOutput {
        let (signers, outcomes): (Vec<_>, Vec<_>) = signature
            .signers()
            .iter()
            .map(|record| self.extend_record(signature, record, false, original))
            .unzip();

        ExtensionOutput {
            data: signature.with_signers(signers).to_der(),
            outcomes,
        }
    }

    /// Extend the signer identified by `sid`, leaving the others untouched.
    pub fn extend_one(
        &self,
        signature: &CadesSignature,
        sid: &SignerIdentifier,
        original: Option<&[u8]>,
    ) -> Result<ExtensionOutput, CadesError> {
        let index = signature
            .find_signer(sid)
            .ok_or(CadesError::SignerNotFound)?;

        let mut signers = signature.signers().to_vec();
        let (record, outcome) = self.extend_record(signature, &signers[index], false, original);
        signers[index] = record;

        Ok(ExtensionOutput {
            data: signature.with_signers(signers).to_der(),
            outcomes: vec![outcome],
        })
    }

    /// The stages to run for a signer at `level`, or why it is skipped.
    fn pending_stages(
        &self,
        record: &SignerRecord,
        level: SignatureLevel,
    ) -> Result<Vec<&dyn ProfileStage>, String> {
        match self.parameters.extension_guard() {
            ExtensionGuard::UnsignedAttributeCount => {
                let count = record.unsigned_attributes().len();

                if count > 0 {
                    Err(format!("signer already has {} unsigned attributes", count))
                } else {
                    Ok(self.stages.iter().map(|stage| stage.as_ref()).collect())
                }
            }
            ExtensionGuard::SignatureLevel => {
                let stages = self
                    .stages
                    .iter()
                    .map(|stage| stage.as_ref())
                    .filter(|stage| stage.level() > level || stage.level() == SignatureLevel::A)
                    .collect::<Vec<_>>();

                if stages.is_empty() && !self.stages.is_empty() {
                    Err(format!("signer is already at level {:?}", level))
                } else {
                    Ok(stages)
                }
            }
        }
    }

    fn extend_record(
        &self,
        signature: &CadesSignature,
        record: &SignerRecord,
        counter_signature: bool,
        original: Option<&[u8]>,
    ) -> (SignerRecord, SignerOutcome) {
        let context = ExtensionContext {
            parameters: self.parameters,
            collaborators: self.collaborators,
            signature,
            counter_signature,
            original,
        };
        let from = context.view(record).level();

        let stages = match self.pending_stages(record, from) {
            Ok(stages) => stages,
            Err(reason) => {
                warn!("skipping signer: {}", reason);
                return (record.clone(), SignerOutcome::Skipped { reason });
            }
        };

        match self.apply_stages(record, &stages, &context) {
            Ok(extended) => {
                let to = context.view(&extended).level();
                info!("signer extended from {:?} to {:?}", from, to);

                (extended, SignerOutcome::Extended { from, to })
            }
            Err(e) => {
                warn!("signer left unextended: {}", e);

                (record.clone(), SignerOutcome::Failed(e))
            }
        }
    }

    fn apply_stages(
        &self,
        record: &SignerRecord,
        stages: &[&dyn ProfileStage],
        context: &ExtensionContext,
    ) -> Result<SignerRecord, CadesError> {
        let mut current = record.clone();

        // Counter-signers sign our signature value, which no stage alters.
        // Once an archive time-stamp covers their attributes they are frozen.
        let counter_signatures = if record
            .unsigned_attributes()
            .contains(&OID_ARCHIVE_TIMESTAMP_V2)
        {
            debug!("counter-signatures are archived, leaving them as they are");
            vec![]
        } else {
            record.counter_signatures()?
        };

        for (index, counter_signers) in counter_signatures {
            let extended = counter_signers
                .iter()
                .map(|counter_signer| {
                    let (extended, outcome) = self.extend_record(
                        context.signature,
                        counter_signer,
                        true,
                        Some(record.signature_value()),
                    );
                    debug!("counter-signature: {:?}", outcome);

                    extended
                })
                .collect::<Vec<_>>();

            current = current.with_counter_signatures(index, &extended);
        }

        for stage in stages {
            debug!("applying {}", stage.format());
            current = stage.apply(&current, context)?;
        }

        Ok(current)
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{
            algorithm::DigestAlgorithm,
            asn1::{rfc5126::OID_SIGNATURE_TIME_STAMP_TOKEN, rfc5652::OID_COUNTER_SIGNATURE},
            settings::SignatureFormat,
            testutil::*,
            timestamp::Rfc3161TimestampSource,
            validation::StaticCertificateVerifier,
        },
    };

    fn params(format: SignatureFormat) -> SignatureParameters {
        let mut params = SignatureParameters::default();
        params.set_format(format);
        params
    }

    #[test]
    fn configuration_errors_come_first() {
        let tsa = StubTsa::new();
        let source = Rfc3161TimestampSource::new(&tsa);

        let t = params(SignatureFormat::CadesT);
        assert!(matches!(
            SignatureExtensionDriver::new(&t, Collaborators::new()),
            Err(CadesError::MissingTimestampSource)
        ));

        // C needs a verifier even though T is satisfied.
        let c = params(SignatureFormat::CadesC);
        assert!(matches!(
            SignatureExtensionDriver::new(&c, Collaborators::new().with_timestamp_source(&source)),
            Err(CadesError::MissingCertificateVerifier)
        ));

        let mut enveloped = params(SignatureFormat::CadesBes);
        enveloped.set_packaging(crate::settings::SignaturePackaging::Enveloped);
        assert!(matches!(
            SignatureExtensionDriver::new(&enveloped, Collaborators::new()),
            Err(CadesError::UnsupportedPackaging(_))
        ));

        assert_eq!(tsa.request_count(), 0);
    }

    #[test]
    fn bes_chain_is_empty() {
        let bes = params(SignatureFormat::CadesBes);
        let driver = SignatureExtensionDriver::new(&bes, Collaborators::new()).unwrap();
        assert!(driver.stages().is_empty());

        let signed = sign_bes(b"nothing to do", DigestAlgorithm::Sha256);
        let signature = CadesSignature::parse(&signed).unwrap();
        let output = driver.extend_all(&signature, None);

        assert_eq!(output.data, signed);
        assert!(matches!(
            &output.outcomes[..],
            [SignerOutcome::Extended {
                from: SignatureLevel::Bes,
                to: SignatureLevel::Bes
            }]
        ));
    }

    #[test]
    fn default_guard_skips_extended_signers() {
        let tsa = StubTsa::new();
        let source = Rfc3161TimestampSource::new(&tsa);
        let t = params(SignatureFormat::CadesT);
        let driver =
            SignatureExtensionDriver::new(&t, Collaborators::new().with_timestamp_source(&source))
                .unwrap();

        let signed = sign_bes(b"once", DigestAlgorithm::Sha256);
        let first = driver.extend_all(&CadesSignature::parse(&signed).unwrap(), None);
        assert!(first.outcomes[0].is_extended());

        let second = driver.extend_all(&CadesSignature::parse(&first.data).unwrap(), None);
        assert!(matches!(second.outcomes[0], SignerOutcome::Skipped { .. }));
        assert_eq!(second.data, first.data);
        assert_eq!(tsa.request_count(), 1);
    }

    #[test]
    fn level_guard_only_runs_missing_stages() {
        let tsa = StubTsa::new();
        let source = Rfc3161TimestampSource::new(&tsa);
        let verifier = StaticCertificateVerifier::new(vec![]);
        let collaborators = Collaborators::new()
            .with_timestamp_source(&source)
            .with_certificate_verifier(&verifier);

        let signed = sign_bes(b"levels", DigestAlgorithm::Sha256);

        let mut t = params(SignatureFormat::CadesT);
        t.set_extension_guard(ExtensionGuard::SignatureLevel);
        let at_t = SignatureExtensionDriver::new(&t, collaborators)
            .unwrap()
            .extend_all(&CadesSignature::parse(&signed).unwrap(), None);

        // Already at T.
        let again = SignatureExtensionDriver::new(&t, collaborators)
            .unwrap()
            .extend_all(&CadesSignature::parse(&at_t.data).unwrap(), None);
        assert!(matches!(again.outcomes[0], SignerOutcome::Skipped { .. }));

        let mut a = params(SignatureFormat::CadesA);
        a.set_extension_guard(ExtensionGuard::SignatureLevel);
        let driver = SignatureExtensionDriver::new(&a, collaborators).unwrap();

        let at_a = driver.extend_all(&CadesSignature::parse(&at_t.data).unwrap(), None);
        assert!(matches!(
            at_a.outcomes[0],
            SignerOutcome::Extended {
                from: SignatureLevel::T,
                to: SignatureLevel::A
            }
        ));

        let signature = CadesSignature::parse(&at_a.data).unwrap();
        let unsigned = signature.signers()[0].unsigned_attributes();
        assert_eq!(unsigned.count(&OID_SIGNATURE_TIME_STAMP_TOKEN), 1);
        assert_eq!(unsigned.count(&OID_ARCHIVE_TIMESTAMP_V2), 1);

        // Archive time-stamps are renewed, nothing else is repeated.
        let renewed = driver.extend_all(&signature, None);
        let signature = CadesSignature::parse(&renewed.data).unwrap();
        let unsigned = signature.signers()[0].unsigned_attributes();
        assert_eq!(unsigned.count(&OID_SIGNATURE_TIME_STAMP_TOKEN), 1);
        assert_eq!(unsigned.count(&OID_ARCHIVE_TIMESTAMP_V2), 2);
    }

    #[test]
    fn failures_are_isolated_per_signer() {
        let tsa = StubTsa::new();
        let source = Rfc3161TimestampSource::new(&tsa);
        let verifier = StaticCertificateVerifier::new(vec![]);
        let collaborators = Collaborators::new()
            .with_timestamp_source(&source)
            .with_certificate_verifier(&verifier);

        // The second signer has no signing time and the parameters have no
        // signing date, so its references cannot be computed.
        let signed = sign_two_signers(b"siblings");
        let signature = CadesSignature::parse(&signed).unwrap();

        let c = params(SignatureFormat::CadesC);
        let output = SignatureExtensionDriver::new(&c, collaborators)
            .unwrap()
            .extend_all(&signature, None);

        assert!(output.outcomes[0].is_extended());
        assert!(matches!(
            output.outcomes[1],
            SignerOutcome::Failed(CadesError::MissingSigningTime)
        ));

        let extended = CadesSignature::parse(&output.data).unwrap();
        assert_eq!(extended.signers()[0].unsigned_attributes().len(), 3);
        assert_eq!(extended.signers()[1], signature.signers()[1]);

        assert!(matches!(
            output.into_result(),
            Err(CadesError::MissingSigningTime)
        ));
    }

    #[test]
    fn extend_one_targets_a_single_signer() {
        let tsa = StubTsa::new();
        let source = Rfc3161TimestampSource::new(&tsa);
        let t = params(SignatureFormat::CadesT);
        let driver =
            SignatureExtensionDriver::new(&t, Collaborators::new().with_timestamp_source(&source))
                .unwrap();

        let signed = sign_two_signers(b"pick one");
        let signature = CadesSignature::parse(&signed).unwrap();
        let sid = signature.signers()[1].sid().clone();

        let output = driver.extend_one(&signature, &sid, None).unwrap();
        assert_eq!(output.outcomes.len(), 1);

        let extended = CadesSignature::parse(&output.data).unwrap();
        assert!(extended.signers()[0].unsigned_attributes().is_empty());
        assert_eq!(extended.signers()[1].unsigned_attributes().len(), 1);

        let unknown = issue_certificate("Nobody", 77).issuer_and_serial_number();
        assert!(matches!(
            driver.extend_one(
                &signature,
                &SignerIdentifier::IssuerAndSerialNumber(unknown),
                None
            ),
            Err(CadesError::SignerNotFound)
        ));
    }

    #[test]
    fn counter_signatures_are_extended_first() {
        let tsa = StubTsa::new();
        let source = Rfc3161TimestampSource::new(&tsa);
        let mut t = params(SignatureFormat::CadesT);
        t.set_extension_guard(ExtensionGuard::SignatureLevel);
        let driver =
            SignatureExtensionDriver::new(&t, Collaborators::new().with_timestamp_source(&source))
                .unwrap();

        let signed = counter_sign(&sign_bes(b"countersigned", DigestAlgorithm::Sha256));
        let signature = CadesSignature::parse(&signed).unwrap();

        let output = driver.extend_all(&signature, None);
        assert!(output.outcomes[0].is_extended());

        let extended = CadesSignature::parse(&output.data).unwrap();
        let parent = &extended.signers()[0];
        let counter_signers = parent.counter_signatures().unwrap();
        assert_eq!(counter_signers.len(), 1);

        let counter_signer = &counter_signers[0].1[0];
        let view = extended.counter_signer(counter_signer);
        let tokens = view.signature_timestamps().unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0]
            .matches_data(counter_signer.signature_value())
            .unwrap());
        view.verify_message_digest(parent.signature_value()).unwrap();

        // The parent time-stamp was requested after the counter-signature's.
        let parent_tokens = extended.signer(parent).signature_timestamps().unwrap();
        assert!(parent_tokens[0].generation_time() > tokens[0].generation_time());
        assert_eq!(tsa.request_count(), 2);
    }

    #[test]
    fn archive_renewal_leaves_counter_signatures_alone() {
        let tsa = StubTsa::new();
        let source = Rfc3161TimestampSource::new(&tsa);
        let verifier = StaticCertificateVerifier::new(vec![]);
        let collaborators = Collaborators::new()
            .with_timestamp_source(&source)
            .with_certificate_verifier(&verifier);

        let mut a = params(SignatureFormat::CadesA);
        a.set_extension_guard(ExtensionGuard::SignatureLevel);
        let driver = SignatureExtensionDriver::new(&a, collaborators).unwrap();

        let signed = counter_sign(&sign_bes(b"archived", DigestAlgorithm::Sha256));
        let first = driver
            .extend_all(&CadesSignature::parse(&signed).unwrap(), None)
            .into_result()
            .unwrap();
        let first = CadesSignature::parse(&first).unwrap();
        let requests = tsa.request_count();

        let output = driver.extend_all(&first, None);
        assert!(matches!(
            &output.outcomes[..],
            [SignerOutcome::Extended {
                from: SignatureLevel::A,
                to: SignatureLevel::A
            }]
        ));
        // Only the parent was time-stamped again.
        assert_eq!(tsa.request_count(), requests + 1);

        let renewed = CadesSignature::parse(&output.data).unwrap();
        let before = &first.signers()[0];
        let after = &renewed.signers()[0];
        assert_eq!(
            after.unsigned_attributes().get(&OID_COUNTER_SIGNATURE),
            before.unsigned_attributes().get(&OID_COUNTER_SIGNATURE)
        );

        let counter_signer = &after.counter_signatures().unwrap()[0].1[0];
        assert_eq!(
            renewed
                .counter_signer(counter_signer)
                .archive_timestamps()
                .unwrap()
                .len(),
            1
        );

        // The earlier archive time-stamp still covers the renewed signer.
        let view = renewed.signer(after);
        let tokens = view.archive_timestamps().unwrap();
        assert_eq!(tokens.len(), 2);
        assert!(tokens[0]
            .matches_data(&view.archive_timestamp_data(0, None).unwrap())
            .unwrap());
    }
}
