// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Certificate validation collaborators.

Path building and revocation fetching are not done here. The C and XL
profile stages ask a [CertificateVerifier] for a [ValidationContext] and
read from it the certificates, CRLs and OCSP responses that a verifier
needs to validate the signing certificate at a point in time.
*/

use {
    crate::{
        certificate::{CapturedCertificate, CapturedCrl, CapturedOcspResponse},
        CadesError,
    },
    chrono::{DateTime, Utc},
    log::debug,
    std::sync::Mutex,
};

/// Validation material already present in a signature.
///
/// Handed to the verifier as additional sources next to whatever it can
/// find on its own.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ValidationSources {
    pub certificates: Vec<CapturedCertificate>,
    pub crls: Vec<CapturedCrl>,
    pub ocsp_responses: Vec<CapturedOcspResponse>,
}

/// The resolved material needed to validate a certificate.
pub trait ValidationContext {
    /// Every certificate on the validation path, in path order.
    ///
    /// The validated certificate itself may be among them.
    fn needed_certificates(&self) -> Vec<CapturedCertificate>;

    /// CRLs needed to establish the status of `certificate`.
    fn needed_crls_for(&self, certificate: &CapturedCertificate) -> Vec<CapturedCrl>;

    /// OCSP responses needed to establish the status of `certificate`.
    fn needed_ocsp_for(&self, certificate: &CapturedCertificate) -> Vec<CapturedOcspResponse>;

    /// All CRLs needed for the path.
    fn needed_crls(&self) -> Vec<CapturedCrl>;

    /// All OCSP responses needed for the path.
    fn needed_ocsp_responses(&self) -> Vec<CapturedOcspResponse>;
}

/// Resolves a [ValidationContext] for a certificate at a point in time.
pub trait CertificateVerifier {
    fn validate_certificate(
        &self,
        certificate: &CapturedCertificate,
        time: DateTime<Utc>,
        sources: &ValidationSources,
    ) -> Result<Box<dyn ValidationContext>, CadesError>;
}

impl<T: CertificateVerifier + ?Sized> CertificateVerifier for &T {
    fn validate_certificate(
        &self,
        certificate: &CapturedCertificate,
        time: DateTime<Utc>,
        sources: &ValidationSources,
    ) -> Result<Box<dyn ValidationContext>, CadesError> {
        (**self).validate_certificate(certificate, time, sources)
    }
}

fn push_unique<T: PartialEq + Clone>(target: &mut Vec<T>, value: &T) {
    if !target.contains(value) {
        target.push(value.clone());
    }
}

/// A [ValidationContext] over fixed data.
#[derive(Clone, Debug, Default)]
pub struct StaticValidationContext {
    certificates: Vec<CapturedCertificate>,
    crls: Vec<(CapturedCertificate, CapturedCrl)>,
    ocsp_responses: Vec<(CapturedCertificate, CapturedOcspResponse)>,
}

impl StaticValidationContext {
    pub fn new(certificates: Vec<CapturedCertificate>) -> Self {
        Self {
            certificates,
            ..Default::default()
        }
    }

    /// Record `crl` as the status source for `subject`.
    pub fn with_crl(mut self, subject: &CapturedCertificate, crl: CapturedCrl) -> Self {
        self.crls.push((subject.clone(), crl));
        self
    }

    /// Record `response` as the status source for `subject`.
    pub fn with_ocsp_response(
        mut self,
        subject: &CapturedCertificate,
        response: CapturedOcspResponse,
    ) -> Self {
        self.ocsp_responses.push((subject.clone(), response));
        self
    }
}

impl ValidationContext for StaticValidationContext {
    fn needed_certificates(&self) -> Vec<CapturedCertificate> {
        self.certificates.clone()
    }

    fn needed_crls_for(&self, certificate: &CapturedCertificate) -> Vec<CapturedCrl> {
        self.crls
            .iter()
            .filter(|(subject, _)| subject == certificate)
            .map(|(_, crl)| crl.clone())
            .collect()
    }

    fn needed_ocsp_for(&self, certificate: &CapturedCertificate) -> Vec<CapturedOcspResponse> {
        self.ocsp_responses
            .iter()
            .filter(|(subject, _)| subject == certificate)
            .map(|(_, response)| response.clone())
            .collect()
    }

    fn needed_crls(&self) -> Vec<CapturedCrl> {
        let mut crls = Vec::new();
        for (_, crl) in &self.crls {
            push_unique(&mut crls, crl);
        }

        crls
    }

    fn needed_ocsp_responses(&self) -> Vec<CapturedOcspResponse> {
        let mut responses = Vec::new();
        for (_, response) in &self.ocsp_responses {
            push_unique(&mut responses, response);
        }

        responses
    }
}

/// A [CertificateVerifier] that answers every request from one fixed chain.
///
/// The validated certificate is placed first, followed by the configured
/// chain in order. Revocation data is looked up by subject certificate.
#[derive(Debug, Default)]
pub struct StaticCertificateVerifier {
    template: StaticValidationContext,
    times: Mutex<Vec<DateTime<Utc>>>,
}

impl StaticCertificateVerifier {
    pub fn new(chain: Vec<CapturedCertificate>) -> Self {
        Self {
            template: StaticValidationContext::new(chain),
            times: Mutex::new(vec![]),
        }
    }

    pub fn with_crl(mut self, subject: &CapturedCertificate, crl: CapturedCrl) -> Self {
        self.template = self.template.with_crl(subject, crl);
        self
    }

    pub fn with_ocsp_response(
        mut self,
        subject: &CapturedCertificate,
        response: CapturedOcspResponse,
    ) -> Self {
        self.template = self.template.with_ocsp_response(subject, response);
        self
    }

    /// The validation times requested so far.
    pub fn validation_times(&self) -> Vec<DateTime<Utc>> {
        self.times
            .lock()
            .map(|times| times.clone())
            .unwrap_or_default()
    }
}

impl CertificateVerifier for StaticCertificateVerifier {
    fn validate_certificate(
        &self,
        certificate: &CapturedCertificate,
        time: DateTime<Utc>,
        sources: &ValidationSources,
    ) -> Result<Box<dyn ValidationContext>, CadesError> {
        debug!(
            "static validation at {} with {} extra certificates",
            time,
            sources.certificates.len()
        );

        if let Ok(mut times) = self.times.lock() {
            times.push(time);
        }

        let mut certificates = vec![certificate.clone()];
        for cert in &self.template.certificates {
            push_unique(&mut certificates, cert);
        }

        Ok(Box::new(StaticValidationContext {
            certificates,
            ..self.template.clone()
        }))
    }
}
