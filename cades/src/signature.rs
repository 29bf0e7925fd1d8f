// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Parsed CAdES signatures.

[CadesSignature] is a parsed `SignedData` split into [SignerRecord]s.
[SignerView] joins one record with its container and answers the
questions the profile stages and verifiers ask: which certificate signed,
when, under which policy, which time-stamps are attached, and exactly
which bytes each of those time-stamps covers.
*/

use {
    crate::{
        algorithm::verification_algorithm,
        archive::ArchiveDataBuilder,
        asn1::{
            common::{RawValue, Time, Utf8Value},
            rfc5126::{
                CertificateValues, RevocationValues, SignaturePolicyIdentifier, SignerAttribute,
                OID_ARCHIVE_TIMESTAMP_V2, OID_CERTIFICATE_REFS, OID_CERT_CRL_TIMESTAMP,
                OID_CERT_VALUES, OID_ESC_TIME_STAMP, OID_REVOCATION_REFS, OID_REVOCATION_VALUES,
                OID_SIGNATURE_TIME_STAMP_TOKEN, OID_SIG_POLICY_ID, OID_SIGNER_ATTR,
            },
            rfc5280::OID_COMMON_NAME,
            rfc5652::{
                Attribute, ContentInfo, SignedData, SignerIdentifier, SignerInfos,
                OID_ID_SIGNED_DATA, OID_MESSAGE_DIGEST, OID_SIGNING_TIME,
            },
        },
        attributes::AttributeTable,
        certificate::{CapturedCertificate, CapturedCrl, CapturedOcspResponse},
        settings::SignatureFormat,
        signer::SignerRecord,
        timestamp::{TimestampToken, TimestampType},
        validation::ValidationSources,
        CadesError,
    },
    bcder::{decode::Constructed, ConstOid, Mode, OctetString},
    bytes::Bytes,
    chrono::{DateTime, Utc},
    ring::signature::UnparsedPublicKey,
};

/// The CAdES level a signature structurally reaches.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum SignatureLevel {
    Bes,
    Epes,
    T,
    C,
    X,
    Xl,
    A,
}

impl From<SignatureFormat> for SignatureLevel {
    fn from(format: SignatureFormat) -> Self {
        match format {
            SignatureFormat::CadesBes => Self::Bes,
            SignatureFormat::CadesEpes => Self::Epes,
            SignatureFormat::CadesT => Self::T,
            SignatureFormat::CadesC => Self::C,
            SignatureFormat::CadesX => Self::X,
            SignatureFormat::CadesXl => Self::Xl,
            SignatureFormat::CadesA => Self::A,
        }
    }
}

/// A parsed CMS `SignedData` carrying CAdES signers.
#[derive(Clone, Debug)]
pub struct CadesSignature {
    signed_data: SignedData,
    signers: Vec<SignerRecord>,
}

impl CadesSignature {
    /// Parse the BER of a `ContentInfo` holding a `SignedData`.
    pub fn parse(data: &[u8]) -> Result<Self, CadesError> {
        let content_info =
            Constructed::decode(data, Mode::Ber, |cons| ContentInfo::take_from(cons))?;

        if content_info.content_type != OID_ID_SIGNED_DATA {
            return Err(CadesError::NotSignedData);
        }

        let signed_data = Constructed::decode(content_info.content.as_slice(), Mode::Ber, |cons| {
            SignedData::take_from(cons)
        })?;

        Ok(Self::from_signed_data(signed_data))
    }

    pub fn from_signed_data(signed_data: SignedData) -> Self {
        let signers = signed_data
            .signer_infos
            .0
            .iter()
            .map(SignerRecord::from_signer_info)
            .collect();

        Self {
            signed_data,
            signers,
        }
    }

    pub fn signed_data(&self) -> &SignedData {
        &self.signed_data
    }

    pub fn signers(&self) -> &[SignerRecord] {
        &self.signers
    }

    /// The encapsulated content, if the signature is not detached.
    pub fn encapsulated_content(&self) -> Option<Bytes> {
        self.signed_data
            .content_info
            .content
            .as_ref()
            .map(|content| content.to_bytes())
    }

    /// Index of the signer identified by `sid`.
    pub fn find_signer(&self, sid: &SignerIdentifier) -> Option<usize> {
        self.signers.iter().position(|signer| signer.sid() == sid)
    }

    /// A view of a top-level signer of this container.
    pub fn signer<'a>(&'a self, record: &'a SignerRecord) -> SignerView<'a> {
        SignerView {
            signature: self,
            record,
            counter_signature: false,
        }
    }

    /// A view of a counter-signer nested somewhere in this container.
    ///
    /// Counter-signatures sign another signature value, not the
    /// encapsulated content.
    pub fn counter_signer<'a>(&'a self, record: &'a SignerRecord) -> SignerView<'a> {
        SignerView {
            signature: self,
            record,
            counter_signature: true,
        }
    }

    /// The same container carrying `signers` instead.
    pub fn with_signers(&self, signers: Vec<SignerRecord>) -> Self {
        let mut signed_data = self.signed_data.clone();
        signed_data.signer_infos =
            SignerInfos(signers.iter().map(|signer| signer.to_signer_info()).collect());

        Self {
            signed_data,
            signers,
        }
    }

    /// DER of the `ContentInfo`.
    pub fn to_der(&self) -> Vec<u8> {
        RawValue::from_values(self.signed_data.encode_content_info())
            .as_slice()
            .to_vec()
    }
}

/// One signer seen together with its container.
#[derive(Clone, Copy, Debug)]
pub struct SignerView<'a> {
    signature: &'a CadesSignature,
    record: &'a SignerRecord,
    counter_signature: bool,
}

impl<'a> SignerView<'a> {
    pub fn record(&self) -> &'a SignerRecord {
        self.record
    }

    pub fn container(&self) -> &'a CadesSignature {
        self.signature
    }

    pub fn is_counter_signature(&self) -> bool {
        self.counter_signature
    }

    /// Certificates available to this signer.
    ///
    /// Those in the `SignedData` come first, followed by any carried in a
    /// certValues attribute.
    pub fn certificates(&self) -> Result<Vec<CapturedCertificate>, CadesError> {
        let mut certs: Vec<CapturedCertificate> = Vec::new();

        for choice in self
            .signature
            .signed_data
            .certificates
            .iter()
            .flat_map(|set| set.0.iter())
            // Other certificate formats are tagged.
            .filter(|choice| choice.tag_byte() == 0x30)
        {
            let cert = CapturedCertificate::from_raw(choice.clone())?;
            if !certs.contains(&cert) {
                certs.push(cert);
            }
        }

        for attr in self.record.unsigned_attributes().get_all(&OID_CERT_VALUES) {
            for value in &attr.values {
                let values = Constructed::decode(value.as_slice(), Mode::Der, |cons| {
                    CertificateValues::take_from(cons)
                })
                .map_err(|_| CadesError::MalformedAttribute("certValues"))?;

                for raw in values.0 {
                    let cert = CapturedCertificate::from_raw(raw)?;
                    if !certs.contains(&cert) {
                        certs.push(cert);
                    }
                }
            }
        }

        Ok(certs)
    }

    fn revocation_values(&self) -> Result<Vec<RevocationValues>, CadesError> {
        self.record
            .unsigned_attributes()
            .get_all(&OID_REVOCATION_VALUES)
            .flat_map(|attr| attr.values.iter())
            .map(|value| {
                Constructed::decode(value.as_slice(), Mode::Der, |cons| {
                    RevocationValues::take_from(cons)
                })
                .map_err(|_| CadesError::MalformedAttribute("revocationValues"))
            })
            .collect()
    }

    /// CRLs embedded in the `SignedData` or a revocationValues attribute.
    pub fn crls(&self) -> Result<Vec<CapturedCrl>, CadesError> {
        let mut crls: Vec<CapturedCrl> = Vec::new();

        let embedded = self
            .signature
            .signed_data
            .crls
            .iter()
            .flat_map(|choices| choices.0.iter())
            .filter(|choice| choice.tag_byte() == 0x30)
            .cloned();
        let attached = self
            .revocation_values()?
            .into_iter()
            .flat_map(|values| values.crl_vals.unwrap_or_default());

        for raw in embedded.chain(attached) {
            let crl = CapturedCrl::from_raw(raw)?;
            if !crls.contains(&crl) {
                crls.push(crl);
            }
        }

        Ok(crls)
    }

    /// OCSP responses embedded in the `SignedData` or a revocationValues
    /// attribute.
    pub fn ocsp_responses(&self) -> Result<Vec<CapturedOcspResponse>, CadesError> {
        let mut responses: Vec<CapturedOcspResponse> = Vec::new();

        for choice in self
            .signature
            .signed_data
            .crls
            .iter()
            .flat_map(|choices| choices.0.iter())
            .filter(|choice| choice.tag_byte() == 0xa1)
        {
            if let Some(response) = CapturedOcspResponse::from_revocation_info_choice(choice)? {
                if !responses.contains(&response) {
                    responses.push(response);
                }
            }
        }

        for values in self.revocation_values()? {
            for raw in values.ocsp_vals.unwrap_or_default() {
                let response = CapturedOcspResponse::from_raw(raw)?;
                if !responses.contains(&response) {
                    responses.push(response);
                }
            }
        }

        Ok(responses)
    }

    /// Everything this signature already carries, for handing to a verifier.
    pub fn validation_sources(&self) -> Result<ValidationSources, CadesError> {
        Ok(ValidationSources {
            certificates: self.certificates()?,
            crls: self.crls()?,
            ocsp_responses: self.ocsp_responses()?,
        })
    }

    /// The certificate the signer identifier points at.
    pub fn signing_certificate(&self) -> Result<CapturedCertificate, CadesError> {
        self.certificates()?
            .into_iter()
            .find(|cert| cert.matches_signer(self.record.sid()))
            .ok_or(CadesError::SigningCertificateNotFound)
    }

    /// The signing-time signed attribute.
    pub fn signing_time(&self) -> Result<Option<DateTime<Utc>>, CadesError> {
        self.record
            .signed_attributes()
            .first_value(&OID_SIGNING_TIME)
            .map(|value| {
                Constructed::decode(value.as_slice(), Mode::Der, |cons| Time::take_from(cons))
                    .map(|time| *time.as_ref())
                    .map_err(|_| CadesError::MalformedAttribute("signing-time"))
            })
            .transpose()
    }

    /// The signature policy the signer committed to.
    pub fn policy_id(&self) -> Result<Option<SignaturePolicyIdentifier>, CadesError> {
        self.record
            .signed_attributes()
            .first_value(&OID_SIG_POLICY_ID)
            .map(|value| {
                Constructed::decode(value.as_slice(), Mode::Der, |cons| {
                    SignaturePolicyIdentifier::take_from(cons)
                })
                .map_err(|_| CadesError::MalformedAttribute("sigPolicyId"))
            })
            .transpose()
    }

    /// The roles claimed in a signer-attributes attribute.
    ///
    /// Only roles expressed as UTF8String values are returned.
    pub fn claimed_roles(&self) -> Result<Vec<String>, CadesError> {
        let value = match self.record.signed_attributes().first_value(&OID_SIGNER_ATTR) {
            Some(value) => value,
            None => return Ok(vec![]),
        };

        let signer_attribute = Constructed::decode(value.as_slice(), Mode::Der, |cons| {
            SignerAttribute::take_from(cons)
        })
        .map_err(|_| CadesError::MalformedAttribute("signerAttr"))?;

        let mut roles = vec![];
        for claimed in &signer_attribute.claimed_attributes {
            let attribute = Constructed::decode(claimed.as_slice(), Mode::Der, |cons| {
                Attribute::take_from(cons)
            })
            .map_err(|_| CadesError::MalformedAttribute("signerAttr"))?;

            if attribute.typ != OID_COMMON_NAME {
                continue;
            }

            for value in &attribute.values {
                if let Ok(role) =
                    Constructed::decode(value.as_slice(), Mode::Der, |cons| Utf8Value::take_from(cons))
                {
                    roles.push(role.into_string());
                }
            }
        }

        Ok(roles)
    }

    fn timestamps_in(
        &self,
        table: &AttributeTable,
        oid: &ConstOid,
        typ: TimestampType,
    ) -> Result<Vec<TimestampToken>, CadesError> {
        table
            .get_all(oid)
            .flat_map(|attr| attr.values.iter())
            .map(|value| TimestampToken::from_raw(value.clone(), typ))
            .collect()
    }

    fn unsigned_timestamps(&self, typ: TimestampType) -> Result<Vec<TimestampToken>, CadesError> {
        self.timestamps_in(self.record.unsigned_attributes(), &typ.attribute_oid(), typ)
    }

    /// Time-stamps over the content, taken before signing.
    pub fn content_timestamps(&self) -> Result<Vec<TimestampToken>, CadesError> {
        let typ = TimestampType::ContentTimestamp;

        self.timestamps_in(self.record.signed_attributes(), &typ.attribute_oid(), typ)
    }

    pub fn signature_timestamps(&self) -> Result<Vec<TimestampToken>, CadesError> {
        self.unsigned_timestamps(TimestampType::SignatureTimestamp)
    }

    /// escTimeStamp tokens.
    pub fn timestamps_x1(&self) -> Result<Vec<TimestampToken>, CadesError> {
        self.unsigned_timestamps(TimestampType::ValidationDataFull)
    }

    /// certCrlTimestamp tokens.
    pub fn timestamps_x2(&self) -> Result<Vec<TimestampToken>, CadesError> {
        self.unsigned_timestamps(TimestampType::ValidationDataRefsOnly)
    }

    pub fn archive_timestamps(&self) -> Result<Vec<TimestampToken>, CadesError> {
        self.unsigned_timestamps(TimestampType::ArchiveTimestamp)
    }

    /// Bytes covered by a signature time-stamp: the signature value.
    pub fn signature_timestamp_data(&self) -> Vec<u8> {
        self.record.signature_value().to_vec()
    }

    fn unsigned_attribute_der(
        &self,
        oid: &ConstOid,
        name: &'static str,
    ) -> Result<Vec<u8>, CadesError> {
        self.record
            .unsigned_attributes()
            .get(oid)
            .map(|attr| attr.type_and_values_der())
            .ok_or(CadesError::MissingUnsignedAttribute(name))
    }

    /// Bytes covered by an escTimeStamp.
    ///
    /// The signature value, then type and values of the signature time-stamp,
    /// complete certificate references and complete revocation references
    /// attributes.
    pub fn timestamp_x1_data(&self) -> Result<Vec<u8>, CadesError> {
        let mut data = self.signature_timestamp_data();
        data.extend(self.unsigned_attribute_der(
            &OID_SIGNATURE_TIME_STAMP_TOKEN,
            "signatureTimeStampToken",
        )?);
        data.extend(self.timestamp_x2_data()?);

        Ok(data)
    }

    /// Bytes covered by a certCrlTimestamp: type and values of the complete
    /// certificate and revocation references attributes.
    pub fn timestamp_x2_data(&self) -> Result<Vec<u8>, CadesError> {
        let mut data = self.unsigned_attribute_der(&OID_CERTIFICATE_REFS, "certificateRefs")?;
        data.extend(self.unsigned_attribute_der(&OID_REVOCATION_REFS, "revocationRefs")?);

        Ok(data)
    }

    /// Bytes covered by an archive time-stamp.
    ///
    /// `keep` is how many of the most recent existing archive time-stamps
    /// stay in the covered attributes. `original` is the signed content
    /// when it is not encapsulated.
    pub fn archive_timestamp_data(
        &self,
        keep: usize,
        original: Option<&[u8]>,
    ) -> Result<Vec<u8>, CadesError> {
        self.archive_data_builder(original).build(keep)
    }

    pub fn archive_data_builder<'b>(&'b self, original: Option<&'b [u8]>) -> ArchiveDataBuilder<'b> {
        let builder = ArchiveDataBuilder::new(&self.signature.signed_data, self.record)
            .original_document(original);

        if self.counter_signature {
            builder.ignore_encapsulated_content()
        } else {
            builder
        }
    }

    /// The highest CAdES level the attributes of this signer satisfy.
    pub fn level(&self) -> SignatureLevel {
        let unsigned = self.record.unsigned_attributes();

        if unsigned.contains(&OID_ARCHIVE_TIMESTAMP_V2) {
            SignatureLevel::A
        } else if unsigned.contains(&OID_CERT_VALUES) || unsigned.contains(&OID_REVOCATION_VALUES) {
            SignatureLevel::Xl
        } else if unsigned.contains(&OID_ESC_TIME_STAMP) || unsigned.contains(&OID_CERT_CRL_TIMESTAMP)
        {
            SignatureLevel::X
        } else if unsigned.contains(&OID_CERTIFICATE_REFS) {
            SignatureLevel::C
        } else if unsigned.contains(&OID_SIGNATURE_TIME_STAMP_TOKEN) {
            SignatureLevel::T
        } else if self.record.signed_attributes().contains(&OID_SIG_POLICY_ID) {
            SignatureLevel::Epes
        } else {
            SignatureLevel::Bes
        }
    }

    /// Verify the signature value over the signed attributes with the
    /// signing certificate's public key.
    pub fn verify_signature(&self) -> Result<(), CadesError> {
        let cert = self.signing_certificate()?;
        let algorithm = verification_algorithm(
            &self.record.signature_algorithm().algorithm,
            self.record.digest_algorithm()?,
        )?;
        let signed_data = self
            .record
            .signed_attributes_data()
            .ok_or(CadesError::MissingSignedAttribute("signed attributes"))?;

        UnparsedPublicKey::new(algorithm, cert.public_key_data())
            .verify(&signed_data, self.record.signature_value())
            .map_err(|_| CadesError::SignatureVerification)
    }

    /// Verify the message-digest signed attribute against `content`.
    pub fn verify_message_digest(&self, content: &[u8]) -> Result<(), CadesError> {
        let value = self
            .record
            .signed_attributes()
            .first_value(&OID_MESSAGE_DIGEST)
            .ok_or(CadesError::MissingSignedAttribute("message-digest"))?;
        let expected = Constructed::decode(value.as_slice(), Mode::Der, |cons| {
            OctetString::take_from(cons)
        })
        .map_err(|_| CadesError::MalformedAttribute("message-digest"))?;

        if self.record.digest_algorithm()?.digest(content) == expected.to_bytes().as_ref() {
            Ok(())
        } else {
            Err(CadesError::SignatureVerification)
        }
    }
}
