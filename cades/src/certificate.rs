// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! High-level views of certificates and revocation data.

Every type here keeps the exact encoding it was constructed from. That
encoding is the identity of the object: it is what gets hashed into
references, embedded as values, and compared for equality.
*/

use {
    crate::{
        algorithm::DigestAlgorithm,
        asn1::{
            common::RawValue,
            rfc5126::IssuerSerial,
            rfc5280::{Certificate, CertificateList, Name},
            rfc5652::{IssuerAndSerialNumber, SignerIdentifier, OID_RI_OCSP_RESPONSE},
            rfc6960::{
                BasicOcspResponse, OcspResponse, OcspResponseStatus, ResponseBytes, OID_OCSP_BASIC,
            },
        },
        CadesError,
    },
    bcder::{
        decode::Constructed,
        encode::{self, PrimitiveContent, Values},
        Integer, Mode, OctetString, Oid, Tag,
    },
    bytes::Bytes,
    chrono::{DateTime, Utc},
    std::hash::{Hash, Hasher},
};

/// An X.509 certificate with its original DER.
#[derive(Clone, Debug)]
pub struct CapturedCertificate {
    raw: RawValue,
    parsed: Certificate,
}

impl CapturedCertificate {
    pub fn from_der(data: &[u8]) -> Result<Self, CadesError> {
        let raw = RawValue::from_der(data).map_err(|_| CadesError::MalformedCertificate)?;

        Self::from_raw(raw)
    }

    pub fn from_pem(data: &[u8]) -> Result<Self, CadesError> {
        let pem = pem::parse(data)?;

        Self::from_der(&pem.contents)
    }

    pub fn from_raw(raw: RawValue) -> Result<Self, CadesError> {
        let parsed = Constructed::decode(raw.as_slice(), Mode::Der, |cons| {
            Certificate::take_from(cons)
        })
        .map_err(|_| CadesError::MalformedCertificate)?;

        Ok(Self { raw, parsed })
    }

    pub fn serial_number(&self) -> &Integer {
        &self.parsed.serial_number
    }

    pub fn subject(&self) -> &Name {
        &self.parsed.subject
    }

    pub fn issuer(&self) -> &Name {
        &self.parsed.issuer
    }

    pub fn not_before(&self) -> DateTime<Utc> {
        *self.parsed.not_before.as_ref()
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        *self.parsed.not_after.as_ref()
    }

    pub fn subject_key_identifier(&self) -> Option<Bytes> {
        self.parsed.subject_key_identifier()
    }

    /// Octets of the subject public key bit string.
    pub fn public_key_data(&self) -> &[u8] {
        self.parsed
            .subject_public_key_info
            .subject_public_key
            .as_ref()
    }

    pub fn is_self_issued(&self) -> bool {
        self.parsed.subject == self.parsed.issuer
    }

    /// The DER encoding of this certificate.
    pub fn encoded(&self) -> &[u8] {
        self.raw.as_slice()
    }

    pub fn raw(&self) -> &RawValue {
        &self.raw
    }

    /// Digest the DER encoding of this certificate.
    pub fn digest(&self, algorithm: DigestAlgorithm) -> Vec<u8> {
        algorithm.digest(self.encoded())
    }

    pub fn issuer_and_serial_number(&self) -> IssuerAndSerialNumber {
        IssuerAndSerialNumber {
            issuer: self.parsed.issuer.clone(),
            serial_number: self.parsed.serial_number.clone(),
        }
    }

    /// The `IssuerSerial` form used by ESS and ETSI references.
    pub fn issuer_serial(&self) -> IssuerSerial {
        IssuerSerial::new(&self.parsed.issuer, self.parsed.serial_number.clone())
    }

    /// Whether this certificate is the one a CMS signer identifier points at.
    pub fn matches_signer(&self, sid: &SignerIdentifier) -> bool {
        match sid {
            SignerIdentifier::IssuerAndSerialNumber(ias) => {
                ias.issuer == self.parsed.issuer && ias.serial_number == self.parsed.serial_number
            }
            SignerIdentifier::SubjectKeyIdentifier(ski) => self
                .subject_key_identifier()
                .map(|id| id == ski.to_bytes())
                .unwrap_or(false),
        }
    }
}

impl PartialEq for CapturedCertificate {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for CapturedCertificate {}

impl Hash for CapturedCertificate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state)
    }
}

/// A certificate revocation list with its original DER.
#[derive(Clone, Debug)]
pub struct CapturedCrl {
    raw: RawValue,
    parsed: CertificateList,
}

impl CapturedCrl {
    pub fn from_der(data: &[u8]) -> Result<Self, CadesError> {
        let raw = RawValue::from_der(data).map_err(|_| CadesError::MalformedCrl)?;

        Self::from_raw(raw)
    }

    pub fn from_raw(raw: RawValue) -> Result<Self, CadesError> {
        let parsed = Constructed::decode(raw.as_slice(), Mode::Der, |cons| {
            CertificateList::take_from(cons)
        })
        .map_err(|_| CadesError::MalformedCrl)?;

        Ok(Self { raw, parsed })
    }

    pub fn issuer(&self) -> &Name {
        &self.parsed.issuer
    }

    pub fn this_update(&self) -> DateTime<Utc> {
        *self.parsed.this_update.as_ref()
    }

    pub fn next_update(&self) -> Option<DateTime<Utc>> {
        self.parsed.next_update.as_ref().map(|t| *t.as_ref())
    }

    pub fn crl_number(&self) -> Option<Integer> {
        self.parsed.crl_number()
    }

    /// Whether a certificate issued by this CRL's issuer is listed as revoked.
    pub fn is_revoked(&self, certificate: &CapturedCertificate) -> bool {
        certificate.issuer() == self.issuer()
            && self
                .parsed
                .revoked_serial_numbers
                .iter()
                .any(|serial| serial == certificate.serial_number())
    }

    pub fn encoded(&self) -> &[u8] {
        self.raw.as_slice()
    }

    pub fn raw(&self) -> &RawValue {
        &self.raw
    }

    pub fn digest(&self, algorithm: DigestAlgorithm) -> Vec<u8> {
        algorithm.digest(self.encoded())
    }
}

impl PartialEq for CapturedCrl {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for CapturedCrl {}

impl Hash for CapturedCrl {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state)
    }
}

/// A basic OCSP response with its original DER.
///
/// The identity is the `BasicOCSPResponse`, not the `OCSPResponse` envelope
/// it may have been delivered in: revocation values embed and revocation
/// references hash the former.
#[derive(Clone, Debug)]
pub struct CapturedOcspResponse {
    raw: RawValue,
    parsed: BasicOcspResponse,
}

impl CapturedOcspResponse {
    /// Construct from the DER of a `BasicOCSPResponse`.
    pub fn from_der(data: &[u8]) -> Result<Self, CadesError> {
        let raw = RawValue::from_der(data).map_err(|_| CadesError::MalformedOcspResponse)?;

        Self::from_raw(raw)
    }

    pub fn from_raw(raw: RawValue) -> Result<Self, CadesError> {
        let parsed = Constructed::decode(raw.as_slice(), Mode::Der, |cons| {
            BasicOcspResponse::take_from(cons)
        })
        .map_err(|_| CadesError::MalformedOcspResponse)?;

        Ok(Self { raw, parsed })
    }

    /// Construct from the DER of a successful `OCSPResponse` envelope.
    pub fn from_ocsp_response_der(data: &[u8]) -> Result<Self, CadesError> {
        let response = Constructed::decode(data, Mode::Der, |cons| OcspResponse::take_from(cons))
            .map_err(|_| CadesError::MalformedOcspResponse)?;

        Self::from_ocsp_response(&response)
    }

    fn from_ocsp_response(response: &OcspResponse) -> Result<Self, CadesError> {
        match (&response.status, &response.response_bytes) {
            (OcspResponseStatus::Successful, Some(bytes))
                if bytes.response_type == OID_OCSP_BASIC =>
            {
                Self::from_der(&bytes.response.to_bytes())
            }
            _ => Err(CadesError::MalformedOcspResponse),
        }
    }

    /// Construct from a `RevocationInfoChoice` of the `other` kind, if it
    /// carries an OCSP response.
    pub fn from_revocation_info_choice(choice: &RawValue) -> Result<Option<Self>, CadesError> {
        let (format, info) = crate::asn1::rfc5652::decode_other_revocation_info(choice)?;

        if format != OID_RI_OCSP_RESPONSE {
            return Ok(None);
        }

        let response = Constructed::decode(info.as_slice(), Mode::Der, |cons| {
            OcspResponse::take_from(cons)
        })
        .map_err(|_| CadesError::MalformedOcspResponse)?;

        Ok(Some(Self::from_ocsp_response(&response)?))
    }

    /// The tagged `ResponderID`, as encoded.
    pub fn responder_id(&self) -> &RawValue {
        &self.parsed.responder_id
    }

    pub fn produced_at(&self) -> DateTime<Utc> {
        *self.parsed.produced_at
    }

    /// Certificates the responder included with its response.
    pub fn certificates(&self) -> Result<Vec<CapturedCertificate>, CadesError> {
        self.parsed
            .certs
            .iter()
            .cloned()
            .map(CapturedCertificate::from_raw)
            .collect()
    }

    pub fn encoded(&self) -> &[u8] {
        self.raw.as_slice()
    }

    pub fn raw(&self) -> &RawValue {
        &self.raw
    }

    pub fn digest(&self, algorithm: DigestAlgorithm) -> Vec<u8> {
        algorithm.digest(self.encoded())
    }

    /// Wrap in a successful `OCSPResponse` envelope.
    pub fn to_ocsp_response(&self) -> OcspResponse {
        OcspResponse {
            status: OcspResponseStatus::Successful,
            response_bytes: Some(ResponseBytes {
                response_type: Oid(Bytes::from_static(OID_OCSP_BASIC.0)),
                response: OctetString::new(self.raw.to_bytes()),
            }),
        }
    }

    /// Encode as the `other` `RevocationInfoChoice` of a `SignedData`.
    pub fn to_revocation_info_choice(&self) -> RawValue {
        let response = self.to_ocsp_response();

        RawValue::from_values(encode::sequence_as(
            Tag::CTX_1,
            (OID_RI_OCSP_RESPONSE.encode_ref(), response.encode_ref()),
        ))
    }
}

impl PartialEq for CapturedOcspResponse {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for CapturedOcspResponse {}

impl Hash for CapturedOcspResponse {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state)
    }
}
