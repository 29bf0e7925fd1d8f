// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Time-stamp tokens and the Time-Stamp Protocol (RFC 3161).

[TimestampToken] is the parsed form of a token found in (or destined
for) a CAdES attribute. [TimestampSource] is what the profile stages ask
for new tokens. [Rfc3161TimestampSource] implements it on top of any
[TimeStampTransport] that can carry a DER request to a TSA and bring a DER
response back.
*/

use {
    crate::{
        algorithm::DigestAlgorithm,
        asn1::{
            common::RawValue,
            rfc3161::{
                MessageImprint, PkiStatus, TimeStampReq, TimeStampResp, TstInfo,
                OID_CONTENT_TYPE_TST_INFO,
            },
            rfc5126::{
                OID_ARCHIVE_TIMESTAMP_V2, OID_CERT_CRL_TIMESTAMP, OID_CONTENT_TIMESTAMP,
                OID_ESC_TIME_STAMP, OID_SIGNATURE_TIME_STAMP_TOKEN,
            },
            rfc5652::SignedData,
        },
        certificate::CapturedCertificate,
        CadesError,
    },
    bcder::{
        decode::{Constructed, DecodeError},
        ConstOid, Integer, Mode, OctetString, Oid,
    },
    bytes::Bytes,
    chrono::{DateTime, Utc},
    log::debug,
    ring::rand::SecureRandom,
    std::{convert::Infallible, convert::TryFrom, ops::Deref},
    thiserror::Error,
};

pub const HTTP_CONTENT_TYPE_REQUEST: &str = "application/timestamp-query";

pub const HTTP_CONTENT_TYPE_RESPONSE: &str = "application/timestamp-reply";

/// Errors of the Time-Stamp Protocol exchange.
#[derive(Debug, Error)]
pub enum TimeStampError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ASN.1 decode error: {0}")]
    Asn1Decode(DecodeError<Infallible>),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("error generating random nonce")]
    Random,

    #[error("nonce mismatch")]
    NonceMismatch,

    #[error("unsuccessful Time-Stamp Protocol response: {:?}: {:?}", .0.status.status, .0.status.status_string)]
    Unsuccessful(TimeStampResp),

    #[error("bad server response")]
    BadResponse,
}

impl From<DecodeError<Infallible>> for TimeStampError {
    fn from(e: DecodeError<Infallible>) -> Self {
        Self::Asn1Decode(e)
    }
}

/// What a time-stamp token covers.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TimestampType {
    /// Over the signed content, before signing.
    ContentTimestamp,
    /// Over the signature value (CAdES-T).
    SignatureTimestamp,
    /// Over the complete validation data references only (CAdES-X type 2).
    ValidationDataRefsOnly,
    /// Over the signature, its time-stamp and the references (CAdES-X type 1).
    ValidationDataFull,
    /// Over everything (CAdES-A).
    ArchiveTimestamp,
}

impl TimestampType {
    /// The unsigned attribute a token of this type is stored under.
    pub fn attribute_oid(&self) -> ConstOid {
        match self {
            Self::ContentTimestamp => OID_CONTENT_TIMESTAMP,
            Self::SignatureTimestamp => OID_SIGNATURE_TIME_STAMP_TOKEN,
            Self::ValidationDataRefsOnly => OID_CERT_CRL_TIMESTAMP,
            Self::ValidationDataFull => OID_ESC_TIME_STAMP,
            Self::ArchiveTimestamp => OID_ARCHIVE_TIMESTAMP_V2,
        }
    }
}

/// A parsed RFC 3161 time-stamp token.
///
/// The token's encoding is retained verbatim; it is what gets stored in an
/// attribute value.
#[derive(Clone, Debug)]
pub struct TimestampToken {
    typ: TimestampType,
    encoded: RawValue,
    signed_data: SignedData,
    tst_info: TstInfo,
}

impl TimestampToken {
    /// Parse a token from the DER of its `ContentInfo`.
    pub fn from_der(data: &[u8], typ: TimestampType) -> Result<Self, CadesError> {
        Self::from_raw(RawValue::from_der(data)?, typ)
    }

    pub fn from_raw(encoded: RawValue, typ: TimestampType) -> Result<Self, CadesError> {
        let signed_data =
            Constructed::decode(encoded.as_slice(), Mode::Ber, |cons| SignedData::decode(cons))?;

        if signed_data.content_info.content_type != OID_CONTENT_TYPE_TST_INFO {
            return Err(CadesError::MalformedAttribute("time-stamp token content type"));
        }

        let content = signed_data
            .content_info
            .content
            .as_ref()
            .ok_or(CadesError::MalformedAttribute("time-stamp token without TSTInfo"))?;

        let tst_info = Constructed::decode(content.to_bytes(), Mode::Der, |cons| {
            TstInfo::take_from(cons)
        })?;

        Ok(Self {
            typ,
            encoded,
            signed_data,
            tst_info,
        })
    }

    pub fn timestamp_type(&self) -> TimestampType {
        self.typ
    }

    /// The same token classified differently.
    pub fn with_type(self, typ: TimestampType) -> Self {
        Self { typ, ..self }
    }

    pub fn generation_time(&self) -> DateTime<Utc> {
        *self.tst_info.gen_time
    }

    pub fn message_imprint(&self) -> &MessageImprint {
        &self.tst_info.message_imprint
    }

    pub fn serial_number(&self) -> &Integer {
        &self.tst_info.serial_number
    }

    pub fn tst_info(&self) -> &TstInfo {
        &self.tst_info
    }

    pub fn signed_data(&self) -> &SignedData {
        &self.signed_data
    }

    /// Certificates the TSA embedded in the token.
    pub fn certificates(&self) -> Result<Vec<CapturedCertificate>, CadesError> {
        self.signed_data
            .certificates
            .iter()
            .flat_map(|set| set.0.iter())
            .filter(|choice| choice.tag_byte() == 0x30)
            .cloned()
            .map(CapturedCertificate::from_raw)
            .collect()
    }

    /// The token's `ContentInfo`, as encoded.
    pub fn encoded(&self) -> &RawValue {
        &self.encoded
    }

    pub fn digest_algorithm(&self) -> Result<DigestAlgorithm, CadesError> {
        DigestAlgorithm::try_from(&self.tst_info.message_imprint.hash_algorithm)
    }

    /// Whether the message imprint is the digest of `data`.
    pub fn matches_data(&self, data: &[u8]) -> Result<bool, CadesError> {
        let digest = self.digest_algorithm()?.digest(data);

        Ok(self.tst_info.message_imprint.hashed_message.to_bytes() == digest.as_slice())
    }
}

impl PartialEq for TimestampToken {
    fn eq(&self, other: &Self) -> bool {
        self.typ == other.typ && self.encoded == other.encoded
    }
}

impl Eq for TimestampToken {}

/// Something that issues time-stamp tokens.
pub trait TimestampSource {
    /// The digest algorithm this source would like imprints computed with.
    fn preferred_digest_algorithm(&self) -> Option<DigestAlgorithm> {
        None
    }

    /// Obtain a token over `digest`, which was computed with `algorithm`.
    ///
    /// The returned token is classified as a signature time-stamp; callers
    /// reclassify it for other uses.
    fn request_timestamp(
        &self,
        digest: &[u8],
        algorithm: DigestAlgorithm,
    ) -> Result<TimestampToken, CadesError>;
}

impl<T: TimestampSource + ?Sized> TimestampSource for &T {
    fn preferred_digest_algorithm(&self) -> Option<DigestAlgorithm> {
        (**self).preferred_digest_algorithm()
    }

    fn request_timestamp(
        &self,
        digest: &[u8],
        algorithm: DigestAlgorithm,
    ) -> Result<TimestampToken, CadesError> {
        (**self).request_timestamp(digest, algorithm)
    }
}

/// Carries a DER `TimeStampReq` to a TSA and returns the DER `TimeStampResp`.
///
/// An HTTP implementation posts the request with content type
/// [HTTP_CONTENT_TYPE_REQUEST] and expects [HTTP_CONTENT_TYPE_RESPONSE] back.
pub trait TimeStampTransport {
    fn send(&self, request: &[u8]) -> Result<Vec<u8>, TimeStampError>;
}

impl<T: TimeStampTransport + ?Sized> TimeStampTransport for &T {
    fn send(&self, request: &[u8]) -> Result<Vec<u8>, TimeStampError> {
        (**self).send(request)
    }
}

/// High-level interface to [TimeStampResp].
pub struct TimeStampResponse(TimeStampResp);

impl Deref for TimeStampResponse {
    type Target = TimeStampResp;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TimeStampResponse {
    pub fn from_der(data: &[u8]) -> Result<Self, TimeStampError> {
        Ok(Self(Constructed::decode(data, Mode::Der, |cons| {
            TimeStampResp::take_from(cons)
        })?))
    }

    /// Whether the time stamp request was successful.
    pub fn is_success(&self) -> bool {
        matches!(
            self.0.status.status,
            PkiStatus::Granted | PkiStatus::GrantedWithMods
        )
    }

    /// Obtain the size of the time-stamp token data.
    pub fn token_content_size(&self) -> Option<usize> {
        self.0
            .time_stamp_token
            .as_ref()
            .map(|token| token.as_slice().len())
    }

    /// Decode the token in the response.
    pub fn token(&self, typ: TimestampType) -> Result<Option<TimestampToken>, CadesError> {
        self.0
            .time_stamp_token
            .clone()
            .map(|token| TimestampToken::from_raw(token, typ))
            .transpose()
    }

    pub fn into_inner(self) -> TimeStampResp {
        self.0
    }
}

/// Construct a [TimeStampReq] over an already computed digest.
///
/// A random 64-bit nonce is included and the TSA is asked to embed its
/// certificate.
pub fn time_stamp_request(
    digest: &[u8],
    digest_algorithm: DigestAlgorithm,
    policy: Option<Oid>,
) -> Result<TimeStampReq, TimeStampError> {
    let mut random = [0u8; 8];
    ring::rand::SystemRandom::new()
        .fill(&mut random)
        .map_err(|_| TimeStampError::Random)?;

    Ok(TimeStampReq {
        version: Integer::from(1),
        message_imprint: MessageImprint {
            hash_algorithm: digest_algorithm.into(),
            hashed_message: OctetString::new(Bytes::copy_from_slice(digest)),
        },
        req_policy: policy,
        nonce: Some(Integer::from(u64::from_le_bytes(random))),
        cert_req: Some(true),
        extensions: None,
    })
}

/// A [TimestampSource] speaking RFC 3161 over a [TimeStampTransport].
pub struct Rfc3161TimestampSource<T: TimeStampTransport> {
    transport: T,
    digest_algorithm: Option<DigestAlgorithm>,
    policy: Option<Oid>,
}

impl<T: TimeStampTransport> Rfc3161TimestampSource<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            digest_algorithm: None,
            policy: None,
        }
    }

    /// Declare the digest algorithm the TSA prefers.
    pub fn with_digest_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.digest_algorithm = Some(algorithm);
        self
    }

    /// Request tokens under a specific TSA policy.
    pub fn with_policy(mut self, policy: Oid) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Perform a request/response exchange and validate the response.
    pub fn exchange(&self, request: &TimeStampReq) -> Result<TimeStampResponse, TimeStampError> {
        let body = RawValue::from_values(request.encode_ref());
        debug!("sending {} byte time-stamp request", body.as_slice().len());

        let response = TimeStampResponse::from_der(&self.transport.send(body.as_slice())?)?;

        if !response.is_success() {
            return Err(TimeStampError::Unsuccessful(response.into_inner()));
        }

        let token = response
            .time_stamp_token
            .as_ref()
            .ok_or(TimeStampError::BadResponse)?;

        let signed_data =
            Constructed::decode(token.as_slice(), Mode::Ber, |cons| SignedData::decode(cons))?;
        let content = signed_data
            .content_info
            .content
            .as_ref()
            .ok_or(TimeStampError::BadResponse)?;
        let tst_info = Constructed::decode(content.to_bytes(), Mode::Der, |cons| {
            TstInfo::take_from(cons)
        })?;

        if tst_info.nonce != request.nonce {
            return Err(TimeStampError::NonceMismatch);
        }

        if !imprints_match(&tst_info.message_imprint, &request.message_imprint) {
            return Err(TimeStampError::BadResponse);
        }

        Ok(response)
    }
}

/// Imprints agree on algorithm and value.
///
/// Digest parameters are ignored: TSAs differ on whether they echo an absent
/// or a NULL parameter for the SHA family.
fn imprints_match(a: &MessageImprint, b: &MessageImprint) -> bool {
    a.hash_algorithm.algorithm == b.hash_algorithm.algorithm
        && a.hashed_message.to_bytes() == b.hashed_message.to_bytes()
}

impl<T: TimeStampTransport> TimestampSource for Rfc3161TimestampSource<T> {
    fn preferred_digest_algorithm(&self) -> Option<DigestAlgorithm> {
        self.digest_algorithm
    }

    fn request_timestamp(
        &self,
        digest: &[u8],
        algorithm: DigestAlgorithm,
    ) -> Result<TimestampToken, CadesError> {
        let request = time_stamp_request(digest, algorithm, self.policy.clone())?;
        let response = self.exchange(&request)?;

        response
            .token(TimestampType::SignatureTimestamp)?
            .ok_or(CadesError::TimeStampProtocol(TimeStampError::BadResponse))
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{asn1::rfc3161::PkiStatusInfo, testutil::*},
    };

    #[test]
    fn token_from_stub_tsa() {
        let tsa = StubTsa::new();
        let source = Rfc3161TimestampSource::new(&tsa).with_digest_algorithm(DigestAlgorithm::Sha256);

        let digest = DigestAlgorithm::Sha256.digest(b"signature bytes");
        let token = source
            .request_timestamp(&digest, DigestAlgorithm::Sha256)
            .unwrap();

        assert_eq!(tsa.request_count(), 1);
        assert_eq!(token.timestamp_type(), TimestampType::SignatureTimestamp);
        assert_eq!(token.generation_time(), test_time(10));
        assert!(token.matches_data(b"signature bytes").unwrap());
        assert!(!token.matches_data(b"other bytes").unwrap());
        assert_eq!(token.certificates().unwrap(), vec![signer_certificate()]);

        let reparsed =
            TimestampToken::from_raw(token.encoded().clone(), TimestampType::ArchiveTimestamp)
                .unwrap();
        assert_eq!(reparsed.generation_time(), token.generation_time());
        assert_ne!(reparsed, token);
        assert_eq!(reparsed.with_type(TimestampType::SignatureTimestamp), token);
    }

    #[test]
    fn generation_times_increase() {
        let tsa = StubTsa::new();
        let source = Rfc3161TimestampSource::new(&tsa);

        let a = source.request_timestamp(&[1; 20], DigestAlgorithm::Sha1).unwrap();
        let b = source.request_timestamp(&[2; 20], DigestAlgorithm::Sha1).unwrap();

        assert!(b.generation_time() > a.generation_time());
        assert_eq!(a.digest_algorithm().unwrap(), DigestAlgorithm::Sha1);
    }

    struct Rejecting;

    impl TimeStampTransport for Rejecting {
        fn send(&self, _: &[u8]) -> Result<Vec<u8>, TimeStampError> {
            let resp = TimeStampResp {
                status: PkiStatusInfo {
                    status: PkiStatus::Rejection,
                    status_string: None,
                    fail_info: None,
                },
                time_stamp_token: None,
            };

            Ok(RawValue::from_values(resp.encode_ref()).as_slice().to_vec())
        }
    }

    #[test]
    fn rejection_is_reported() {
        let source = Rfc3161TimestampSource::new(Rejecting);

        let err = source
            .request_timestamp(&[0; 32], DigestAlgorithm::Sha256)
            .unwrap_err();
        assert!(matches!(
            err,
            CadesError::TimeStampProtocol(TimeStampError::Unsuccessful(_))
        ));
    }

    /// Forwards to a [StubTsa] after flipping the presence of the imprint's
    /// digest parameters.
    struct ParameterFlipping(StubTsa);

    impl TimeStampTransport for ParameterFlipping {
        fn send(&self, request: &[u8]) -> Result<Vec<u8>, TimeStampError> {
            let mut request =
                Constructed::decode(request, Mode::Der, |cons| TimeStampReq::take_from(cons))?;
            let algorithm = &mut request.message_imprint.hash_algorithm;
            algorithm.parameters = match algorithm.parameters {
                Some(_) => None,
                None => Some(RawValue::from_der(&[0x05, 0x00])?),
            };

            self.0
                .send(RawValue::from_values(request.encode_ref()).as_slice())
        }
    }

    #[test]
    fn imprint_parameters_may_differ() {
        let source = Rfc3161TimestampSource::new(ParameterFlipping(StubTsa::new()));

        let digest = DigestAlgorithm::Sha256.digest(b"parameters");
        let token = source
            .request_timestamp(&digest, DigestAlgorithm::Sha256)
            .unwrap();

        assert!(token.matches_data(b"parameters").unwrap());
        assert_eq!(source.transport().0.request_count(), 1);
    }

    struct Replaying(Vec<u8>);

    impl TimeStampTransport for Replaying {
        fn send(&self, _: &[u8]) -> Result<Vec<u8>, TimeStampError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn replayed_response_fails_nonce_check() {
        let tsa = StubTsa::new();
        let request = time_stamp_request(&[3; 32], DigestAlgorithm::Sha256, None).unwrap();
        let body = RawValue::from_values(request.encode_ref());
        let recorded = tsa.send(body.as_slice()).unwrap();

        let source = Rfc3161TimestampSource::new(Replaying(recorded));
        let err = source
            .request_timestamp(&[3; 32], DigestAlgorithm::Sha256)
            .unwrap_err();
        assert!(matches!(
            err,
            CadesError::TimeStampProtocol(TimeStampError::NonceMismatch)
        ));
    }
}
