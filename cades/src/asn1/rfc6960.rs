// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! OCSP response structures from RFC 6960.

Only the envelope and the fields that revocation references point at are
decoded. Responses themselves are retained as encoded.
*/

use {
    crate::asn1::{
        common::{GeneralizedTime, RawValue},
        rfc5280::AlgorithmIdentifier,
    },
    bcder::{
        decode::{Constructed, DecodeError, Source},
        encode::{self, PrimitiveContent, Values},
        BitString, ConstOid, Integer, OctetString, Oid, Tag,
    },
};

/// Basic OCSP response type.
///
/// 1.3.6.1.5.5.7.48.1.1
pub const OID_OCSP_BASIC: ConstOid = Oid(&[43, 6, 1, 5, 5, 7, 48, 1, 1]);

/// OCSP response envelope.
///
/// ```ASN.1
/// OCSPResponse ::= SEQUENCE {
///    responseStatus         OCSPResponseStatus,
///    responseBytes          [0] EXPLICIT ResponseBytes OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OcspResponse {
    pub status: OcspResponseStatus,
    pub response_bytes: Option<ResponseBytes>,
}

impl OcspResponse {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let status = OcspResponseStatus::take_from(cons)?;
            let response_bytes =
                cons.take_opt_constructed_if(Tag::CTX_0, |cons| ResponseBytes::take_from(cons))?;

            Ok(Self {
                status,
                response_bytes,
            })
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((
            self.status.encode(),
            self.response_bytes
                .as_ref()
                .map(|bytes| encode::sequence_as(Tag::CTX_0, bytes.encode_ref())),
        ))
    }
}

/// ```ASN.1
/// OCSPResponseStatus ::= ENUMERATED {
///     successful            (0),
///     malformedRequest      (1),
///     internalError         (2),
///     tryLater              (3),
///     sigRequired           (5),
///     unauthorized          (6) }
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OcspResponseStatus {
    Successful,
    MalformedRequest,
    InternalError,
    TryLater,
    SigRequired,
    Unauthorized,
}

impl OcspResponseStatus {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_primitive_if(Tag::ENUMERATED, |prim| {
            match Integer::i8_from_primitive(prim)? {
                0 => Ok(Self::Successful),
                1 => Ok(Self::MalformedRequest),
                2 => Ok(Self::InternalError),
                3 => Ok(Self::TryLater),
                5 => Ok(Self::SigRequired),
                6 => Ok(Self::Unauthorized),
                _ => Err(prim.content_err("unknown OCSPResponseStatus value")),
            }
        })
    }

    pub fn encode(self) -> impl Values {
        u8::from(self).encode_as(Tag::ENUMERATED)
    }
}

impl From<OcspResponseStatus> for u8 {
    fn from(v: OcspResponseStatus) -> u8 {
        match v {
            OcspResponseStatus::Successful => 0,
            OcspResponseStatus::MalformedRequest => 1,
            OcspResponseStatus::InternalError => 2,
            OcspResponseStatus::TryLater => 3,
            OcspResponseStatus::SigRequired => 5,
            OcspResponseStatus::Unauthorized => 6,
        }
    }
}

/// ```ASN.1
/// ResponseBytes ::=       SEQUENCE {
///     responseType   OBJECT IDENTIFIER,
///     response       OCTET STRING }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResponseBytes {
    pub response_type: Oid,
    pub response: OctetString,
}

impl ResponseBytes {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let response_type = Oid::take_from(cons)?;
            let response = OctetString::take_from(cons)?;

            Ok(Self {
                response_type,
                response,
            })
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((self.response_type.encode_ref(), self.response.encode_ref()))
    }
}

/// The parts of a basic OCSP response that references are built from.
///
/// ```ASN.1
/// BasicOCSPResponse       ::= SEQUENCE {
///    tbsResponseData      ResponseData,
///    signatureAlgorithm   AlgorithmIdentifier,
///    signature            BIT STRING,
///    certs            [0] EXPLICIT SEQUENCE OF Certificate OPTIONAL }
///
/// ResponseData ::= SEQUENCE {
///    version              [0] EXPLICIT Version DEFAULT v1,
///    responderID              ResponderID,
///    producedAt               GeneralizedTime,
///    responses                SEQUENCE OF SingleResponse,
///    responseExtensions   [1] EXPLICIT Extensions OPTIONAL }
///
/// ResponderID ::= CHOICE {
///    byName               [1] Name,
///    byKey                [2] KeyHash }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BasicOcspResponse {
    /// The tagged `ResponderID` choice, as encoded.
    pub responder_id: RawValue,
    pub produced_at: GeneralizedTime,
    pub signature_algorithm: AlgorithmIdentifier,
    pub certs: Vec<RawValue>,
}

impl BasicOcspResponse {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let (responder_id, produced_at) = cons.take_sequence(|cons| {
                cons.take_opt_constructed_if(Tag::CTX_0, |cons| Integer::take_from(cons))?;
                let responder_id = RawValue::take_from(cons)?;
                let produced_at = GeneralizedTime::take_from(cons)?;
                // Individual responses and extensions are not interpreted.
                cons.capture_all()?;

                Ok((responder_id, produced_at))
            })?;

            let signature_algorithm = AlgorithmIdentifier::take_from(cons)?;
            BitString::take_from(cons)?;
            let certs = cons
                .take_opt_constructed_if(Tag::CTX_0, |cons| {
                    cons.take_sequence(|cons| RawValue::take_all_from(cons))
                })?
                .unwrap_or_default();

            Ok(Self {
                responder_id,
                produced_at,
                signature_algorithm,
                certs,
            })
        })
    }
}
