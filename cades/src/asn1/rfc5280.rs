// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! ASN.1 data structures defined by RFC 5280.

Only the parts of certificates and CRLs that CAdES needs to reference
are decoded. Everything else is retained or skipped.
*/

use {
    crate::asn1::common::{RawValue, Time},
    bcder::{
        decode::{Constructed, DecodeError, Source},
        encode::{self, PrimitiveContent, Values},
        BitString, ConstOid, Integer, Mode, OctetString, Oid, Tag,
    },
    bytes::Bytes,
    std::io::Write,
};

/// Subject key identifier extension.
///
/// 2.5.29.14
pub const OID_SUBJECT_KEY_IDENTIFIER: ConstOid = Oid(&[85, 29, 14]);

/// CRL number extension.
///
/// 2.5.29.20
pub const OID_CRL_NUMBER: ConstOid = Oid(&[85, 29, 20]);

/// Common name attribute type.
///
/// 2.5.4.3
pub const OID_COMMON_NAME: ConstOid = Oid(&[85, 4, 3]);

/// Algorithm identifier.
///
/// ```ASN.1
/// AlgorithmIdentifier  ::=  SEQUENCE  {
///   algorithm               OBJECT IDENTIFIER,
///   parameters              ANY DEFINED BY algorithm OPTIONAL  }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AlgorithmIdentifier {
    pub algorithm: Oid,
    pub parameters: Option<RawValue>,
}

impl AlgorithmIdentifier {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| Self::from_sequence(cons))
    }

    pub fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| Self::from_sequence(cons))
    }

    fn from_sequence<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        let algorithm = Oid::take_from(cons)?;
        let parameters = RawValue::take_opt_from(cons)?;

        Ok(Self {
            algorithm,
            parameters,
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((self.algorithm.encode_ref(), self.parameters.as_ref()))
    }
}

impl Values for AlgorithmIdentifier {
    fn encoded_len(&self, mode: Mode) -> usize {
        self.encode_ref().encoded_len(mode)
    }

    fn write_encoded<W: Write>(&self, mode: Mode, target: &mut W) -> Result<(), std::io::Error> {
        self.encode_ref().write_encoded(mode, target)
    }
}

/// A distinguished name.
///
/// Names are compared and re-emitted by their DER encoding, which is what
/// issuer/serial matching in CMS relies on.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Name(RawValue);

impl Name {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        Ok(Self(RawValue::take_from(cons)?))
    }

    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// Encode as the `directoryName` alternative of a `GeneralName`.
    pub fn encode_general_name(&self) -> impl Values + '_ {
        encode::sequence_as(Tag::CTX_4, &self.0)
    }
}

impl From<RawValue> for Name {
    fn from(v: RawValue) -> Self {
        Self(v)
    }
}

impl Values for Name {
    fn encoded_len(&self, mode: Mode) -> usize {
        self.0.encoded_len(mode)
    }

    fn write_encoded<W: Write>(&self, mode: Mode, target: &mut W) -> Result<(), std::io::Error> {
        self.0.write_encoded(mode, target)
    }
}

/// Certificate extension.
///
/// ```ASN.1
/// Extension  ::=  SEQUENCE  {
///      extnID      OBJECT IDENTIFIER,
///      critical    BOOLEAN DEFAULT FALSE,
///      extnValue   OCTET STRING }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Extension {
    pub id: Oid,
    pub critical: bool,
    pub value: OctetString,
}

impl Extension {
    fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            let id = Oid::take_from(cons)?;
            let critical = cons.take_opt_bool()?.unwrap_or(false);
            let value = OctetString::take_from(cons)?;

            Ok(Self {
                id,
                critical,
                value,
            })
        })
    }
}

/// ```ASN.1
/// Extensions  ::=  SEQUENCE SIZE (1..MAX) OF Extension
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Extensions(Vec<Extension>);

impl Extensions {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let mut extensions = Vec::new();

            while let Some(extension) = Extension::take_opt_from(cons)? {
                extensions.push(extension);
            }

            Ok(Self(extensions))
        })
    }

    /// Find an extension by OID and return its `extnValue` octets.
    pub fn value_of(&self, id: &ConstOid) -> Option<Bytes> {
        self.0
            .iter()
            .find(|extension| extension.id == *id)
            .map(|extension| extension.value.to_bytes())
    }
}

/// Subject public key info, retained as encoded.
///
/// ```ASN.1
/// SubjectPublicKeyInfo  ::=  SEQUENCE  {
///      algorithm            AlgorithmIdentifier,
///      subjectPublicKey     BIT STRING  }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubjectPublicKeyInfo {
    pub algorithm: AlgorithmIdentifier,
    /// The octets of the `subjectPublicKey` bit string.
    pub subject_public_key: Bytes,
}

impl SubjectPublicKeyInfo {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let algorithm = AlgorithmIdentifier::take_from(cons)?;
            let subject_public_key = BitString::take_from(cons)?.octet_bytes();

            Ok(Self {
                algorithm,
                subject_public_key,
            })
        })
    }
}

/// An X.509 certificate.
///
/// ```ASN.1
/// Certificate  ::=  SEQUENCE  {
///   tbsCertificate       TBSCertificate,
///   signatureAlgorithm   AlgorithmIdentifier,
///   signature            BIT STRING  }
///
/// TBSCertificate  ::=  SEQUENCE  {
///   version         [0]  Version DEFAULT v1,
///   serialNumber         CertificateSerialNumber,
///   signature            AlgorithmIdentifier,
///   issuer               Name,
///   validity             Validity,
///   subject              Name,
///   subjectPublicKeyInfo SubjectPublicKeyInfo,
///   issuerUniqueID  [1]  IMPLICIT UniqueIdentifier OPTIONAL,
///   subjectUniqueID [2]  IMPLICIT UniqueIdentifier OPTIONAL,
///   extensions      [3]  Extensions OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Certificate {
    pub serial_number: Integer,
    pub issuer: Name,
    pub not_before: Time,
    pub not_after: Time,
    pub subject: Name,
    pub subject_public_key_info: SubjectPublicKeyInfo,
    pub extensions: Extensions,
    pub signature_algorithm: AlgorithmIdentifier,
}

impl Certificate {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let (serial_number, issuer, (not_before, not_after), subject, spki, extensions) =
                cons.take_sequence(|cons| {
                    cons.take_opt_constructed_if(Tag::CTX_0, |cons| Integer::take_from(cons))?;
                    let serial_number = Integer::take_from(cons)?;
                    AlgorithmIdentifier::take_from(cons)?;
                    let issuer = Name::take_from(cons)?;
                    let validity = cons.take_sequence(|cons| {
                        Ok((Time::take_from(cons)?, Time::take_from(cons)?))
                    })?;
                    let subject = Name::take_from(cons)?;
                    let spki = SubjectPublicKeyInfo::take_from(cons)?;
                    cons.take_opt_primitive_if(Tag::CTX_1, |prim| prim.take_all())?;
                    cons.take_opt_primitive_if(Tag::CTX_2, |prim| prim.take_all())?;
                    let extensions = cons
                        .take_opt_constructed_if(Tag::CTX_3, |cons| Extensions::take_from(cons))?
                        .unwrap_or_default();

                    Ok((serial_number, issuer, validity, subject, spki, extensions))
                })?;

            let signature_algorithm = AlgorithmIdentifier::take_from(cons)?;
            BitString::take_from(cons)?;

            Ok(Self {
                serial_number,
                issuer,
                not_before,
                not_after,
                subject,
                subject_public_key_info: spki,
                extensions,
                signature_algorithm,
            })
        })
    }

    /// The subject key identifier extension value, if present.
    pub fn subject_key_identifier(&self) -> Option<Bytes> {
        let value = self.extensions.value_of(&OID_SUBJECT_KEY_IDENTIFIER)?;

        Constructed::decode(value, Mode::Der, |cons| OctetString::take_from(cons))
            .ok()
            .map(|id| id.to_bytes())
    }
}

/// A certificate revocation list.
///
/// ```ASN.1
/// CertificateList  ::=  SEQUENCE  {
///   tbsCertList          TBSCertList,
///   signatureAlgorithm   AlgorithmIdentifier,
///   signatureValue       BIT STRING  }
///
/// TBSCertList  ::=  SEQUENCE  {
///   version                 Version OPTIONAL,
///   signature               AlgorithmIdentifier,
///   issuer                  Name,
///   thisUpdate              Time,
///   nextUpdate              Time OPTIONAL,
///   revokedCertificates     SEQUENCE OF SEQUENCE  {
///        userCertificate         CertificateSerialNumber,
///        revocationDate          Time,
///        crlEntryExtensions      Extensions OPTIONAL } OPTIONAL,
///   crlExtensions           [0] Extensions OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertificateList {
    pub issuer: Name,
    pub this_update: Time,
    pub next_update: Option<Time>,
    pub revoked_serial_numbers: Vec<Integer>,
    pub extensions: Extensions,
}

impl CertificateList {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let list = cons.take_sequence(|cons| {
                cons.take_opt_primitive_if(Tag::INTEGER, |prim| Integer::from_primitive(prim))?;
                AlgorithmIdentifier::take_from(cons)?;
                let issuer = Name::take_from(cons)?;
                let this_update = Time::take_from(cons)?;
                let next_update = Time::take_opt_from(cons)?;
                let revoked_serial_numbers = cons
                    .take_opt_sequence(|cons| {
                        let mut serials = Vec::new();

                        while let Some(serial) = cons.take_opt_sequence(|cons| {
                            let serial = Integer::take_from(cons)?;
                            cons.capture_all()?;
                            Ok(serial)
                        })? {
                            serials.push(serial);
                        }

                        Ok(serials)
                    })?
                    .unwrap_or_default();
                let extensions = cons
                    .take_opt_constructed_if(Tag::CTX_0, |cons| Extensions::take_from(cons))?
                    .unwrap_or_default();

                Ok(Self {
                    issuer,
                    this_update,
                    next_update,
                    revoked_serial_numbers,
                    extensions,
                })
            })?;

            AlgorithmIdentifier::take_from(cons)?;
            BitString::take_from(cons)?;

            Ok(list)
        })
    }

    /// The `cRLNumber` extension, if present.
    pub fn crl_number(&self) -> Option<Integer> {
        let value = self.extensions.value_of(&OID_CRL_NUMBER)?;

        Constructed::decode(value, Mode::Der, |cons| Integer::take_from(cons)).ok()
    }
}
