// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! CAdES attribute syntaxes from RFC 5126 / ETSI TS 101 733, plus the
ESS signing certificate attributes of RFC 2634 and RFC 5035.

The ETSI ASN.1 modules use explicit tagging, so every context tag in this
module wraps the full encoding of the tagged type.
*/

use {
    crate::asn1::{
        common::{GeneralizedTime, RawValue, UtcTime},
        rfc5280::{AlgorithmIdentifier, Name},
    },
    bcder::{
        decode::{Constructed, DecodeError, Source},
        encode::{self, PrimitiveContent, Values},
        ConstOid, Integer, Mode, OctetString, Oid, Tag,
    },
    std::io::Write,
};

/// `id-aa-signingCertificate`
///
/// 1.2.840.113549.1.9.16.2.12
pub const OID_SIGNING_CERTIFICATE: ConstOid =
    Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 12]);

/// `id-aa-signingCertificateV2`
///
/// 1.2.840.113549.1.9.16.2.47
pub const OID_SIGNING_CERTIFICATE_V2: ConstOid =
    Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 47]);

/// `id-aa-signatureTimeStampToken`
///
/// 1.2.840.113549.1.9.16.2.14
pub const OID_SIGNATURE_TIME_STAMP_TOKEN: ConstOid =
    Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 14]);

/// `id-aa-ets-sigPolicyId`
///
/// 1.2.840.113549.1.9.16.2.15
pub const OID_SIG_POLICY_ID: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 15]);

/// `id-aa-ets-commitmentType`
///
/// 1.2.840.113549.1.9.16.2.16
pub const OID_COMMITMENT_TYPE: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 16]);

/// `id-aa-ets-signerLocation`
///
/// 1.2.840.113549.1.9.16.2.17
pub const OID_SIGNER_LOCATION: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 17]);

/// `id-aa-ets-signerAttr`
///
/// 1.2.840.113549.1.9.16.2.18
pub const OID_SIGNER_ATTR: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 18]);

/// `id-aa-ets-contentTimestamp`
///
/// 1.2.840.113549.1.9.16.2.20
pub const OID_CONTENT_TIMESTAMP: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 20]);

/// `id-aa-ets-certificateRefs`
///
/// 1.2.840.113549.1.9.16.2.21
pub const OID_CERTIFICATE_REFS: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 21]);

/// `id-aa-ets-revocationRefs`
///
/// 1.2.840.113549.1.9.16.2.22
pub const OID_REVOCATION_REFS: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 22]);

/// `id-aa-ets-certValues`
///
/// 1.2.840.113549.1.9.16.2.23
pub const OID_CERT_VALUES: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 23]);

/// `id-aa-ets-revocationValues`
///
/// 1.2.840.113549.1.9.16.2.24
pub const OID_REVOCATION_VALUES: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 24]);

/// `id-aa-ets-escTimeStamp`
///
/// 1.2.840.113549.1.9.16.2.25
pub const OID_ESC_TIME_STAMP: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 25]);

/// `id-aa-ets-certCRLTimestamp`
///
/// 1.2.840.113549.1.9.16.2.26
pub const OID_CERT_CRL_TIMESTAMP: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 26]);

/// `id-aa-ets-archiveTimestamp`, the deprecated first version.
///
/// 1.2.840.113549.1.9.16.2.27
pub const OID_ARCHIVE_TIMESTAMP_V1: ConstOid =
    Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 27]);

/// `id-aa-ets-archiveTimestampV2`
///
/// 1.2.840.113549.1.9.16.2.48
pub const OID_ARCHIVE_TIMESTAMP_V2: ConstOid =
    Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 48]);

/// Identifies the signer by issuer and serial inside ESS and ETSI references.
///
/// ```ASN.1
/// IssuerSerial ::= SEQUENCE {
///     issuer                   GeneralNames,
///     serialNumber             CertificateSerialNumber,
///     issuerUID                UniqueIdentifier OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IssuerSerial {
    /// `GeneralName` entries, as encoded.
    pub issuer: Vec<RawValue>,
    pub serial_number: Integer,
}

impl IssuerSerial {
    /// Identify a certificate by its issuer's directory name.
    pub fn new(issuer: &Name, serial_number: Integer) -> Self {
        Self {
            issuer: vec![RawValue::from_values(issuer.encode_general_name())],
            serial_number,
        }
    }

    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| Self::from_sequence(cons))
    }

    pub fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| Self::from_sequence(cons))
    }

    fn from_sequence<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        let issuer = cons.take_sequence(|cons| RawValue::take_all_from(cons))?;
        let serial_number = Integer::take_from(cons)?;
        // issuerUID
        cons.capture_all()?;

        Ok(Self {
            issuer,
            serial_number,
        })
    }

    /// The first `directoryName` among the issuer names.
    pub fn directory_name(&self) -> Option<Name> {
        self.issuer.iter().find_map(|general_name| {
            Constructed::decode(general_name.as_slice(), Mode::Der, |cons| {
                cons.take_constructed_if(Tag::CTX_4, |cons| Name::take_from(cons))
            })
            .ok()
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((
            encode::sequence(&self.issuer),
            (&self.serial_number).encode(),
        ))
    }
}

/// ```ASN.1
/// ESSCertID ::=  SEQUENCE {
///     certHash                 Hash,
///     issuerSerial             IssuerSerial OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EssCertId {
    pub cert_hash: OctetString,
    pub issuer_serial: Option<IssuerSerial>,
}

impl EssCertId {
    fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            let cert_hash = OctetString::take_from(cons)?;
            let issuer_serial = IssuerSerial::take_opt_from(cons)?;

            Ok(Self {
                cert_hash,
                issuer_serial,
            })
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((
            self.cert_hash.encode_ref(),
            self.issuer_serial.as_ref().map(|v| v.encode_ref()),
        ))
    }
}

/// ```ASN.1
/// SigningCertificate ::=  SEQUENCE {
///     certs        SEQUENCE OF ESSCertID,
///     policies     SEQUENCE OF PolicyInformation OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SigningCertificate {
    pub certs: Vec<EssCertId>,
    pub policies: Option<Vec<RawValue>>,
}

impl SigningCertificate {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let certs = cons.take_sequence(|cons| {
                let mut certs = Vec::new();

                while let Some(cert) = EssCertId::take_opt_from(cons)? {
                    certs.push(cert);
                }

                Ok(certs)
            })?;
            let policies = cons.take_opt_sequence(|cons| RawValue::take_all_from(cons))?;

            Ok(Self { certs, policies })
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((
            encode::sequence(encode::iter(self.certs.iter().map(|cert| cert.encode_ref()))),
            self.policies.as_ref().map(encode::sequence),
        ))
    }
}

/// ```ASN.1
/// ESSCertIDv2 ::=  SEQUENCE {
///     hashAlgorithm            AlgorithmIdentifier
///                              DEFAULT {algorithm id-sha256},
///     certHash                 Hash,
///     issuerSerial             IssuerSerial OPTIONAL }
/// ```
///
/// A `hash_algorithm` of `None` means SHA-256.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EssCertIdV2 {
    pub hash_algorithm: Option<AlgorithmIdentifier>,
    pub cert_hash: OctetString,
    pub issuer_serial: Option<IssuerSerial>,
}

impl EssCertIdV2 {
    fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            let hash_algorithm = AlgorithmIdentifier::take_opt_from(cons)?;
            let cert_hash = OctetString::take_from(cons)?;
            let issuer_serial = IssuerSerial::take_opt_from(cons)?;

            Ok(Self {
                hash_algorithm,
                cert_hash,
                issuer_serial,
            })
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((
            self.hash_algorithm.as_ref(),
            self.cert_hash.encode_ref(),
            self.issuer_serial.as_ref().map(|v| v.encode_ref()),
        ))
    }
}

/// ```ASN.1
/// SigningCertificateV2 ::=  SEQUENCE {
///     certs        SEQUENCE OF ESSCertIDv2,
///     policies     SEQUENCE OF PolicyInformation OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SigningCertificateV2 {
    pub certs: Vec<EssCertIdV2>,
    pub policies: Option<Vec<RawValue>>,
}

impl SigningCertificateV2 {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let certs = cons.take_sequence(|cons| {
                let mut certs = Vec::new();

                while let Some(cert) = EssCertIdV2::take_opt_from(cons)? {
                    certs.push(cert);
                }

                Ok(certs)
            })?;
            let policies = cons.take_opt_sequence(|cons| RawValue::take_all_from(cons))?;

            Ok(Self { certs, policies })
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((
            encode::sequence(encode::iter(self.certs.iter().map(|cert| cert.encode_ref()))),
            self.policies.as_ref().map(encode::sequence),
        ))
    }
}

/// ```ASN.1
/// OtherHashAlgAndValue ::= SEQUENCE {
///     hashAlgorithm   AlgorithmIdentifier,
///     hashValue       OtherHashValue }
///
/// OtherHashValue ::= OCTET STRING
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OtherHashAlgAndValue {
    pub hash_algorithm: AlgorithmIdentifier,
    pub hash_value: OctetString,
}

impl OtherHashAlgAndValue {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| Self::from_sequence(cons))
    }

    pub fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| Self::from_sequence(cons))
    }

    fn from_sequence<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        let hash_algorithm = AlgorithmIdentifier::take_from(cons)?;
        let hash_value = OctetString::take_from(cons)?;

        Ok(Self {
            hash_algorithm,
            hash_value,
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((&self.hash_algorithm, self.hash_value.encode_ref()))
    }
}

/// ```ASN.1
/// SignaturePolicyIdentifier ::= CHOICE {
///     signaturePolicyId          SignaturePolicyId,
///     signaturePolicyImplied     SignaturePolicyImplied }
///
/// SignaturePolicyImplied ::= NULL
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SignaturePolicyIdentifier {
    Id(SignaturePolicyId),
    Implied,
}

impl SignaturePolicyIdentifier {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        let implied = cons
            .take_opt_primitive_if(Tag::NULL, |prim| prim.skip_all())?
            .is_some();

        if implied {
            Ok(Self::Implied)
        } else {
            Ok(Self::Id(SignaturePolicyId::take_from(cons)?))
        }
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        match self {
            Self::Id(id) => (Some(id.encode_ref()), None),
            Self::Implied => (None, Some(().encode())),
        }
    }
}

/// ```ASN.1
/// SignaturePolicyId ::= SEQUENCE {
///     sigPolicyId           SigPolicyId,
///     sigPolicyHash         SigPolicyHash,
///     sigPolicyQualifiers   SEQUENCE SIZE (1..MAX) OF
///                             SigPolicyQualifierInfo OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignaturePolicyId {
    pub sig_policy_id: Oid,
    pub sig_policy_hash: OtherHashAlgAndValue,
    pub sig_policy_qualifiers: Option<Vec<RawValue>>,
}

impl SignaturePolicyId {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let sig_policy_id = Oid::take_from(cons)?;
            let sig_policy_hash = OtherHashAlgAndValue::take_from(cons)?;
            let sig_policy_qualifiers =
                cons.take_opt_sequence(|cons| RawValue::take_all_from(cons))?;

            Ok(Self {
                sig_policy_id,
                sig_policy_hash,
                sig_policy_qualifiers,
            })
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((
            self.sig_policy_id.encode_ref(),
            self.sig_policy_hash.encode_ref(),
            self.sig_policy_qualifiers.as_ref().map(encode::sequence),
        ))
    }
}

/// Claimed or certified signer attributes.
///
/// ```ASN.1
/// SignerAttribute ::= SEQUENCE OF CHOICE {
///     claimedAttributes   [0] ClaimedAttributes,
///     certifiedAttributes [1] CertifiedAttributes }
///
/// ClaimedAttributes ::= SEQUENCE OF Attribute
/// ```
///
/// Certified attributes are retained but not interpreted.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SignerAttribute {
    /// Each claimed `Attribute`, as encoded.
    pub claimed_attributes: Vec<RawValue>,
    pub certified_attributes: Vec<RawValue>,
}

impl SignerAttribute {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let mut res = Self::default();

            loop {
                if let Some(claimed) = cons.take_opt_constructed_if(Tag::CTX_0, |cons| {
                    cons.take_sequence(|cons| RawValue::take_all_from(cons))
                })? {
                    res.claimed_attributes.extend(claimed);
                } else if let Some(certified) =
                    cons.take_opt_constructed_if(Tag::CTX_1, |cons| RawValue::take_all_from(cons))?
                {
                    res.certified_attributes.extend(certified);
                } else {
                    break;
                }
            }

            Ok(res)
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((
            if self.claimed_attributes.is_empty() {
                None
            } else {
                Some(encode::sequence_as(
                    Tag::CTX_0,
                    encode::sequence(&self.claimed_attributes),
                ))
            },
            if self.certified_attributes.is_empty() {
                None
            } else {
                Some(encode::sequence_as(Tag::CTX_1, &self.certified_attributes))
            },
        ))
    }
}

/// ```ASN.1
/// OtherHash ::= CHOICE {
///     sha1Hash OtherHashValue,  -- This contains a SHA-1 hash
///     otherHash OtherHashAlgAndValue }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OtherHash {
    Sha1(OctetString),
    Other(OtherHashAlgAndValue),
}

impl OtherHash {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        Self::take_opt_from(cons)?.ok_or_else(|| cons.content_err("missing OtherHash"))
    }

    pub fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        if let Some(sha1) = OctetString::take_opt_from(cons)? {
            Ok(Some(Self::Sha1(sha1)))
        } else {
            Ok(OtherHashAlgAndValue::take_opt_from(cons)?.map(Self::Other))
        }
    }

    /// The raw digest value, whichever algorithm produced it.
    pub fn hash_value(&self) -> &OctetString {
        match self {
            Self::Sha1(v) => v,
            Self::Other(v) => &v.hash_value,
        }
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        match self {
            Self::Sha1(v) => (Some(v.encode_ref()), None),
            Self::Other(v) => (None, Some(v.encode_ref())),
        }
    }
}

/// ```ASN.1
/// OtherCertID ::= SEQUENCE {
///     otherCertHash            OtherHash,
///     issuerSerial             IssuerSerial OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OtherCertId {
    pub other_cert_hash: OtherHash,
    pub issuer_serial: Option<IssuerSerial>,
}

impl OtherCertId {
    fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            let other_cert_hash = OtherHash::take_from(cons)?;
            let issuer_serial = IssuerSerial::take_opt_from(cons)?;

            Ok(Self {
                other_cert_hash,
                issuer_serial,
            })
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((
            self.other_cert_hash.encode_ref(),
            self.issuer_serial.as_ref().map(|v| v.encode_ref()),
        ))
    }
}

/// ```ASN.1
/// CompleteCertificateRefs ::=  SEQUENCE OF OtherCertID
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CompleteCertificateRefs(pub Vec<OtherCertId>);

impl CompleteCertificateRefs {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let mut refs = Vec::new();

            while let Some(id) = OtherCertId::take_opt_from(cons)? {
                refs.push(id);
            }

            Ok(Self(refs))
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence(encode::iter(self.0.iter().map(|id| id.encode_ref())))
    }
}

/// ```ASN.1
/// CompleteRevocationRefs ::=  SEQUENCE OF CrlOcspRef
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CompleteRevocationRefs(pub Vec<CrlOcspRef>);

impl CompleteRevocationRefs {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let mut refs = Vec::new();

            while let Some(r) = CrlOcspRef::take_opt_from(cons)? {
                refs.push(r);
            }

            Ok(Self(refs))
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence(&self.0)
    }
}

/// ```ASN.1
/// CrlOcspRef ::= SEQUENCE {
///     crlids      [0] CRLListID    OPTIONAL,
///     ocspids     [1] OcspListID   OPTIONAL,
///     otherRev    [2] OtherRevRefs OPTIONAL }
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CrlOcspRef {
    pub crl_ids: Option<CrlListId>,
    pub ocsp_ids: Option<OcspListId>,
    pub other_rev: Option<RawValue>,
}

impl CrlOcspRef {
    fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            let crl_ids =
                cons.take_opt_constructed_if(Tag::CTX_0, |cons| CrlListId::take_from(cons))?;
            let ocsp_ids =
                cons.take_opt_constructed_if(Tag::CTX_1, |cons| OcspListId::take_from(cons))?;
            let other_rev =
                cons.take_opt_constructed_if(Tag::CTX_2, |cons| RawValue::take_from(cons))?;

            Ok(Self {
                crl_ids,
                ocsp_ids,
                other_rev,
            })
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((
            self.crl_ids
                .as_ref()
                .map(|ids| encode::sequence_as(Tag::CTX_0, ids.encode_ref())),
            self.ocsp_ids
                .as_ref()
                .map(|ids| encode::sequence_as(Tag::CTX_1, ids.encode_ref())),
            self.other_rev
                .as_ref()
                .map(|other| encode::sequence_as(Tag::CTX_2, other)),
        ))
    }
}

impl Values for CrlOcspRef {
    fn encoded_len(&self, mode: Mode) -> usize {
        self.encode_ref().encoded_len(mode)
    }

    fn write_encoded<W: Write>(&self, mode: Mode, target: &mut W) -> Result<(), std::io::Error> {
        self.encode_ref().write_encoded(mode, target)
    }
}

/// ```ASN.1
/// CRLListID ::=  SEQUENCE {
///     crls        SEQUENCE OF CrlValidatedID }
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CrlListId {
    pub crls: Vec<CrlValidatedId>,
}

impl CrlListId {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let crls = cons.take_sequence(|cons| {
                let mut crls = Vec::new();

                while let Some(id) = CrlValidatedId::take_opt_from(cons)? {
                    crls.push(id);
                }

                Ok(crls)
            })?;

            Ok(Self { crls })
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence(encode::sequence(encode::iter(
            self.crls.iter().map(|id| id.encode_ref()),
        )))
    }
}

/// ```ASN.1
/// CrlValidatedID ::=  SEQUENCE {
///     crlHash                   OtherHash,
///     crlIdentifier             CrlIdentifier OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CrlValidatedId {
    pub crl_hash: OtherHash,
    pub crl_identifier: Option<CrlIdentifier>,
}

impl CrlValidatedId {
    fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            let crl_hash = OtherHash::take_from(cons)?;
            let crl_identifier = CrlIdentifier::take_opt_from(cons)?;

            Ok(Self {
                crl_hash,
                crl_identifier,
            })
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((
            self.crl_hash.encode_ref(),
            self.crl_identifier.as_ref().map(|id| id.encode_ref()),
        ))
    }
}

/// ```ASN.1
/// CrlIdentifier ::= SEQUENCE {
///     crlissuer                 Name,
///     crlIssuedTime             UTCTime,
///     crlNumber                 INTEGER OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CrlIdentifier {
    pub crl_issuer: Name,
    pub crl_issued_time: UtcTime,
    pub crl_number: Option<Integer>,
}

impl CrlIdentifier {
    fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            let crl_issuer = Name::take_from(cons)?;
            let crl_issued_time = UtcTime::take_from(cons)?;
            let crl_number =
                cons.take_opt_primitive_if(Tag::INTEGER, |prim| Integer::from_primitive(prim))?;

            Ok(Self {
                crl_issuer,
                crl_issued_time,
                crl_number,
            })
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((
            &self.crl_issuer,
            self.crl_issued_time.encode_ref(),
            self.crl_number.as_ref().map(|number| number.encode()),
        ))
    }
}

/// ```ASN.1
/// OcspListID ::=  SEQUENCE {
///     ocspResponses        SEQUENCE OF OcspResponsesID }
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OcspListId {
    pub ocsp_responses: Vec<OcspResponsesId>,
}

impl OcspListId {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let ocsp_responses = cons.take_sequence(|cons| {
                let mut responses = Vec::new();

                while let Some(id) = OcspResponsesId::take_opt_from(cons)? {
                    responses.push(id);
                }

                Ok(responses)
            })?;

            Ok(Self { ocsp_responses })
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence(encode::sequence(encode::iter(
            self.ocsp_responses.iter().map(|id| id.encode_ref()),
        )))
    }
}

/// ```ASN.1
/// OcspResponsesID ::=  SEQUENCE {
///     ocspIdentifier              OcspIdentifier,
///     ocspRepHash                 OtherHash    OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OcspResponsesId {
    pub ocsp_identifier: OcspIdentifier,
    pub ocsp_rep_hash: Option<OtherHash>,
}

impl OcspResponsesId {
    fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            let ocsp_identifier = OcspIdentifier::take_from(cons)?;
            let ocsp_rep_hash = OtherHash::take_opt_from(cons)?;

            Ok(Self {
                ocsp_identifier,
                ocsp_rep_hash,
            })
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((
            self.ocsp_identifier.encode_ref(),
            self.ocsp_rep_hash.as_ref().map(|hash| hash.encode_ref()),
        ))
    }
}

/// ```ASN.1
/// OcspIdentifier ::= SEQUENCE {
///     ocspResponderID    ResponderID,
///     producedAt         GeneralizedTime }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OcspIdentifier {
    /// The tagged `ResponderID` choice, as encoded.
    pub ocsp_responder_id: RawValue,
    pub produced_at: GeneralizedTime,
}

impl OcspIdentifier {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let ocsp_responder_id = RawValue::take_from(cons)?;
            let produced_at = GeneralizedTime::take_from(cons)?;

            Ok(Self {
                ocsp_responder_id,
                produced_at,
            })
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((&self.ocsp_responder_id, self.produced_at.encode_ref()))
    }
}

/// ```ASN.1
/// CertificateValues ::=  SEQUENCE OF Certificate
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CertificateValues(pub Vec<RawValue>);

impl CertificateValues {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        Ok(Self(cons.take_sequence(|cons| RawValue::take_all_from(cons))?))
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence(&self.0)
    }
}

/// ```ASN.1
/// RevocationValues ::=  SEQUENCE {
///     crlVals          [0] SEQUENCE OF CertificateList OPTIONAL,
///     ocspVals         [1] SEQUENCE OF BasicOCSPResponse OPTIONAL,
///     otherRevVals     [2] OtherRevVals OPTIONAL }
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RevocationValues {
    pub crl_vals: Option<Vec<RawValue>>,
    pub ocsp_vals: Option<Vec<RawValue>>,
    pub other_rev_vals: Option<RawValue>,
}

impl RevocationValues {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let crl_vals = cons.take_opt_constructed_if(Tag::CTX_0, |cons| {
                cons.take_sequence(|cons| RawValue::take_all_from(cons))
            })?;
            let ocsp_vals = cons.take_opt_constructed_if(Tag::CTX_1, |cons| {
                cons.take_sequence(|cons| RawValue::take_all_from(cons))
            })?;
            let other_rev_vals =
                cons.take_opt_constructed_if(Tag::CTX_2, |cons| RawValue::take_from(cons))?;

            Ok(Self {
                crl_vals,
                ocsp_vals,
                other_rev_vals,
            })
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((
            self.crl_vals
                .as_ref()
                .map(|crls| encode::sequence_as(Tag::CTX_0, encode::sequence(crls))),
            self.ocsp_vals
                .as_ref()
                .map(|ocsp| encode::sequence_as(Tag::CTX_1, encode::sequence(ocsp))),
            self.other_rev_vals
                .as_ref()
                .map(|other| encode::sequence_as(Tag::CTX_2, other)),
        ))
    }
}
