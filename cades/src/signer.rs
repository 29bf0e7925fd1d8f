// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The per-signer unit the profile stages extend.

use {
    crate::{
        algorithm::DigestAlgorithm,
        asn1::{
            common::RawValue,
            rfc5280::AlgorithmIdentifier,
            rfc5652::{
                Attribute, CmsVersion, SignedAttributes, SignerIdentifier, SignerInfo,
                OID_COUNTER_SIGNATURE,
            },
        },
        attributes::AttributeTable,
        CadesError,
    },
    bcder::{decode::Constructed, Mode, OctetString, Oid},
    bytes::Bytes,
    std::convert::TryFrom,
};

/// One signer of a CMS `SignedData`.
///
/// The signed attributes and the signature value are fixed at signing time.
/// Extension only ever produces a new record with a different unsigned
/// attribute table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignerRecord {
    version: CmsVersion,
    sid: SignerIdentifier,
    digest_algorithm: AlgorithmIdentifier,
    signed_attributes: Option<SignedAttributes>,
    signed_table: AttributeTable,
    signature_algorithm: AlgorithmIdentifier,
    signature: Bytes,
    unsigned_table: AttributeTable,
}

impl SignerRecord {
    pub fn from_signer_info(info: &SignerInfo) -> Self {
        let signed_table = info
            .signed_attributes
            .as_ref()
            .map(|attrs| AttributeTable::from_attributes(attrs.attributes().to_vec()))
            .unwrap_or_default();
        let unsigned_table = info
            .unsigned_attributes
            .clone()
            .map(AttributeTable::from_attributes)
            .unwrap_or_default();

        Self {
            version: info.version,
            sid: info.sid.clone(),
            digest_algorithm: info.digest_algorithm.clone(),
            signed_attributes: info.signed_attributes.clone(),
            signed_table,
            signature_algorithm: info.signature_algorithm.clone(),
            signature: info.signature.to_bytes(),
            unsigned_table,
        }
    }

    /// Decode the DER of a single `SignerInfo`, as found in a counter-signature.
    pub fn from_der(data: &[u8]) -> Result<Self, CadesError> {
        let info = Constructed::decode(data, Mode::Der, |cons| SignerInfo::take_from(cons))?;

        Ok(Self::from_signer_info(&info))
    }

    pub fn to_signer_info(&self) -> SignerInfo {
        SignerInfo {
            version: self.version,
            sid: self.sid.clone(),
            digest_algorithm: self.digest_algorithm.clone(),
            signed_attributes: self.signed_attributes.clone(),
            signature_algorithm: self.signature_algorithm.clone(),
            signature: OctetString::new(self.signature.clone()),
            unsigned_attributes: if self.unsigned_table.is_empty() {
                None
            } else {
                Some(self.unsigned_table.to_vec())
            },
        }
    }

    pub fn to_der(&self) -> RawValue {
        RawValue::from_values(self.to_signer_info())
    }

    pub fn sid(&self) -> &SignerIdentifier {
        &self.sid
    }

    pub fn digest_algorithm(&self) -> Result<DigestAlgorithm, CadesError> {
        DigestAlgorithm::try_from(&self.digest_algorithm)
    }

    pub fn signature_algorithm(&self) -> &AlgorithmIdentifier {
        &self.signature_algorithm
    }

    /// The raw signature value.
    pub fn signature_value(&self) -> &[u8] {
        self.signature.as_ref()
    }

    pub fn signed_attributes(&self) -> &AttributeTable {
        &self.signed_table
    }

    /// The DER the signature was computed over: the signed attributes as a
    /// universal `SET`.
    pub fn signed_attributes_data(&self) -> Option<Vec<u8>> {
        self.signed_attributes
            .as_ref()
            .map(|attrs| RawValue::from_values(attrs.encode_ref()).as_slice().to_vec())
    }

    pub fn unsigned_attributes(&self) -> &AttributeTable {
        &self.unsigned_table
    }

    /// A new record with `unsigned` as its unsigned attributes.
    pub fn with_unsigned_attributes(&self, unsigned: AttributeTable) -> Self {
        Self {
            unsigned_table: unsigned,
            ..self.clone()
        }
    }

    /// Counter-signatures, each paired with the position of the attribute
    /// carrying it.
    pub fn counter_signatures(&self) -> Result<Vec<(usize, Vec<SignerRecord>)>, CadesError> {
        self.unsigned_table
            .iter()
            .enumerate()
            .filter(|(_, attr)| attr.typ == OID_COUNTER_SIGNATURE)
            .map(|(index, attr)| {
                let signers = attr
                    .values
                    .iter()
                    .map(|value| Self::from_der(value.as_slice()))
                    .collect::<Result<Vec<_>, _>>()?;

                Ok((index, signers))
            })
            .collect()
    }

    /// A new record where the counter-signature attribute at `index` carries
    /// `signers`.
    pub fn with_counter_signatures(&self, index: usize, signers: &[SignerRecord]) -> Self {
        let attribute = Attribute {
            typ: Oid(Bytes::copy_from_slice(OID_COUNTER_SIGNATURE.as_ref())),
            values: signers.iter().map(|signer| signer.to_der()).collect(),
        };

        self.with_unsigned_attributes(self.unsigned_table.with_entry(index, attribute))
    }
}
