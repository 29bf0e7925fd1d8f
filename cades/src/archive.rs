// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Reconstruction of the data an archive time-stamp covers.

The covered bytes are, in order:

1. the signed content: the encapsulated content if present, otherwise the
   original document supplied by the caller
2. the embedded certificates, DER encoded as a `SET`
3. the embedded revocation information, DER encoded as a `SET`
4. the DER of every unsigned attribute of the signer, in table order

Before step 4, all but the `keep` most recent archive time-stamps are
dropped from the attribute table. Recency is the `genTime` of each token.
A verifier of an earlier archive time-stamp prunes back to exactly the
time-stamps that existed when it was taken.
*/

use {
    crate::{
        asn1::{common::RawValue, rfc5126::OID_ARCHIVE_TIMESTAMP_V2, rfc5652::SignedData},
        attributes::AttributeTable,
        signer::SignerRecord,
        timestamp::{TimestampToken, TimestampType},
        CadesError,
    },
    log::debug,
};

pub struct ArchiveDataBuilder<'a> {
    signed_data: &'a SignedData,
    record: &'a SignerRecord,
    use_encapsulated_content: bool,
    original: Option<&'a [u8]>,
}

impl<'a> ArchiveDataBuilder<'a> {
    pub fn new(signed_data: &'a SignedData, record: &'a SignerRecord) -> Self {
        Self {
            signed_data,
            record,
            use_encapsulated_content: true,
            original: None,
        }
    }

    /// The signed content, for signatures that do not encapsulate it.
    pub fn original_document(mut self, data: Option<&'a [u8]>) -> Self {
        self.original = data;
        self
    }

    /// Never take the signed content from the `SignedData`.
    ///
    /// Counter-signers sign their parent's signature value, which must then
    /// be supplied as the original document.
    pub fn ignore_encapsulated_content(mut self) -> Self {
        self.use_encapsulated_content = false;
        self
    }

    fn content(&self) -> Result<Vec<u8>, CadesError> {
        let encapsulated = if self.use_encapsulated_content {
            self.signed_data
                .content_info
                .content
                .as_ref()
                .map(|content| content.to_bytes().to_vec())
        } else {
            None
        };

        encapsulated
            .or_else(|| self.original.map(|data| data.to_vec()))
            .ok_or(CadesError::DetachedContentMissing)
    }

    /// The unsigned attributes that remain after pruning archive time-stamps.
    pub fn retained_attributes(&self, keep: usize) -> Result<AttributeTable, CadesError> {
        let table = self.record.unsigned_attributes();

        let archive_indices = table
            .iter()
            .enumerate()
            .filter(|(_, attr)| attr.typ == OID_ARCHIVE_TIMESTAMP_V2)
            .map(|(index, _)| index)
            .collect::<Vec<_>>();

        if keep >= archive_indices.len() {
            return Ok(table.clone());
        }

        let mut dated = archive_indices
            .iter()
            .map(|index| {
                let attr = &table.attributes()[*index];
                let value = attr
                    .values
                    .first()
                    .ok_or(CadesError::ArchiveTimestampOrdering)?;
                let token =
                    TimestampToken::from_raw(value.clone(), TimestampType::ArchiveTimestamp)
                        .map_err(|_| CadesError::ArchiveTimestampOrdering)?;

                Ok((token.generation_time(), *index))
            })
            .collect::<Result<Vec<_>, CadesError>>()?;

        // Most recent first.
        dated.sort_by(|a, b| b.0.cmp(&a.0));

        if dated.windows(2).any(|pair| pair[0].0 == pair[1].0) {
            return Err(CadesError::ArchiveTimestampOrdering);
        }

        let dropped = dated
            .iter()
            .skip(keep)
            .map(|(_, index)| *index)
            .collect::<Vec<_>>();

        debug!(
            "keeping {} of {} archive time-stamps",
            keep,
            archive_indices.len()
        );

        Ok(table.filtered(|index, _| !dropped.contains(&index)))
    }

    /// Produce the bytes covered by an archive time-stamp.
    pub fn build(&self, keep: usize) -> Result<Vec<u8>, CadesError> {
        let mut data = self.content()?;
        let content_len = data.len();

        if let Some(certificates) = &self.signed_data.certificates {
            data.extend_from_slice(RawValue::from_values(certificates.encode_ref()).as_slice());
        }

        if let Some(crls) = &self.signed_data.crls {
            data.extend_from_slice(RawValue::from_values(crls.encode_ref()).as_slice());
        }

        let retained = self.retained_attributes(keep)?;
        for attr in retained.iter() {
            data.extend_from_slice(RawValue::from_values(attr.encode_ref()).as_slice());
        }

        debug!(
            "archive data: {} content bytes, {} total bytes, {} attributes",
            content_len,
            data.len(),
            retained.len()
        );

        Ok(data)
    }
}
