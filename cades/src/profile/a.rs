// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! CAdES-A: archive time-stamps.

Every application adds a new archive-time-stamp-v2 covering the content,
the embedded validation material and all unsigned attributes, including
earlier archive time-stamps. Renewing an archive signature is therefore
just applying this stage again.
*/

use {
    super::{request_timestamp, with_timestamp, Collaborators, ExtensionContext, ProfileStage},
    crate::{
        asn1::rfc5126::OID_ARCHIVE_TIMESTAMP_V2,
        settings::{SignatureFormat, SignatureParameters},
        signer::SignerRecord,
        timestamp::TimestampType,
        CadesError,
    },
    log::info,
};

/// Adds an archive-time-stamp-v2.
#[derive(Clone, Copy, Debug, Default)]
pub struct ArchiveStage;

impl ProfileStage for ArchiveStage {
    fn format(&self) -> SignatureFormat {
        SignatureFormat::CadesA
    }

    fn check(
        &self,
        _parameters: &SignatureParameters,
        collaborators: &Collaborators,
    ) -> Result<(), CadesError> {
        collaborators.timestamp_source().map(|_| ())
    }

    fn apply(
        &self,
        record: &SignerRecord,
        context: &ExtensionContext,
    ) -> Result<SignerRecord, CadesError> {
        let source = context.collaborators.timestamp_source()?;

        let existing = record.unsigned_attributes().count(&OID_ARCHIVE_TIMESTAMP_V2);
        let data = context
            .view(record)
            .archive_timestamp_data(existing, context.original)?;

        let token = request_timestamp(source, &data, TimestampType::ArchiveTimestamp)?;
        info!(
            "archive time-stamp {} generated at {}",
            existing + 1,
            token.generation_time()
        );

        Ok(with_timestamp(record, &token))
    }
}
