// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CAdES-T: a time-stamp over the signature value.

use {
    super::{request_timestamp, with_timestamp, Collaborators, ExtensionContext, ProfileStage},
    crate::{
        settings::{SignatureFormat, SignatureParameters},
        signer::SignerRecord,
        timestamp::TimestampType,
        CadesError,
    },
    log::info,
};

/// Adds a signatureTimeStampToken.
///
/// Does not look for an existing one. Guarding against applying it twice
/// is the driver's job.
#[derive(Clone, Copy, Debug, Default)]
pub struct SignatureTimestampStage;

impl ProfileStage for SignatureTimestampStage {
    fn format(&self) -> SignatureFormat {
        SignatureFormat::CadesT
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
        let data = context.view(record).signature_timestamp_data();

        let token = request_timestamp(source, &data, TimestampType::SignatureTimestamp)?;
        info!(
            "signature time-stamp obtained; generated at {}",
            token.generation_time()
        );

        Ok(with_timestamp(record, &token))
    }
}
