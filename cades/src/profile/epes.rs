// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CAdES-EPES signed attributes.

use {
    super::{owned_oid, ExtensionContext, ProfileStage},
    crate::{
        asn1::{
            common::RawValue,
            rfc5126::{
                OtherHashAlgAndValue, SignaturePolicyId, SignaturePolicyIdentifier,
                OID_SIG_POLICY_ID,
            },
            rfc5652::Attribute,
        },
        certificate::CapturedCertificate,
        settings::{SignatureFormat, SignatureParameters, SignaturePolicy},
        signer::SignerRecord,
        CadesError,
    },
    bcder::OctetString,
    bytes::Bytes,
};

/// Commits the signer to a signature policy.
#[derive(Clone, Copy, Debug, Default)]
pub struct EpesStage;

fn policy_identifier(policy: &SignaturePolicy) -> Option<SignaturePolicyIdentifier> {
    match policy {
        SignaturePolicy::NoPolicy => None,
        SignaturePolicy::Implicit => Some(SignaturePolicyIdentifier::Implied),
        SignaturePolicy::Explicit {
            id,
            digest_algorithm,
            digest_value,
        } => Some(SignaturePolicyIdentifier::Id(SignaturePolicyId {
            sig_policy_id: id.clone(),
            sig_policy_hash: OtherHashAlgAndValue {
                hash_algorithm: (*digest_algorithm).into(),
                hash_value: OctetString::new(Bytes::copy_from_slice(digest_value)),
            },
            sig_policy_qualifiers: None,
        })),
    }
}

impl ProfileStage for EpesStage {
    fn format(&self) -> SignatureFormat {
        SignatureFormat::CadesEpes
    }

    fn signed_attributes(
        &self,
        parameters: &SignatureParameters,
        _certificate: &CapturedCertificate,
    ) -> Result<Vec<Attribute>, CadesError> {
        Ok(policy_identifier(parameters.policy())
            .map(|policy| {
                Attribute::new(
                    owned_oid(&OID_SIG_POLICY_ID),
                    RawValue::from_values(policy.encode_ref()),
                )
            })
            .into_iter()
            .collect())
    }

    fn apply(
        &self,
        record: &SignerRecord,
        _context: &ExtensionContext,
    ) -> Result<SignerRecord, CadesError> {
        Ok(record.clone())
    }
}
