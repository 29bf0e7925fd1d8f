// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CAdES-BES signed attributes.

use {
    super::{owned_oid, ExtensionContext, ProfileStage},
    crate::{
        algorithm::DigestAlgorithm,
        asn1::{
            common::{RawValue, Time, Utf8Value},
            rfc5126::{
                EssCertId, EssCertIdV2, SignerAttribute, SigningCertificate,
                SigningCertificateV2, OID_SIGNER_ATTR, OID_SIGNING_CERTIFICATE,
                OID_SIGNING_CERTIFICATE_V2,
            },
            rfc5280::OID_COMMON_NAME,
            rfc5652::{Attribute, OID_SIGNING_TIME},
        },
        certificate::CapturedCertificate,
        settings::{SignatureFormat, SignatureParameters},
        signer::SignerRecord,
        CadesError,
    },
    bcder::{encode::PrimitiveContent, OctetString},
    bytes::Bytes,
    chrono::Utc,
};

/// The baseline signature.
///
/// Contributes the signing certificate reference, the signing time and
/// the claimed role. Adds nothing to an existing signature.
#[derive(Clone, Copy, Debug, Default)]
pub struct BesStage;

/// The signingCertificate attribute for SHA-1, signingCertificateV2 for
/// anything else.
pub fn signing_certificate_attribute(
    certificate: &CapturedCertificate,
    algorithm: DigestAlgorithm,
) -> Attribute {
    let cert_hash = OctetString::new(Bytes::from(certificate.digest(algorithm)));
    let issuer_serial = Some(certificate.issuer_serial());

    if algorithm == DigestAlgorithm::Sha1 {
        let value = SigningCertificate {
            certs: vec![EssCertId {
                cert_hash,
                issuer_serial,
            }],
            policies: None,
        };

        Attribute::new(
            owned_oid(&OID_SIGNING_CERTIFICATE),
            RawValue::from_values(value.encode_ref()),
        )
    } else {
        let value = SigningCertificateV2 {
            certs: vec![EssCertIdV2 {
                // SHA-256 is the DEFAULT and must be omitted.
                hash_algorithm: if algorithm == DigestAlgorithm::Sha256 {
                    None
                } else {
                    Some(algorithm.into())
                },
                cert_hash,
                issuer_serial,
            }],
            policies: None,
        };

        Attribute::new(
            owned_oid(&OID_SIGNING_CERTIFICATE_V2),
            RawValue::from_values(value.encode_ref()),
        )
    }
}

fn claimed_role_attribute(role: &str) -> Attribute {
    let role = Attribute::new(
        owned_oid(&OID_COMMON_NAME),
        RawValue::from_values(Utf8Value::new(role).encode_ref()),
    );

    let value = SignerAttribute {
        claimed_attributes: vec![RawValue::from_values(role.encode_ref())],
        certified_attributes: vec![],
    };

    Attribute::new(
        owned_oid(&OID_SIGNER_ATTR),
        RawValue::from_values(value.encode_ref()),
    )
}

impl ProfileStage for BesStage {
    fn format(&self) -> SignatureFormat {
        SignatureFormat::CadesBes
    }

    fn signed_attributes(
        &self,
        parameters: &SignatureParameters,
        certificate: &CapturedCertificate,
    ) -> Result<Vec<Attribute>, CadesError> {
        let mut attributes = vec![signing_certificate_attribute(
            certificate,
            parameters.digest_algorithm(),
        )];

        // PAdES carries these in the signature dictionary.
        if !parameters.pades_usage() {
            let time = Time::from(parameters.signing_date().unwrap_or_else(Utc::now));
            attributes.push(Attribute::new(
                owned_oid(&OID_SIGNING_TIME),
                RawValue::from_values(time.encode_ref()),
            ));

            if let Some(role) = parameters.claimed_role() {
                attributes.push(claimed_role_attribute(role));
            }
        }

        Ok(attributes)
    }

    fn apply(
        &self,
        record: &SignerRecord,
        _context: &ExtensionContext,
    ) -> Result<SignerRecord, CadesError> {
        Ok(record.clone())
    }
}
