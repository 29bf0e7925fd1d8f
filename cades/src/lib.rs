// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! CMS Advanced Electronic Signatures (CAdES) in Pure Rust

This crate creates CAdES signatures and extends existing ones along the
profile chain defined by ETSI TS 101 733 / RFC 5126:

* **CAdES-BES**: a CMS `SignedData` (RFC 5652) whose signer carries a
  signing-certificate-v2 (or v1 for SHA-1) attribute.
* **CAdES-EPES**: BES plus a signature-policy-identifier.
* **CAdES-T**: a signature time-stamp (RFC 3161) over the signature value.
* **CAdES-C**: complete certificate and revocation references.
* **CAdES-X**: a time-stamp over the references (type 1 or type 2).
* **CAdES-XL**: the referenced certificates and revocation values.
* **CAdES-A**: archive time-stamps, renewable by extending again.

Each level is a [profile::ProfileStage]. A [SignatureExtensionDriver] runs
the stages for every signer of a container, counter-signatures included,
and [CadesService] wraps signing and extension behind one facade.

Time-stamping and certificate validation are not implemented here. They are
provided by callers through [timestamp::TimestampSource] and
[validation::CertificateVerifier]. [timestamp::Rfc3161TimestampSource]
speaks the RFC 3161 protocol over any [timestamp::TimeStampTransport].

# Technical Notes

All ASN.1 structures are defined in [asn1] and serialized with `bcder`.
Signer records are re-encoded from their decoded form when a container is
written, while signed attributes are kept as captured so the signature over
them stays valid.

You can inspect produced signatures with OpenSSL:

   $ openssl cms -cmsout -print -inform DER -in <filename>
   $ openssl asn1parse -inform DER -in <filename>

# Security

Extension embeds whatever validation material the configured
[validation::CertificateVerifier] reports. This crate does not decide
whether a certificate is trustworthy.
*/

pub mod algorithm;
pub mod archive;
pub mod asn1;
pub mod attributes;
pub mod certificate;
pub mod document;
mod error;
pub mod extension;
pub mod profile;
pub mod service;
pub mod settings;
mod signature;
pub mod signer;
pub mod signing;
pub mod timestamp;
pub mod validation;

#[cfg(test)]
mod testutil;

pub use {
    bcder::Oid,
    bytes::Bytes,
    error::CadesError,
    extension::{ExtensionOutput, SignatureExtensionDriver, SignerOutcome},
    service::CadesService,
    settings::{
        ExtensionGuard, SignatureFormat, SignaturePackaging, SignatureParameters, SignaturePolicy,
    },
    signature::{CadesSignature, SignatureLevel, SignerView},
};
