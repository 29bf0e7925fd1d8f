// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Functionality for signing data. */

use {
    crate::{
        algorithm::{DigestAlgorithm, SignatureAlgorithm},
        asn1::{
            common::RawValue,
            rfc5652::{
                Attribute, CertificateSet, CmsVersion, DigestAlgorithmIdentifiers,
                EncapsulatedContentInfo, RevocationInfoChoices, SignedAttributes, SignedData,
                SignerIdentifier, SignerInfo, SignerInfos, OID_CONTENT_TYPE, OID_ID_DATA,
                OID_MESSAGE_DIGEST,
            },
            rfc5280::AlgorithmIdentifier,
        },
        certificate::{CapturedCertificate, CapturedCrl, CapturedOcspResponse},
        CadesError,
    },
    bcder::{encode::PrimitiveContent, OctetString, Oid},
    bytes::Bytes,
    log::debug,
    ring::{
        rand::SystemRandom,
        signature::{KeyPair, RsaKeyPair},
    },
};

/// A private key able to produce signatures.
pub trait SigningKey {
    /// The algorithm signatures are produced with.
    fn signature_algorithm(&self) -> SignatureAlgorithm;

    /// Sign `message`, returning the raw signature value.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CadesError>;
}

/// An RSA private key backed by `ring`.
pub struct RsaSigningKey {
    key_pair: RsaKeyPair,
    algorithm: SignatureAlgorithm,
}

impl RsaSigningKey {
    /// Load a key from PKCS#8 DER.
    ///
    /// Signatures default to RSA with SHA-256.
    pub fn from_pkcs8_der(data: &[u8]) -> Result<Self, CadesError> {
        Ok(Self {
            key_pair: RsaKeyPair::from_pkcs8(data)?,
            algorithm: SignatureAlgorithm::Sha256Rsa,
        })
    }

    /// Load a key from a PEM encoded PKCS#8 document.
    pub fn from_pkcs8_pem(data: &[u8]) -> Result<Self, CadesError> {
        let pem = pem::parse(data)?;

        Self::from_pkcs8_der(&pem.contents)
    }

    pub fn with_signature_algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// The DER `RSAPublicKey` of this key.
    pub fn public_key_data(&self) -> &[u8] {
        self.key_pair.public_key().as_ref()
    }
}

impl SigningKey for RsaSigningKey {
    fn signature_algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CadesError> {
        let mut signature = vec![0; self.key_pair.public_modulus_len()];

        self.key_pair
            .sign(
                self.algorithm.rsa_encoding(),
                &SystemRandom::new(),
                message,
                &mut signature,
            )
            .map_err(|_| CadesError::SignatureCreation)?;

        Ok(signature)
    }
}

/// Builder type to construct an entity that will sign some data.
///
/// Instances will be attached to `SignedDataBuilder` instances where they
/// will sign data using configured settings.
pub struct SignerBuilder<'a> {
    /// The cryptographic key used for signing content.
    signing_key: &'a dyn SigningKey,

    /// X.509 certificate used for signing.
    signing_certificate: CapturedCertificate,

    /// Content digest algorithm to use.
    digest_algorithm: DigestAlgorithm,

    /// Explicit content to use for calculating the `message-digest`
    /// attribute.
    message_digest_content: Option<Vec<u8>>,

    /// The content type of the value being signed.
    ///
    /// This is a mandatory field for signed attributes. The default value
    /// is `id-data`.
    content_type: Oid,

    /// Extra attributes to include in the SignedAttributes set.
    extra_signed_attributes: Vec<Attribute>,

    unsigned_attributes: Vec<Attribute>,
}

impl<'a> SignerBuilder<'a> {
    /// Construct a new entity that will sign content.
    pub fn new(signing_key: &'a dyn SigningKey, signing_certificate: CapturedCertificate) -> Self {
        Self {
            signing_key,
            signing_certificate,
            digest_algorithm: DigestAlgorithm::Sha256,
            message_digest_content: None,
            content_type: Oid(Bytes::copy_from_slice(OID_ID_DATA.as_ref())),
            extra_signed_attributes: Vec::new(),
            unsigned_attributes: Vec::new(),
        }
    }

    /// Obtain the signature algorithm used by the signing key.
    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        self.signing_key.signature_algorithm()
    }

    pub fn digest_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.digest_algorithm = algorithm;
        self
    }

    /// Define the content to use to calculate the `message-digest` attribute.
    ///
    /// Normally the encapsulated content is digested. Detached signatures
    /// and counter-signatures digest content that is not embedded.
    pub fn message_digest_content(mut self, data: Vec<u8>) -> Self {
        self.message_digest_content = Some(data);
        self
    }

    /// Define the content type of the signed content.
    pub fn content_type(mut self, oid: Oid) -> Self {
        self.content_type = oid;
        self
    }

    /// Add an additional attribute to sign.
    pub fn signed_attribute(mut self, attribute: Attribute) -> Self {
        self.extra_signed_attributes.push(attribute);
        self
    }

    pub fn signed_attributes(mut self, attributes: impl IntoIterator<Item = Attribute>) -> Self {
        self.extra_signed_attributes.extend(attributes);
        self
    }

    /// Add an attribute to the unsigned set.
    pub fn unsigned_attribute(mut self, attribute: Attribute) -> Self {
        self.unsigned_attributes.push(attribute);
        self
    }

    /// Produce the `SignerInfo` for content.
    fn build_signer_info(&self, content: Option<&[u8]>) -> Result<SignerInfo, CadesError> {
        let sid = SignerIdentifier::IssuerAndSerialNumber(
            self.signing_certificate.issuer_and_serial_number(),
        );

        let mut attributes = Vec::with_capacity(2 + self.extra_signed_attributes.len());

        // The content-type field is mandatory.
        attributes.push(Attribute::new(
            Oid(Bytes::copy_from_slice(OID_CONTENT_TYPE.as_ref())),
            RawValue::from_values(self.content_type.encode_ref()),
        ));

        // The message digest attribute is mandatory.
        //
        // The "empty" hash is a valid value if no content is being signed.
        let digest = self.digest_algorithm.digest(
            self.message_digest_content
                .as_deref()
                .or(content)
                .unwrap_or_default(),
        );
        attributes.push(Attribute::new(
            Oid(Bytes::copy_from_slice(OID_MESSAGE_DIGEST.as_ref())),
            RawValue::from_values(OctetString::new(Bytes::from(digest)).encode_ref()),
        ));

        attributes.extend(self.extra_signed_attributes.iter().cloned());

        let signed_attributes = SignedAttributes::from_attributes(attributes);

        // The signature covers the DER of the signed attributes as a SET.
        let signed_data = RawValue::from_values(signed_attributes.encode_ref());
        let signature = self.signing_key.sign(signed_data.as_slice())?;

        debug!(
            "signed {} bytes of signed attributes; signature is {} bytes",
            signed_data.as_slice().len(),
            signature.len()
        );

        Ok(SignerInfo {
            version: CmsVersion::V1,
            sid,
            digest_algorithm: self.digest_algorithm.into(),
            signed_attributes: Some(signed_attributes),
            signature_algorithm: AlgorithmIdentifier::from(self.signature_algorithm()),
            signature: OctetString::new(Bytes::from(signature)),
            unsigned_attributes: if self.unsigned_attributes.is_empty() {
                None
            } else {
                Some(self.unsigned_attributes.clone())
            },
        })
    }
}

/// Entity for incrementally deriving a SignedData primitive.
///
/// Use this type for generating an RFC 5652 payload for signed data.
pub struct SignedDataBuilder<'a> {
    /// Content to sign.
    signed_content: Option<Vec<u8>>,

    /// Whether the content is left out of the generated payload.
    detached: bool,

    /// `eContentType` of the encapsulated content.
    content_type: Oid,

    /// Entities who will generated signatures.
    signers: Vec<SignerBuilder<'a>>,

    /// X.509 certificates to add to the payload.
    certificates: Vec<CapturedCertificate>,

    /// Encoded `RevocationInfoChoice` entries.
    revocation_info: Vec<RawValue>,
}

impl<'a> Default for SignedDataBuilder<'a> {
    fn default() -> Self {
        Self {
            signed_content: None,
            detached: false,
            content_type: Oid(Bytes::copy_from_slice(OID_ID_DATA.as_ref())),
            signers: vec![],
            certificates: vec![],
            revocation_info: vec![],
        }
    }
}

impl<'a> SignedDataBuilder<'a> {
    /// Define the content to sign.
    pub fn signed_content(mut self, data: Vec<u8>) -> Self {
        self.signed_content = Some(data);
        self
    }

    /// Leave the signed content out of the payload.
    pub fn detached(mut self, detached: bool) -> Self {
        self.detached = detached;
        self
    }

    /// Define the type of the encapsulated content.
    ///
    /// Signers still need their own content type set to match.
    pub fn content_type(mut self, oid: Oid) -> Self {
        self.content_type = oid;
        self
    }

    /// Add a signer.
    ///
    /// The signer is the thing generating the cryptographic signature over
    /// data to be signed.
    pub fn signer(mut self, signer: SignerBuilder<'a>) -> Self {
        self.signers.push(signer);
        self
    }

    /// Add a certificate.
    pub fn certificate(mut self, cert: CapturedCertificate) -> Self {
        if !self.certificates.contains(&cert) {
            self.certificates.push(cert);
        }

        self
    }

    /// Add multiple certificates to the certificates chain.
    pub fn certificates(mut self, certs: impl IntoIterator<Item = CapturedCertificate>) -> Self {
        for cert in certs {
            self = self.certificate(cert);
        }

        self
    }

    pub fn crl(mut self, crl: CapturedCrl) -> Self {
        self.revocation_info.push(crl.raw().clone());
        self
    }

    pub fn ocsp_response(mut self, response: &CapturedOcspResponse) -> Self {
        self.revocation_info
            .push(response.to_revocation_info_choice());
        self
    }

    /// Construct the `SignedData` structure.
    pub fn build_signed_data(&self) -> Result<SignedData, CadesError> {
        let mut signer_infos = Vec::with_capacity(self.signers.len());
        let mut digest_algorithms: Vec<DigestAlgorithm> = Vec::new();
        let mut certificates = self.certificates.clone();

        for signer in &self.signers {
            if !digest_algorithms.contains(&signer.digest_algorithm) {
                digest_algorithms.push(signer.digest_algorithm);
            }

            if !certificates.contains(&signer.signing_certificate) {
                certificates.push(signer.signing_certificate.clone());
            }

            signer_infos.push(signer.build_signer_info(self.signed_content.as_deref())?);
        }

        Ok(SignedData {
            version: CmsVersion::V1,
            digest_algorithms: DigestAlgorithmIdentifiers(
                digest_algorithms.into_iter().map(|alg| alg.into()).collect(),
            ),
            content_info: EncapsulatedContentInfo {
                content_type: self.content_type.clone(),
                content: match (&self.signed_content, self.detached) {
                    (Some(content), false) => {
                        Some(OctetString::new(Bytes::copy_from_slice(content)))
                    }
                    _ => None,
                },
            },
            certificates: if certificates.is_empty() {
                None
            } else {
                Some(CertificateSet(
                    certificates.into_iter().map(|cert| cert.raw().clone()).collect(),
                ))
            },
            crls: if self.revocation_info.is_empty() {
                None
            } else {
                Some(RevocationInfoChoices(self.revocation_info.clone()))
            },
            signer_infos: SignerInfos(signer_infos),
        })
    }

    /// Construct a DER-encoded `ContentInfo` containing a `SignedData` object.
    pub fn build_der(&self) -> Result<Vec<u8>, CadesError> {
        let signed_data = self.build_signed_data()?;

        Ok(RawValue::from_values(signed_data.encode_content_info())
            .as_slice()
            .to_vec())
    }
}
