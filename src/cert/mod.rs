pub mod extensions;
pub mod params;

use der::asn1::AnyRef;
use der::{Decode, Encode, EncodePem};
use x509_cert::certificate::CertificateInner;

use crate::error::{CertMintError, Result};
use crate::issuer::{Issuer, RequestIssuer};
use crate::key::{KeyPair, PublicKey};
use crate::pem_utils::pem_to_der;
use params::CertificationRequestInfo;

pub use params::{
    BasicConstraintsExtension, CertificateBuildRequest, DistinguishedName, ExtensionParam,
    KeyUsageExtension, Validity,
};

/// Represents the supported signature algorithms for certificates.
///
/// This enum provides a mapping to the corresponding OIDs for each algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption (PKCS#1 v1.5).
    Sha256WithRSA,
    /// SHA-256 with ECDSA.
    Sha256WithECDSA,
    /// SHA-384 with ECDSA.
    Sha384WithECDSA,
    /// Pure Ed25519.
    Ed25519,
}

impl From<SignatureAlgorithm> for x509_cert::spki::AlgorithmIdentifierOwned {
    /// Converts a `SignatureAlgorithm` into an `AlgorithmIdentifierOwned`.
    ///
    /// RSA carries explicit NULL parameters (RFC 4055); ECDSA and Ed25519
    /// carry none.
    fn from(value: SignatureAlgorithm) -> Self {
        match value {
            SignatureAlgorithm::Sha256WithRSA => x509_cert::spki::AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
                parameters: Some(AnyRef::NULL.into()),
            },
            SignatureAlgorithm::Sha256WithECDSA => x509_cert::spki::AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
                parameters: None,
            },
            SignatureAlgorithm::Sha384WithECDSA => x509_cert::spki::AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_384,
                parameters: None,
            },
            SignatureAlgorithm::Ed25519 => x509_cert::spki::AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc8410::ID_ED_25519,
                parameters: None,
            },
        }
    }
}

/// Represents a signed X.509 certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
}

impl Certificate {
    /// Build and sign a certificate for `request` with the already resolved
    /// signing key.
    ///
    /// Fails as a whole: no partially built certificate is ever returned.
    pub fn build(request: &CertificateBuildRequest, signing_key: &KeyPair) -> Result<Self> {
        let subject_public_key = match &request.subject_public_key {
            Some(pem) => PublicKey::from_pem(pem)?,
            None => signing_key.public_key(),
        };

        let certification_request = CertificationRequestInfo {
            subject: request.subject_name.clone(),
            subject_public_key,
            serial: request.serial,
            validity: request.validity()?,
            extensions: extensions::ExtensionPolicy::new(
                request.basic_constraints,
                request.key_usage,
            )
            .build()?,
        };

        let issuer = RequestIssuer {
            name: &request.issuer_name,
            key: signing_key,
        };
        issuer.issue(&certification_request)
    }

    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| CertMintError::EncodingError(e.to_string()))
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = CertificateInner::from_der(der)
            .map_err(|e| CertMintError::DecodingError(e.to_string()))?;
        Ok(Self { inner })
    }

    pub fn from_pem(pem: &str) -> Result<Self> {
        Self::from_der(&pem_to_der(pem, "CERTIFICATE")?)
    }

    /// Encodes the certificate into PEM format.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| CertMintError::EncodingError(e.to_string()))
    }

    /// The subject public key carried by the certificate.
    pub fn subject_public_key(&self) -> Result<PublicKey> {
        let spki = self.inner.tbs_certificate.subject_public_key_info.to_der()?;
        PublicKey::from_spki_der(&spki)
    }

    pub fn subject(&self) -> Result<DistinguishedName> {
        DistinguishedName::from_x509_name(&self.inner.tbs_certificate.subject)
    }

    pub fn issuer(&self) -> Result<DistinguishedName> {
        DistinguishedName::from_x509_name(&self.inner.tbs_certificate.issuer)
    }

    /// The certificate's extensions, in encoded order.
    pub fn extensions(&self) -> Vec<ExtensionParam> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .map(|ext| ExtensionParam {
                oid: ext.extn_id,
                critical: ext.critical,
                value: ext.extn_value.as_bytes().to_vec(),
            })
            .collect()
    }

    /// Finds and decodes one extension, if present.
    pub fn extension<E: extensions::ToAndFromX509Extension>(&self) -> Result<Option<E>> {
        self.extensions()
            .iter()
            .find(|ext| ext.oid == E::OID)
            .map(|ext| ext.to_extension())
            .transpose()
    }
}

