pub mod resolver;
pub mod source;

use std::fmt;

use bon::Builder;
use const_oid::ObjectIdentifier;
use der::{Decode, asn1::BitString};
use ecdsa::signature::{SignatureEncoding, Signer};
use ed25519_dalek::{SigningKey as Ed25519SigningKey, VerifyingKey as Ed25519VerifyingKey};
use p256::ecdsa::{SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey};
use p384::ecdsa::{SigningKey as P384SigningKey, VerifyingKey as P384VerifyingKey};
use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs1v15::SigningKey as RsaSigningKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::cert::SignatureAlgorithm;
use crate::error::{CertMintError, Result};

pub use resolver::KeyResolver;
pub use source::{EnvKeySource, FileKeySource, KeySource, MemoryKeySource};

/// An opaque reference to private key material.
///
/// Only the [`KeyResolver`] interprets it: `key_type` selects how the material
/// is decoded and signed with, `key_identity` selects which material the
/// configured [`KeySource`] returns.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Builder)]
pub struct KeyIdentity {
    #[builder(into)]
    pub key_type: String,
    #[builder(into)]
    pub key_identity: String,
}

impl KeyIdentity {
    pub fn new(key_type: impl Into<String>, key_identity: impl Into<String>) -> Self {
        Self {
            key_type: key_type.into(),
            key_identity: key_identity.into(),
        }
    }
}

impl fmt::Display for KeyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key_type, self.key_identity)
    }
}

/// Key algorithms a [`KeyIdentity`] may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Rsa,
    EcdsaP256,
    EcdsaP384,
    Ed25519,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Rsa => "rsa",
            KeyType::EcdsaP256 => "ecdsa-p256",
            KeyType::EcdsaP384 => "ecdsa-p384",
            KeyType::Ed25519 => "ed25519",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for KeyType {
    type Error = CertMintError;

    fn try_from(value: &str) -> Result<Self> {
        match value {
            "rsa" => Ok(KeyType::Rsa),
            "ecdsa-p256" => Ok(KeyType::EcdsaP256),
            "ecdsa-p384" => Ok(KeyType::EcdsaP384),
            "ed25519" => Ok(KeyType::Ed25519),
            other => Err(CertMintError::DecodingError(format!(
                "'{other}' is not a supported key type (expected one of rsa, ecdsa-p256, ecdsa-p384, ed25519)"
            ))),
        }
    }
}

/// Private key material together with its public half.
#[derive(Debug, Clone)]
pub enum KeyPair {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
    EcdsaP256 {
        signing_key: P256SigningKey,
        verifying_key: P256VerifyingKey,
    },
    EcdsaP384 {
        signing_key: P384SigningKey,
        verifying_key: P384VerifyingKey,
    },
    Ed25519 {
        signing_key: Ed25519SigningKey,
    },
}

impl KeyPair {
    /// Generate an RSA key pair with the specified number of bits.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        let mut rng = rand_core::OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| CertMintError::EncodingError(format!("RSA key generation failed: {e}")))?;
        Ok(Self::from_rsa(private))
    }

    /// Generate an ECDSA P-256 key pair.
    pub fn generate_ecdsa_p256() -> Self {
        let signing_key = P256SigningKey::random(&mut rand_core::OsRng);
        let verifying_key = *signing_key.verifying_key();
        KeyPair::EcdsaP256 {
            signing_key,
            verifying_key,
        }
    }

    /// Generate an ECDSA P-384 key pair.
    pub fn generate_ecdsa_p384() -> Self {
        let signing_key = P384SigningKey::random(&mut rand_core::OsRng);
        let verifying_key = *signing_key.verifying_key();
        KeyPair::EcdsaP384 {
            signing_key,
            verifying_key,
        }
    }

    /// Generate an Ed25519 key pair.
    pub fn generate_ed25519() -> Self {
        let signing_key = Ed25519SigningKey::generate(&mut rand_core::OsRng);
        KeyPair::Ed25519 { signing_key }
    }

    fn from_rsa(private: RsaPrivateKey) -> Self {
        let public = RsaPublicKey::from(&private);
        KeyPair::Rsa {
            private: Box::new(private),
            public,
        }
    }

    /// Decode PEM private key material as the given key type.
    ///
    /// Every type accepts PKCS#8 (`PRIVATE KEY`); RSA additionally accepts
    /// PKCS#1 (`RSA PRIVATE KEY`).
    pub fn from_pem(key_type: KeyType, material: &str) -> Result<Self> {
        let block = pem::parse(material)?;
        let der = block.contents();
        let decoding = |e: pkcs8::Error| {
            CertMintError::DecodingError(format!("malformed {key_type} private key: {e}"))
        };

        match (key_type, block.tag()) {
            (KeyType::Rsa, "PRIVATE KEY") => {
                Ok(Self::from_rsa(RsaPrivateKey::from_pkcs8_der(der).map_err(decoding)?))
            }
            (KeyType::Rsa, "RSA PRIVATE KEY") => {
                let private = RsaPrivateKey::from_pkcs1_der(der).map_err(|e| {
                    CertMintError::DecodingError(format!("malformed rsa private key: {e}"))
                })?;
                Ok(Self::from_rsa(private))
            }
            (KeyType::EcdsaP256, "PRIVATE KEY") => {
                let signing_key = P256SigningKey::from_pkcs8_der(der).map_err(decoding)?;
                let verifying_key = *signing_key.verifying_key();
                Ok(KeyPair::EcdsaP256 {
                    signing_key,
                    verifying_key,
                })
            }
            (KeyType::EcdsaP384, "PRIVATE KEY") => {
                let signing_key = P384SigningKey::from_pkcs8_der(der).map_err(decoding)?;
                let verifying_key = *signing_key.verifying_key();
                Ok(KeyPair::EcdsaP384 {
                    signing_key,
                    verifying_key,
                })
            }
            (KeyType::Ed25519, "PRIVATE KEY") => {
                let signing_key = Ed25519SigningKey::from_pkcs8_der(der).map_err(decoding)?;
                Ok(KeyPair::Ed25519 { signing_key })
            }
            (key_type, tag) => Err(CertMintError::DecodingError(format!(
                "a PEM block labelled '{tag}' cannot hold a {key_type} private key"
            ))),
        }
    }

    /// Encode the private key as PKCS#8 PEM.
    pub fn to_pkcs8_pem(&self) -> Result<String> {
        let pem = match self {
            KeyPair::Rsa { private, .. } => private.to_pkcs8_pem(LineEnding::LF),
            KeyPair::EcdsaP256 { signing_key, .. } => signing_key.to_pkcs8_pem(LineEnding::LF),
            KeyPair::EcdsaP384 { signing_key, .. } => signing_key.to_pkcs8_pem(LineEnding::LF),
            KeyPair::Ed25519 { signing_key } => signing_key.to_pkcs8_pem(LineEnding::LF),
        }
        .map_err(|e| CertMintError::EncodingError(e.to_string()))?;
        Ok(pem.to_string())
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            KeyPair::Rsa { .. } => KeyType::Rsa,
            KeyPair::EcdsaP256 { .. } => KeyType::EcdsaP256,
            KeyPair::EcdsaP384 { .. } => KeyType::EcdsaP384,
            KeyPair::Ed25519 { .. } => KeyType::Ed25519,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_key_pair(self)
    }

    /// The signature algorithm implied by the key type.
    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        match self {
            KeyPair::Rsa { .. } => SignatureAlgorithm::Sha256WithRSA,
            KeyPair::EcdsaP256 { .. } => SignatureAlgorithm::Sha256WithECDSA,
            KeyPair::EcdsaP384 { .. } => SignatureAlgorithm::Sha384WithECDSA,
            KeyPair::Ed25519 { .. } => SignatureAlgorithm::Ed25519,
        }
    }

    /// Sign `data` with the algorithm returned by [`Self::signature_algorithm`].
    ///
    /// ECDSA signatures are DER encoded as X.509 requires. All supported
    /// schemes are deterministic.
    pub fn sign_data(&self, data: &[u8]) -> Result<Vec<u8>> {
        let failure = |e: ecdsa::signature::Error| CertMintError::SigningFailure(e.to_string());
        match self {
            KeyPair::Rsa { private, .. } => {
                let signing_key = RsaSigningKey::<Sha256>::new((**private).clone());
                let signature = signing_key.try_sign(data).map_err(failure)?;
                Ok(signature.to_vec())
            }
            KeyPair::EcdsaP256 { signing_key, .. } => {
                let signature: p256::ecdsa::DerSignature =
                    signing_key.try_sign(data).map_err(failure)?;
                Ok(signature.to_vec())
            }
            KeyPair::EcdsaP384 { signing_key, .. } => {
                let signature: p384::ecdsa::DerSignature =
                    signing_key.try_sign(data).map_err(failure)?;
                Ok(signature.to_vec())
            }
            KeyPair::Ed25519 { signing_key } => {
                let signature = signing_key.try_sign(data).map_err(failure)?;
                Ok(signature.to_bytes().to_vec())
            }
        }
    }
}

/// A public key of one of the supported [`KeyType`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    EcdsaP256(P256VerifyingKey),
    EcdsaP384(P384VerifyingKey),
    Ed25519(Ed25519VerifyingKey),
}

impl PublicKey {
    pub fn from_key_pair(key_pair: &KeyPair) -> Self {
        match key_pair {
            KeyPair::Rsa { public, .. } => PublicKey::Rsa(public.clone()),
            KeyPair::EcdsaP256 { verifying_key, .. } => PublicKey::EcdsaP256(*verifying_key),
            KeyPair::EcdsaP384 { verifying_key, .. } => PublicKey::EcdsaP384(*verifying_key),
            KeyPair::Ed25519 { signing_key } => PublicKey::Ed25519(signing_key.verifying_key()),
        }
    }

    /// Decode a PEM public key: SPKI (`PUBLIC KEY`) for every supported type,
    /// or PKCS#1 (`RSA PUBLIC KEY`).
    pub fn from_pem(pem_str: &str) -> Result<Self> {
        let block = pem::parse(pem_str).map_err(|e| {
            CertMintError::UnsupportedPublicKeyEncoding(format!("not a PEM document: {e}"))
        })?;

        match block.tag() {
            "PUBLIC KEY" => Self::from_spki_der(block.contents()),
            "RSA PUBLIC KEY" => RsaPublicKey::from_pkcs1_der(block.contents())
                .map(PublicKey::Rsa)
                .map_err(|e| CertMintError::UnsupportedPublicKeyEncoding(e.to_string())),
            other => Err(CertMintError::UnsupportedPublicKeyEncoding(format!(
                "a PEM block labelled '{other}' is not a public key"
            ))),
        }
    }

    /// Decode a DER `SubjectPublicKeyInfo`, dispatching on its algorithm.
    pub fn from_spki_der(der: &[u8]) -> Result<Self> {
        let unsupported = |e: pkcs8::spki::Error| {
            CertMintError::UnsupportedPublicKeyEncoding(e.to_string())
        };
        let spki = SubjectPublicKeyInfoOwned::from_der(der)
            .map_err(|e| CertMintError::UnsupportedPublicKeyEncoding(e.to_string()))?;

        match spki.algorithm.oid {
            const_oid::db::rfc5912::RSA_ENCRYPTION => RsaPublicKey::from_public_key_der(der)
                .map(PublicKey::Rsa)
                .map_err(unsupported),
            const_oid::db::rfc5912::ID_EC_PUBLIC_KEY => {
                let curve = spki
                    .algorithm
                    .parameters
                    .as_ref()
                    .and_then(|p| p.decode_as::<ObjectIdentifier>().ok());
                match curve {
                    Some(const_oid::db::rfc5912::SECP_256_R_1) => {
                        P256VerifyingKey::from_public_key_der(der)
                            .map(PublicKey::EcdsaP256)
                            .map_err(unsupported)
                    }
                    Some(const_oid::db::rfc5912::SECP_384_R_1) => {
                        P384VerifyingKey::from_public_key_der(der)
                            .map(PublicKey::EcdsaP384)
                            .map_err(unsupported)
                    }
                    other => Err(CertMintError::UnsupportedPublicKeyEncoding(format!(
                        "unsupported elliptic curve {other:?}"
                    ))),
                }
            }
            const_oid::db::rfc8410::ID_ED_25519 => Ed25519VerifyingKey::from_public_key_der(der)
                .map(PublicKey::Ed25519)
                .map_err(unsupported),
            other => Err(CertMintError::UnsupportedPublicKeyEncoding(format!(
                "unsupported public key algorithm {other}"
            ))),
        }
    }

    /// Encode as a DER `SubjectPublicKeyInfo`.
    pub fn to_spki_der(&self) -> Result<Vec<u8>> {
        let document = match self {
            PublicKey::Rsa(key) => key.to_public_key_der(),
            PublicKey::EcdsaP256(key) => key.to_public_key_der(),
            PublicKey::EcdsaP384(key) => key.to_public_key_der(),
            PublicKey::Ed25519(key) => key.to_public_key_der(),
        }?;
        Ok(document.as_bytes().to_vec())
    }

    pub fn to_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        Ok(SubjectPublicKeyInfoOwned::from_der(&self.to_spki_der()?)?)
    }

    /// The raw `subjectPublicKey` bits, the input to key identifiers.
    pub fn key_bits(&self) -> Result<BitString> {
        Ok(self.to_spki()?.subject_public_key)
    }

    /// Encode as SPKI PEM (`-----BEGIN PUBLIC KEY-----`).
    pub fn to_pem(&self) -> Result<String> {
        let pem = match self {
            PublicKey::Rsa(key) => key.to_public_key_pem(LineEnding::LF),
            PublicKey::EcdsaP256(key) => key.to_public_key_pem(LineEnding::LF),
            PublicKey::EcdsaP384(key) => key.to_public_key_pem(LineEnding::LF),
            PublicKey::Ed25519(key) => key.to_public_key_pem(LineEnding::LF),
        }?;
        Ok(pem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_type_names_round_trip() {
        for key_type in [
            KeyType::Rsa,
            KeyType::EcdsaP256,
            KeyType::EcdsaP384,
            KeyType::Ed25519,
        ] {
            assert_eq!(KeyType::try_from(key_type.as_str()).unwrap(), key_type);
        }
        assert!(KeyType::try_from("dsa").is_err());
    }

    #[test]
    fn pkcs8_import_preserves_public_key() {
        let original = KeyPair::generate_ecdsa_p256();
        let pem = original.to_pkcs8_pem().unwrap();
        let imported = KeyPair::from_pem(KeyType::EcdsaP256, &pem).unwrap();
        assert_eq!(original.public_key(), imported.public_key());
    }

    #[test]
    fn key_type_must_match_material() {
        let pem = KeyPair::generate_ed25519().to_pkcs8_pem().unwrap();
        assert!(KeyPair::from_pem(KeyType::EcdsaP256, &pem).is_err());
    }

    #[test]
    fn public_key_pem_decodes_back() {
        for key_pair in [KeyPair::generate_ecdsa_p384(), KeyPair::generate_ed25519()] {
            let public = key_pair.public_key();
            let pem = public.to_pem().unwrap();
            assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
            assert_eq!(PublicKey::from_pem(&pem).unwrap(), public);
        }
    }

    #[test]
    fn certificate_pem_is_not_a_public_key() {
        let pem = "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n";
        assert!(matches!(
            PublicKey::from_pem(pem),
            Err(CertMintError::UnsupportedPublicKeyEncoding(_))
        ));
    }

    #[test]
    fn ed25519_signatures_are_deterministic() {
        let key_pair = KeyPair::generate_ed25519();
        let first = key_pair.sign_data(b"payload").unwrap();
        let second = key_pair.sign_data(b"payload").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }
}
