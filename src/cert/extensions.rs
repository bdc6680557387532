use const_oid::AssociatedOid;
use der::{
    Decode, Encode,
    asn1::OctetString,
    oid::ObjectIdentifier,
};
use sha1::{Digest, Sha1};

pub use der::flagset::FlagSet;
use x509_cert::ext::pkix::KeyUsage as X509KeyUsage;
pub use x509_cert::ext::pkix::KeyUsages;

use super::params::{BasicConstraintsExtension, ExtensionParam, KeyUsageExtension};
use crate::error::{CertMintError, Result};
use crate::key::PublicKey;

/// Trait for converting to and from X.509 extensions.
///
/// This trait provides methods to encode and decode X.509 extension values.
///
/// # Example
/// ```
/// use certmint::cert::extensions::{BasicConstraints, ToAndFromX509Extension};
/// let bc = BasicConstraints { is_ca: true, max_path_length: None };
/// let encoded = bc.to_x509_extension_value().unwrap();
/// let decoded = BasicConstraints::from_x509_extension_value(&encoded).unwrap();
/// assert!(decoded.is_ca);
/// ```
pub trait ToAndFromX509Extension {
    /// The Object Identifier (OID) for the extension.
    const OID: ObjectIdentifier;

    /// Encodes the extension into a DER-encoded byte vector.
    fn to_x509_extension_value(&self) -> Result<Vec<u8>>;

    /// Decodes the extension from a DER-encoded byte slice.
    fn from_x509_extension_value(extension: &[u8]) -> Result<Self>
    where
        Self: Sized;
}

/// Represents the Basic Constraints extension.
///
/// # Fields
/// * `is_ca` - Indicates if the certificate is a CA.
/// * `max_path_length` - The maximum number of intermediate CAs allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BasicConstraints {
    pub is_ca: bool,
    pub max_path_length: Option<u8>,
}

impl ToAndFromX509Extension for BasicConstraints {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::BasicConstraints::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let bc = x509_cert::ext::pkix::BasicConstraints {
            ca: self.is_ca,
            path_len_constraint: self.max_path_length,
        };

        Ok(bc.to_der()?)
    }

    fn from_x509_extension_value(der_bytes: &[u8]) -> Result<Self> {
        let bc = x509_cert::ext::pkix::BasicConstraints::from_der(der_bytes)?;
        Ok(Self {
            is_ca: bc.ca,
            max_path_length: bc.path_len_constraint,
        })
    }
}

/// Represents the Key Usage extension.
///
/// An empty flag set is still a present extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage(pub FlagSet<KeyUsages>);

impl ToAndFromX509Extension for KeyUsage {
    const OID: ObjectIdentifier = <X509KeyUsage as AssociatedOid>::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        Ok(X509KeyUsage(self.0).to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let ku = X509KeyUsage::from_der(extension)?;
        Ok(Self(ku.0))
    }
}

/// Represents the Subject Key Identifier extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectKeyIdentifier {
    pub key_identifier: Vec<u8>,
}

impl SubjectKeyIdentifier {
    /// RFC 5280 method 1: SHA-1 over the `subjectPublicKey` bits.
    pub fn for_key(key: &PublicKey) -> Result<Self> {
        Ok(Self {
            key_identifier: key_id(key)?,
        })
    }
}

impl ToAndFromX509Extension for SubjectKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier(OctetString::new(
            self.key_identifier.as_slice(),
        )?);
        Ok(ski.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier::from_der(extension)?;
        Ok(Self {
            key_identifier: ski.0.as_bytes().to_vec(),
        })
    }
}

/// Represents the Authority Key Identifier (AKI) extension.
///
/// Only the `keyIdentifier` form is produced: the SHA-1 of the signing
/// key's public bits, matching the issuer's Subject Key Identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityKeyIdentifier {
    pub key_identifier: Vec<u8>,
}

impl AuthorityKeyIdentifier {
    pub fn for_key(key: &PublicKey) -> Result<Self> {
        Ok(Self {
            key_identifier: key_id(key)?,
        })
    }
}

impl ToAndFromX509Extension for AuthorityKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::AuthorityKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier {
            key_identifier: Some(OctetString::new(self.key_identifier.as_slice())?),
            authority_cert_issuer: None,
            authority_cert_serial_number: None,
        };

        Ok(aki.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier::from_der(extension)?;
        let key_identifier = aki.key_identifier.ok_or_else(|| {
            CertMintError::DecodingError("authority key identifier has no keyIdentifier".to_string())
        })?;
        Ok(Self {
            key_identifier: key_identifier.as_bytes().to_vec(),
        })
    }
}

fn key_id(key: &PublicKey) -> Result<Vec<u8>> {
    let bits = key.key_bits()?;
    Ok(Sha1::digest(bits.raw_bytes()).to_vec())
}

/// Turns the optional extension parameters of a request into the extension
/// list of the certificate.
///
/// An absent parameter omits its extension entirely, while a present one is
/// always emitted (even with every flag false). Criticality is passed through
/// unchanged and flag combinations are not second-guessed. Output order is
/// fixed: Basic Constraints, then Key Usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtensionPolicy {
    pub basic_constraints: Option<BasicConstraintsExtension>,
    pub key_usage: Option<KeyUsageExtension>,
}

impl ExtensionPolicy {
    pub fn new(
        basic_constraints: Option<BasicConstraintsExtension>,
        key_usage: Option<KeyUsageExtension>,
    ) -> Self {
        Self {
            basic_constraints,
            key_usage,
        }
    }

    pub fn build(&self) -> Result<Vec<ExtensionParam>> {
        let mut extensions = Vec::with_capacity(2);

        if let Some(bc) = self.basic_constraints {
            let basic_constraints = BasicConstraints {
                is_ca: bc.ca,
                max_path_length: None,
            };
            extensions.push(ExtensionParam::from_extension(
                basic_constraints,
                bc.critical,
            )?);
        }

        if let Some(ku) = self.key_usage {
            let mut flags: FlagSet<KeyUsages> = FlagSet::default();
            if ku.key_cert_sign {
                flags |= KeyUsages::KeyCertSign;
            }
            if ku.crl_sign {
                flags |= KeyUsages::CRLSign;
            }
            extensions.push(ExtensionParam::from_extension(KeyUsage(flags), ku.critical)?);
        }

        Ok(extensions)
    }
}
