use bon::Builder;
use const_oid::ObjectIdentifier;
use der::Tag;
use der::asn1::{Any, Ia5StringRef, PrintableStringRef, SetOfVec};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{RdnSequence, RelativeDistinguishedName};

use super::extensions::ToAndFromX509Extension;
use crate::error::{CertMintError, Result};
use crate::key::{KeyIdentity, PublicKey};

/// Everything needed to mint one certificate.
///
/// # Fields
/// * `subject_public_key` - PEM public key of the subject. When absent, the
///   subject key is the public half of the signing key.
/// * `signing_key_identity` - The key that signs the certificate.
/// * `subject_name` / `issuer_name` - Ordered distinguished names.
/// * `serial` - Certificate serial number.
/// * `start_date` / `expiry_date` - RFC 3339 timestamps bounding validity.
/// * `key_usage` / `basic_constraints` - Optional extensions; `None` omits them.
#[derive(Clone, Debug, PartialEq, Eq, Builder)]
pub struct CertificateBuildRequest {
    #[builder(into)]
    pub subject_public_key: Option<String>,
    pub signing_key_identity: KeyIdentity,
    pub subject_name: DistinguishedName,
    pub issuer_name: DistinguishedName,
    pub serial: u64,
    #[builder(into)]
    pub start_date: String,
    #[builder(into)]
    pub expiry_date: String,
    pub key_usage: Option<KeyUsageExtension>,
    pub basic_constraints: Option<BasicConstraintsExtension>,
}

impl CertificateBuildRequest {
    pub fn validity(&self) -> Result<Validity> {
        Validity::from_rfc3339(&self.start_date, &self.expiry_date)
    }
}

/// The resolved, typed contents of a certificate before it is signed.
///
/// # Fields
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `serial` - The certificate serial number.
/// * `validity` - The validity window.
/// * `extensions` - Extensions chosen by the extension policy.
#[derive(Clone, Debug)]
pub struct CertificationRequestInfo {
    pub subject: DistinguishedName,
    pub subject_public_key: PublicKey,
    pub serial: u64,
    pub validity: Validity,
    pub extensions: Vec<ExtensionParam>,
}

/// Parameters of the Key Usage extension.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyUsageExtension {
    pub critical: bool,
    pub key_cert_sign: bool,
    pub crl_sign: bool,
}

/// Parameters of the Basic Constraints extension.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BasicConstraintsExtension {
    pub critical: bool,
    pub ca: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StringKind {
    Utf8,
    Printable,
    Ia5,
}

struct NameAttribute {
    short: &'static str,
    long: &'static str,
    oid: ObjectIdentifier,
    kind: StringKind,
}

const fn attribute(
    short: &'static str,
    long: &'static str,
    oid: &'static str,
    kind: StringKind,
) -> NameAttribute {
    NameAttribute {
        short,
        long,
        oid: ObjectIdentifier::new_unwrap(oid),
        kind,
    }
}

const NAME_ATTRIBUTES: &[NameAttribute] = &[
    attribute("CN", "commonName", "2.5.4.3", StringKind::Utf8),
    attribute("SN", "surname", "2.5.4.4", StringKind::Utf8),
    attribute("serialNumber", "serialNumber", "2.5.4.5", StringKind::Printable),
    attribute("C", "countryName", "2.5.4.6", StringKind::Printable),
    attribute("L", "localityName", "2.5.4.7", StringKind::Utf8),
    attribute("ST", "stateOrProvinceName", "2.5.4.8", StringKind::Utf8),
    attribute("street", "streetAddress", "2.5.4.9", StringKind::Utf8),
    attribute("O", "organizationName", "2.5.4.10", StringKind::Utf8),
    attribute("OU", "organizationalUnitName", "2.5.4.11", StringKind::Utf8),
    attribute("title", "title", "2.5.4.12", StringKind::Utf8),
    attribute("GN", "givenName", "2.5.4.42", StringKind::Utf8),
    attribute("initials", "initials", "2.5.4.43", StringKind::Utf8),
    attribute("dnQualifier", "dnQualifier", "2.5.4.46", StringKind::Printable),
    attribute("pseudonym", "pseudonym", "2.5.4.65", StringKind::Utf8),
    attribute("UID", "userId", "0.9.2342.19200300.100.1.1", StringKind::Utf8),
    attribute("DC", "domainComponent", "0.9.2342.19200300.100.1.25", StringKind::Ia5),
    attribute("emailAddress", "emailAddress", "1.2.840.113549.1.9.1", StringKind::Ia5),
];

/// An ordered distinguished name.
///
/// Attribute names are unique within one name and their insertion order
/// becomes the RDN sequence order of the certificate. Names may be short
/// (`CN`), long (`commonName`) or a dotted OID.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    attributes: Vec<(String, String)>,
}

impl DistinguishedName {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute, rejecting duplicate names.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(CertMintError::InvalidNameAttribute {
                attribute: name,
                cause: "the attribute appears more than once".to_string(),
            });
        }
        self.attributes.push((name, value.into()));
        Ok(())
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        self.push(name, value)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Converts the distinguished name to an X.509 RDN sequence, one
    /// attribute per RDN, preserving order.
    pub fn as_x509_name(&self) -> Result<x509_cert::name::Name> {
        let rdns = self
            .attributes
            .iter()
            .map(|(name, value)| {
                let atv = encode_attribute(name, value)?;
                let set = SetOfVec::try_from(vec![atv])?;
                Ok(RelativeDistinguishedName(set))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RdnSequence(rdns))
    }

    /// Creates a `DistinguishedName` from an X.509 name, using short names
    /// where one is known and the dotted OID otherwise.
    pub fn from_x509_name(x509dn: &x509_cert::name::Name) -> Result<Self> {
        let mut dn = DistinguishedName::new();
        for rdn in x509dn.0.iter() {
            for attr in rdn.0.iter() {
                let name = NAME_ATTRIBUTES
                    .iter()
                    .find(|a| a.oid == attr.oid)
                    .map(|a| a.short.to_string())
                    .unwrap_or_else(|| attr.oid.to_string());
                let value = std::str::from_utf8(attr.value.value()).map_err(|e| {
                    CertMintError::DecodingError(format!("attribute {name} is not text: {e}"))
                })?;
                dn.push(name, value)?;
            }
        }
        Ok(dn)
    }
}

fn encode_attribute(name: &str, value: &str) -> Result<AttributeTypeAndValue> {
    let invalid = |cause: String| CertMintError::InvalidNameAttribute {
        attribute: name.to_string(),
        cause,
    };

    let (oid, kind) = match NAME_ATTRIBUTES
        .iter()
        .find(|a| a.short == name || a.long == name)
    {
        Some(known) => (known.oid, known.kind),
        None if name.contains('.') => {
            let oid = ObjectIdentifier::new(name).map_err(|e| invalid(e.to_string()))?;
            (oid, StringKind::Utf8)
        }
        None => return Err(invalid("unknown attribute name".to_string())),
    };

    let tag = match kind {
        StringKind::Utf8 => Tag::Utf8String,
        StringKind::Printable => {
            PrintableStringRef::new(value).map_err(|e| invalid(e.to_string()))?;
            Tag::PrintableString
        }
        StringKind::Ia5 => {
            Ia5StringRef::new(value).map_err(|e| invalid(e.to_string()))?;
            Tag::Ia5String
        }
    };

    let value = Any::new(tag, value.as_bytes()).map_err(|e| invalid(e.to_string()))?;
    Ok(AttributeTypeAndValue { oid, value })
}

/// Certificate validity period.
///
/// # Fields
/// * `not_before` - The start of the validity period.
/// * `not_after` - The end of the validity period, strictly after `not_before`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Parses both bounds as RFC 3339 timestamps, truncated to whole seconds.
    ///
    /// Ordering is checked on the exact timestamps. Bounds that only differ
    /// below one second are rejected, since certificate times carry whole
    /// seconds.
    pub fn from_rfc3339(start_date: &str, expiry_date: &str) -> Result<Self> {
        let parse = |label: &str, value: &str| {
            OffsetDateTime::parse(value, &Rfc3339).map_err(|e| {
                CertMintError::InvalidValidityWindow(format!(
                    "the {label} '{value}' is not an RFC 3339 timestamp: {e}"
                ))
            })
        };
        let truncate = |time: OffsetDateTime| time.replace_nanosecond(0).unwrap_or(time);

        let start = parse("start date", start_date)?;
        let expiry = parse("expiry date", expiry_date)?;

        if start >= expiry {
            return Err(CertMintError::InvalidValidityWindow(format!(
                "the start date '{start_date}' must be strictly before the expiry date '{expiry_date}'"
            )));
        }

        let not_before = truncate(start);
        let not_after = truncate(expiry);
        if not_before == not_after {
            return Err(CertMintError::InvalidValidityWindow(format!(
                "the start date '{start_date}' and the expiry date '{expiry_date}' fall within \
                 the same second, and certificate times have one-second precision"
            )));
        }

        Ok(Self {
            not_before,
            not_after,
        })
    }
}

/// Represents an X.509 extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: ToAndFromX509Extension>(extension: E, critical: bool) -> Result<Self> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E> {
        E::from_x509_extension_value(&self.value)
    }
}
