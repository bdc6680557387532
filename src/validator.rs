//! Turns the host's loosely typed parameter mappings into typed requests.
//!
//! Reading happens in two stages: [`FromParam`] describes a target shape, and
//! [`Params`] fetches attributes of that shape either as required (absence is
//! [`CertMintError::MissingField`]) or optional (absence and `null` both mean
//! "not given"). The first failure short-circuits the whole conversion.
//!
//! Unknown keys inside the `key-usage` and `basic-constraints` attribute sets
//! are ignored on purpose, so newer hosts can pass flags this version does not
//! know about.

use serde_json::{Map, Value};

use crate::cert::params::{
    BasicConstraintsExtension, CertificateBuildRequest, DistinguishedName, KeyUsageExtension,
};
use crate::error::{CertMintError, Result};
use crate::key::KeyIdentity;

pub const K_KEY_TYPE: &str = "key-type";
pub const K_KEY_IDENTITY: &str = "key-identity";

pub const K_SUBJECT_PUBLIC_KEY: &str = "subject-public-key";
pub const K_SIGNING_PRIVATE_KEY_IDENTITY: &str = "signing-private-key-identity";
pub const K_SUBJECT_NAME: &str = "subject-name";
pub const K_ISSUER_NAME: &str = "issuer-name";
pub const K_SERIAL: &str = "serial";
pub const K_START_DATE: &str = "start-date";
pub const K_EXPIRY_DATE: &str = "expiry-date";
pub const K_BASIC_CONSTRAINTS: &str = "basic-constraints";
pub const K_KEY_USAGE: &str = "key-usage";

pub const K_CRITICAL: &str = "critical";
pub const K_CA: &str = "ca";
pub const K_KEY_CERT_SIGN: &str = "key-cert-sign";
pub const K_CRL_SIGN: &str = "crl-sign";

const BUILD_CONTEXT: &str = "while evaluating the X.509 build parameters";
const KEY_CONTEXT: &str = "while evaluating the key identity parameters";

/// A shape an attribute value can be read as.
pub trait FromParam<'a>: Sized {
    /// Human-readable description of the shape, used in errors.
    const EXPECTED: &'static str;

    fn from_param(value: &'a Value) -> Option<Self>;
}

impl<'a> FromParam<'a> for &'a str {
    const EXPECTED: &'static str = "a string";

    fn from_param(value: &'a Value) -> Option<Self> {
        value.as_str()
    }
}

impl FromParam<'_> for bool {
    const EXPECTED: &'static str = "a boolean";

    fn from_param(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromParam<'_> for u64 {
    const EXPECTED: &'static str = "a non-negative integer";

    fn from_param(value: &Value) -> Option<Self> {
        value.as_u64()
    }
}

impl<'a> FromParam<'a> for &'a Map<String, Value> {
    const EXPECTED: &'static str = "an attribute set";

    fn from_param(value: &'a Value) -> Option<Self> {
        value.as_object()
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "an integer",
        Value::Number(_) => "a float",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an attribute set",
    }
}

/// One attribute set of host parameters together with the context used in
/// its error messages.
pub struct Params<'a> {
    map: &'a Map<String, Value>,
    context: String,
}

impl<'a> Params<'a> {
    /// Treat `value` as the attribute set named `field`.
    pub fn new(value: &'a Value, field: &str, context: impl Into<String>) -> Result<Self> {
        let context = context.into();
        match value.as_object() {
            Some(map) => Ok(Self { map, context }),
            None => Err(CertMintError::TypeMismatch {
                field: field.to_string(),
                expected: <&Map<String, Value> as FromParam<'_>>::EXPECTED,
                found: describe(value),
                context,
            }),
        }
    }

    fn convert<T: FromParam<'a>>(&self, key: &str, value: &'a Value) -> Result<T> {
        T::from_param(value).ok_or_else(|| CertMintError::TypeMismatch {
            field: key.to_string(),
            expected: T::EXPECTED,
            found: describe(value),
            context: self.context.clone(),
        })
    }

    /// Read an attribute that must be present.
    pub fn required<T: FromParam<'a>>(&self, key: &str) -> Result<T> {
        match self.map.get(key) {
            Some(value) => self.convert(key, value),
            None => Err(CertMintError::MissingField {
                field: key.to_string(),
                context: self.context.clone(),
            }),
        }
    }

    /// Read an attribute that may be absent or `null`.
    pub fn optional<T: FromParam<'a>>(&self, key: &str) -> Result<Option<T>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => self.convert(key, value).map(Some),
        }
    }

    /// Read a required nested attribute set.
    pub fn nested(&self, key: &str, context: impl Into<String>) -> Result<Params<'a>> {
        let map = self.required::<&Map<String, Value>>(key)?;
        Ok(Params {
            map,
            context: context.into(),
        })
    }

    /// Read an optional nested attribute set.
    pub fn optional_nested(
        &self,
        key: &str,
        context: impl Into<String>,
    ) -> Result<Option<Params<'a>>> {
        let context = context.into();
        Ok(self
            .optional::<&Map<String, Value>>(key)?
            .map(|map| Params { map, context }))
    }

    pub fn keys(&self) -> impl Iterator<Item = &'a String> {
        self.map.keys()
    }
}

fn read_key_identity(params: &Params<'_>) -> Result<KeyIdentity> {
    Ok(KeyIdentity::new(
        params.required::<&str>(K_KEY_TYPE)?,
        params.required::<&str>(K_KEY_IDENTITY)?,
    ))
}

/// Validate the argument of `public-key-pem`: an attribute set with
/// `key-type` and `key-identity` strings.
pub fn key_identity_from_value(value: &Value) -> Result<KeyIdentity> {
    let params = Params::new(value, "key identity", KEY_CONTEXT)?;
    read_key_identity(&params)
}

/// Validate the argument of `x509-pem` into a [`CertificateBuildRequest`].
pub fn build_request_from_value(value: &Value) -> Result<CertificateBuildRequest> {
    let params = Params::new(value, "x509 build parameters", BUILD_CONTEXT)?;

    let subject_public_key = params
        .optional::<&str>(K_SUBJECT_PUBLIC_KEY)?
        .map(str::to_string);

    let signing_key_identity = read_key_identity(&params.nested(
        K_SIGNING_PRIVATE_KEY_IDENTITY,
        format!("in the '{K_SIGNING_PRIVATE_KEY_IDENTITY}' attribute {BUILD_CONTEXT}"),
    )?)?;

    let subject_name = distinguished_name(&params, K_SUBJECT_NAME)?;
    let issuer_name = distinguished_name(&params, K_ISSUER_NAME)?;
    let serial = params.required::<u64>(K_SERIAL)?;
    let start_date = params.required::<&str>(K_START_DATE)?;
    let expiry_date = params.required::<&str>(K_EXPIRY_DATE)?;
    let basic_constraints = basic_constraints(&params)?;
    let key_usage = key_usage(&params)?;

    Ok(CertificateBuildRequest {
        subject_public_key,
        signing_key_identity,
        subject_name,
        issuer_name,
        serial,
        start_date: start_date.to_string(),
        expiry_date: expiry_date.to_string(),
        key_usage,
        basic_constraints,
    })
}

/// A name is a required attribute set of strings; it may be empty.
fn distinguished_name(params: &Params<'_>, key: &str) -> Result<DistinguishedName> {
    let name = params.nested(key, format!("in the '{key}' name {BUILD_CONTEXT}"))?;
    let mut dn = DistinguishedName::new();
    for attribute in name.keys() {
        dn.push(attribute.as_str(), name.required::<&str>(attribute)?)?;
    }
    Ok(dn)
}

fn basic_constraints(params: &Params<'_>) -> Result<Option<BasicConstraintsExtension>> {
    let Some(bc) = params.optional_nested(
        K_BASIC_CONSTRAINTS,
        format!("in the '{K_BASIC_CONSTRAINTS}' extension {BUILD_CONTEXT}"),
    )?
    else {
        return Ok(None);
    };

    Ok(Some(BasicConstraintsExtension {
        critical: bc.optional::<bool>(K_CRITICAL)?.unwrap_or(false),
        ca: bc.optional::<bool>(K_CA)?.unwrap_or(false),
    }))
}

fn key_usage(params: &Params<'_>) -> Result<Option<KeyUsageExtension>> {
    let Some(ku) = params.optional_nested(
        K_KEY_USAGE,
        format!("in the '{K_KEY_USAGE}' extension {BUILD_CONTEXT}"),
    )?
    else {
        return Ok(None);
    };

    Ok(Some(KeyUsageExtension {
        critical: ku.optional::<bool>(K_CRITICAL)?.unwrap_or(false),
        key_cert_sign: ku.optional::<bool>(K_KEY_CERT_SIGN)?.unwrap_or(false),
        crl_sign: ku.optional::<bool>(K_CRL_SIGN)?.unwrap_or(false),
    }))
}
