//! use certmint::error::CertMintError;

use thiserror::Error;

/// Represents errors that can occur while minting keys and certificates.
///
/// Every variant carries enough context (field name, key identity or
/// underlying cause) to locate the offending input without inspecting
/// internals.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CertMintError {
    /// A required attribute is absent from the host input.
    #[error("the required attribute '{field}' is missing {context}")]
    MissingField { field: String, context: String },

    /// An attribute is present but has the wrong shape.
    #[error("the attribute '{field}' must be {expected} but is {found} {context}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
        context: String,
    },

    /// The key identity could not be turned into usable key material.
    #[error("failed to resolve the key '{key_identity}' of type '{key_type}': {cause}")]
    KeyResolution {
        key_type: String,
        key_identity: String,
        cause: String,
    },

    /// The validity dates are unparsable or not strictly ordered.
    #[error("invalid validity window: {0}")]
    InvalidValidityWindow(String),

    /// The subject public key is not in a supported encoding.
    #[error("unsupported public key encoding: {0}")]
    UnsupportedPublicKeyEncoding(String),

    /// A distinguished name attribute cannot be encoded.
    #[error("invalid name attribute '{attribute}': {cause}")]
    InvalidNameAttribute { attribute: String, cause: String },

    /// The underlying cryptographic signing operation failed.
    #[error("signing failed: {0}")]
    SigningFailure(String),

    /// The extra-arguments configuration string is malformed.
    #[error("invalid certmint configuration: {0}")]
    InternalConfiguration(String),

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),
}

pub type Result<T> = std::result::Result<T, CertMintError>;

impl CertMintError {
    pub(crate) fn key_resolution(
        identity: &crate::key::KeyIdentity,
        cause: impl ToString,
    ) -> Self {
        CertMintError::KeyResolution {
            key_type: identity.key_type.clone(),
            key_identity: identity.key_identity.clone(),
            cause: cause.to_string(),
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        CertMintError::InternalConfiguration(message.into())
    }
}

impl From<der::Error> for CertMintError {
    /// Converts a `der::Error` into a `CertMintError`.
    fn from(err: der::Error) -> Self {
        CertMintError::EncodingError(err.to_string())
    }
}

impl From<pkcs8::spki::Error> for CertMintError {
    fn from(err: pkcs8::spki::Error) -> Self {
        CertMintError::EncodingError(err.to_string())
    }
}

impl From<pem::PemError> for CertMintError {
    fn from(err: pem::PemError) -> Self {
        CertMintError::DecodingError(err.to_string())
    }
}

/// The single error type that crosses the host boundary.
///
/// Every internal failure is narrowed into this type by
/// [`EngineFacade`](crate::engine::EngineFacade); the host attaches its own
/// source position before surfacing it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct EngineError {
    pub message: String,
}

impl From<CertMintError> for EngineError {
    fn from(err: CertMintError) -> Self {
        EngineError {
            message: err.to_string(),
        }
    }
}
