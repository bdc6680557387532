//! The typed [`Engine`] and the host-facing [`EngineFacade`].
//!
//! A host registers its extra-arguments string, then calls the two
//! operations with loosely typed parameter mappings. The engine behind the
//! facade is built lazily, exactly once, from whatever arguments were
//! registered by the time of the first call.

use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use tracing::{info, warn};

use crate::cert::{Certificate, CertificateBuildRequest};
use crate::config::EngineConfig;
use crate::error::{CertMintError, EngineError, Result};
use crate::key::{KeyIdentity, KeyResolver, KeySource};
use crate::validator;

/// Resolves key identities and mints certificates.
///
/// An engine built from a malformed configuration does not fail on
/// construction; instead every operation returns that configuration error.
#[derive(Debug)]
pub struct Engine {
    resolver: std::result::Result<KeyResolver, CertMintError>,
}

impl Engine {
    /// Build an engine from an extra-arguments string such as
    /// `mode=filesystem&store-path=/var/lib/certmint`.
    pub fn with_args(args: &str) -> Self {
        match EngineConfig::from_args(args) {
            Ok(config) => Self::with_config(config),
            Err(err) => {
                warn!(error = %err, "certmint configuration rejected, all operations will fail");
                Self::with_error(err)
            }
        }
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_source(config.key_source.into_source())
    }

    pub fn with_source(source: Box<dyn KeySource>) -> Self {
        info!(source = %source.describe(), "certmint engine initialized");
        Self {
            resolver: Ok(KeyResolver::new(source)),
        }
    }

    /// An engine whose every operation fails with `err`.
    pub fn with_error(err: CertMintError) -> Self {
        Self { resolver: Err(err) }
    }

    fn resolver(&self) -> Result<&KeyResolver> {
        self.resolver.as_ref().map_err(Clone::clone)
    }

    /// The SPKI PEM of the public half of `identity`.
    pub fn public_key_pem(&self, identity: &KeyIdentity) -> Result<String> {
        self.resolver()?.public_key_pem(identity)
    }

    /// Resolve the request's signing key and build the signed certificate.
    pub fn x509_certificate(&self, request: &CertificateBuildRequest) -> Result<Certificate> {
        let signing_key = self.resolver()?.resolve(&request.signing_key_identity)?;
        Certificate::build(request, &signing_key)
    }

    pub fn x509_pem(&self, request: &CertificateBuildRequest) -> Result<String> {
        self.x509_certificate(request)?.to_pem()
    }
}

/// Host entry points: validates host values, lazily creates the engine and
/// narrows every failure into an [`EngineError`].
#[derive(Debug, Default)]
pub struct EngineFacade {
    extra_args: Mutex<String>,
    engine: OnceLock<Engine>,
}

impl EngineFacade {
    pub fn new() -> Self {
        Self::default()
    }

    /// A facade around an already constructed engine; registrations are
    /// ignored.
    pub fn from_engine(engine: Engine) -> Self {
        Self {
            extra_args: Mutex::default(),
            engine: OnceLock::from(engine),
        }
    }

    /// The process-wide facade.
    pub fn global() -> &'static EngineFacade {
        static GLOBAL: OnceLock<EngineFacade> = OnceLock::new();
        GLOBAL.get_or_init(EngineFacade::new)
    }

    /// Record the extra-arguments string used to create the engine.
    ///
    /// Returns `false` and leaves the engine untouched when it already
    /// exists. Registration and engine construction hold the same lock, so a
    /// `true` return means these arguments are the ones the engine sees.
    pub fn register_extra_args(&self, args: &str) -> bool {
        let mut extra_args = self
            .extra_args
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if self.engine.get().is_some() {
            warn!("certmint engine already initialized, ignoring new extra arguments");
            return false;
        }
        *extra_args = args.to_string();
        true
    }

    fn engine(&self) -> &Engine {
        if let Some(engine) = self.engine.get() {
            return engine;
        }
        let extra_args = self
            .extra_args
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.engine.get_or_init(|| Engine::with_args(&extra_args))
    }

    /// `public-key-pem`: takes `{ key-type, key-identity }`.
    pub fn public_key_pem(&self, params: &Value) -> std::result::Result<String, EngineError> {
        let identity = validator::key_identity_from_value(params)?;
        Ok(self.engine().public_key_pem(&identity)?)
    }

    /// `x509-pem`: takes the certificate build parameters.
    pub fn x509_pem(&self, params: &Value) -> std::result::Result<String, EngineError> {
        let request = validator::build_request_from_value(params)?;
        Ok(self.engine().x509_pem(&request)?)
    }
}
