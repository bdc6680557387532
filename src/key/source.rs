use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use super::KeyIdentity;
use crate::error::{CertMintError, Result};
use crate::pem_utils::der_to_pem;

/// Default prefix of the variables read by [`EnvKeySource`].
pub const DEFAULT_ENV_PREFIX: &str = "CERTMINT_KEY_";

/// A backend capable of returning the raw PEM material for a key identity.
///
/// Backends only locate material; decoding it according to the identity's
/// key type is the job of the [`KeyResolver`](super::KeyResolver).
/// Implementations needing interior caching must guard it themselves.
pub trait KeySource: Send + Sync {
    /// Fetch the PEM text stored for `identity`.
    fn fetch(&self, identity: &KeyIdentity) -> Result<String>;

    /// Short description used in logs.
    fn describe(&self) -> String;
}

/// Reads `<root>/<key-identity>.pem`.
#[derive(Debug, Clone)]
pub struct FileKeySource {
    root: PathBuf,
}

impl FileKeySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn key_path(&self, identity: &KeyIdentity) -> Result<PathBuf> {
        let single_component = matches!(
            Path::new(&identity.key_identity)
                .components()
                .collect::<Vec<_>>()
                .as_slice(),
            [Component::Normal(_)]
        );

        if !single_component || identity.key_identity.contains(['/', '\\']) {
            return Err(CertMintError::key_resolution(
                identity,
                "the key identity must be a plain file name for the filesystem key source",
            ));
        }
        Ok(self.root.join(format!("{}.pem", identity.key_identity)))
    }
}

impl KeySource for FileKeySource {
    fn fetch(&self, identity: &KeyIdentity) -> Result<String> {
        let path = self.key_path(identity)?;
        std::fs::read_to_string(&path).map_err(|e| {
            CertMintError::key_resolution(identity, format!("cannot read {}: {e}", path.display()))
        })
    }

    fn describe(&self) -> String {
        format!("filesystem key source at {}", self.root.display())
    }
}

/// Reads the variable `<prefix><KEY_IDENTITY>` from the process environment.
///
/// The identity is uppercased and every non-alphanumeric character becomes
/// `_`. The value is either PEM text or base64 of a PKCS#8 DER document.
#[derive(Debug, Clone)]
pub struct EnvKeySource {
    prefix: String,
}

impl Default for EnvKeySource {
    fn default() -> Self {
        Self::new(DEFAULT_ENV_PREFIX)
    }
}

impl EnvKeySource {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn variable_name(&self, identity: &KeyIdentity) -> String {
        let suffix: String = identity
            .key_identity
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}{}", self.prefix, suffix)
    }
}

impl KeySource for EnvKeySource {
    fn fetch(&self, identity: &KeyIdentity) -> Result<String> {
        let name = self.variable_name(identity);
        let value = std::env::var(&name).map_err(|e| {
            CertMintError::key_resolution(identity, format!("environment variable {name}: {e}"))
        })?;

        let value = value.trim();
        if value.starts_with("-----BEGIN") {
            return Ok(value.to_string());
        }

        let der = STANDARD.decode(value).map_err(|e| {
            CertMintError::key_resolution(
                identity,
                format!("environment variable {name} is neither PEM nor base64: {e}"),
            )
        })?;
        Ok(der_to_pem(&der, "PRIVATE KEY"))
    }

    fn describe(&self) -> String {
        format!("environment key source with prefix {}", self.prefix)
    }
}

/// In-process key material, keyed by key identity.
#[derive(Debug, Default)]
pub struct MemoryKeySource {
    keys: RwLock<HashMap<String, String>>,
}

impl MemoryKeySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store PEM material under `key_identity`, replacing any previous value.
    pub fn insert(&self, key_identity: impl Into<String>, pem: impl Into<String>) -> Result<()> {
        let mut keys = self
            .keys
            .write()
            .map_err(|_| CertMintError::configuration("memory key source lock is poisoned"))?;
        keys.insert(key_identity.into(), pem.into());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.keys.read().map(|keys| keys.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeySource for MemoryKeySource {
    fn fetch(&self, identity: &KeyIdentity) -> Result<String> {
        let keys = self
            .keys
            .read()
            .map_err(|_| CertMintError::key_resolution(identity, "memory key source lock is poisoned"))?;
        keys.get(&identity.key_identity)
            .cloned()
            .ok_or_else(|| CertMintError::key_resolution(identity, "no such key in the memory key source"))
    }

    fn describe(&self) -> String {
        "memory key source".to_string()
    }
}
