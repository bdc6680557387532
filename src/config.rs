//! Engine configuration parsed from the host's extra-arguments string.
//!
//! The string is a list of `key=value` pairs joined by `&`, for example
//! `mode=filesystem&store-path=/var/lib/certmint`. Options may repeat at the
//! syntax level, so each key maps to every value it was given and the
//! single-use options are checked afterwards.

use std::collections::HashMap;
use std::path::PathBuf;

use regex::Regex;

use crate::error::{CertMintError, Result};
use crate::key::source::{
    DEFAULT_ENV_PREFIX, EnvKeySource, FileKeySource, KeySource, MemoryKeySource,
};

pub const K_MODE: &str = "mode";
pub const K_STORE_PATH: &str = "store-path";
pub const K_ENV_PREFIX: &str = "env-prefix";

pub const K_FILESYSTEM_MODE: &str = "filesystem";
pub const K_ENV_MODE: &str = "env";
pub const K_MEMORY_MODE: &str = "memory";

/// Where private key material is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySourceConfig {
    /// PEM files named `<key-identity>.pem` under `store_path`.
    Filesystem { store_path: PathBuf },
    /// Environment variables named `<prefix><KEY_IDENTITY>`.
    Env { prefix: String },
    /// An empty in-process store, mostly useful for tests.
    Memory,
}

impl KeySourceConfig {
    /// Instantiate the configured backend.
    pub fn into_source(self) -> Box<dyn KeySource> {
        match self {
            KeySourceConfig::Filesystem { store_path } => Box::new(FileKeySource::new(store_path)),
            KeySourceConfig::Env { prefix } => Box::new(EnvKeySource::new(prefix)),
            KeySourceConfig::Memory => Box::new(MemoryKeySource::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub key_source: KeySourceConfig,
}

impl EngineConfig {
    /// Parse an extra-arguments string.
    pub fn from_args(args: &str) -> Result<Self> {
        let args = parse_args(args)?;

        let mode = single(&args, K_MODE).ok_or_else(|| {
            CertMintError::configuration(format!(
                "The '{K_MODE}' option is not present in the certmint parameters. \
                 Specify one, for example '{K_MODE}={K_FILESYSTEM_MODE}'."
            ))
        })??;

        if mode.is_empty() {
            return Err(CertMintError::configuration(format!(
                "No mode provided. Specify a mode, for example '{K_MODE}={K_FILESYSTEM_MODE}'."
            )));
        }

        let key_source = match mode {
            K_FILESYSTEM_MODE => {
                let store_path = single(&args, K_STORE_PATH).ok_or_else(|| {
                    CertMintError::configuration(format!(
                        "The '{K_FILESYSTEM_MODE}' mode requires the '{K_STORE_PATH}' option, \
                         which must point to the directory holding the private keys."
                    ))
                })??;
                if store_path.is_empty() {
                    return Err(CertMintError::configuration(format!(
                        "The option '{K_STORE_PATH}' must not be empty."
                    )));
                }
                KeySourceConfig::Filesystem {
                    store_path: PathBuf::from(store_path),
                }
            }
            K_ENV_MODE => {
                let prefix = single(&args, K_ENV_PREFIX)
                    .transpose()?
                    .unwrap_or(DEFAULT_ENV_PREFIX);
                KeySourceConfig::Env {
                    prefix: prefix.to_string(),
                }
            }
            K_MEMORY_MODE => KeySourceConfig::Memory,
            other => {
                return Err(CertMintError::configuration(format!(
                    "The supplied mode '{other}' is not a known operating mode."
                )));
            }
        };

        Ok(EngineConfig { key_source })
    }
}

/// Split `a=1&b=2&a=3` into `{a: [1, 3], b: [2]}`. A key without `=` gets an
/// empty value.
fn parse_args(query: &str) -> Result<HashMap<String, Vec<String>>> {
    let re = Regex::new(r"(?:^|&)([^=&]+)=?([^&]*)")
        .map_err(|e| CertMintError::configuration(e.to_string()))?;

    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for caps in re.captures_iter(query) {
        let key = caps.get(1).map_or("", |m| m.as_str());
        let value = caps.get(2).map_or("", |m| m.as_str());
        map.entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }
    Ok(map)
}

/// The value of an option that may be given at most once.
fn single<'a>(args: &'a HashMap<String, Vec<String>>, key: &str) -> Option<Result<&'a str>> {
    let values = args.get(key)?;
    match values.as_slice() {
        [value] => Some(Ok(value.as_str())),
        [] => Some(Ok("")),
        _ => Some(Err(CertMintError::configuration(format!(
            "The option '{key}' must only be used once."
        )))),
    }
}
