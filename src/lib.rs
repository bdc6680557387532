//! # CertMint - Credential Issuance for Declarative Configurations
//!
//! CertMint turns abstract key identities into concrete key material and
//! mints PEM-encoded public keys and signed X.509 certificates from
//! declarative build requests. It is built entirely with rustcrypto libraries
//! and is meant to be embedded in a host evaluator that hands over loosely
//! typed parameter mappings.
//!
//! ## Supported Key Types
//!
//! - **RSA** (`rsa`): PKCS#8 or PKCS#1 private keys, signed with SHA-256
//! - **ECDSA** (`ecdsa-p256`, `ecdsa-p384`): signed with SHA-256 and SHA-384
//! - **Ed25519** (`ed25519`)
//!
//! ## Key Sources
//!
//! Private keys never travel through the host. A key identity names the key
//! and the configured [`KeySource`](key::KeySource) locates its material:
//! files under a store directory, environment variables, or an in-process
//! store.
//!
//! ## Quick Start
//!
//! ### Through the host facade
//!
//! ```rust,no_run
//! use certmint::engine::EngineFacade;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), certmint::error::EngineError> {
//! let facade = EngineFacade::global();
//! facade.register_extra_args("mode=filesystem&store-path=/var/lib/certmint");
//!
//! let ca_pem = facade.x509_pem(&json!({
//!     "signing-private-key-identity": { "key-type": "ecdsa-p256", "key-identity": "root-ca" },
//!     "subject-name": { "CN": "Example Root CA", "O": "Example Corp" },
//!     "issuer-name": { "CN": "Example Root CA", "O": "Example Corp" },
//!     "serial": 1,
//!     "start-date": "2024-01-01T00:00:00Z",
//!     "expiry-date": "2034-01-01T00:00:00Z",
//!     "basic-constraints": { "critical": true, "ca": true },
//!     "key-usage": { "critical": true, "key-cert-sign": true, "crl-sign": true },
//! }))?;
//! println!("{ca_pem}");
//! # Ok(())
//! # }
//! ```
//!
//! ### With typed requests
//!
//! ```rust
//! use certmint::{
//!     cert::{CertificateBuildRequest, DistinguishedName},
//!     engine::Engine,
//!     key::{KeyIdentity, KeyPair, MemoryKeySource},
//! };
//!
//! # fn main() -> Result<(), certmint::error::CertMintError> {
//! let source = MemoryKeySource::new();
//! source.insert("root-ca", KeyPair::generate_ed25519().to_pkcs8_pem()?)?;
//! let engine = Engine::with_source(Box::new(source));
//!
//! let name = DistinguishedName::new().with("CN", "Example Root CA")?;
//! let request = CertificateBuildRequest::builder()
//!     .signing_key_identity(KeyIdentity::new("ed25519", "root-ca"))
//!     .subject_name(name.clone())
//!     .issuer_name(name)
//!     .serial(1)
//!     .start_date("2024-01-01T00:00:00Z".to_string())
//!     .expiry_date("2034-01-01T00:00:00Z".to_string())
//!     .build();
//!
//! let pem = engine.x509_pem(&request)?;
//! assert!(pem.starts_with("-----BEGIN CERTIFICATE-----"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Internally every failure is a [`CertMintError`](error::CertMintError)
//! naming the offending attribute or key identity. At the host boundary the
//! facade narrows them into a single [`EngineError`](error::EngineError).
//!
//! ```rust
//! use certmint::{error::CertMintError, validator::build_request_from_value};
//! use serde_json::json;
//!
//! match build_request_from_value(&json!({})) {
//!     Err(CertMintError::MissingField { field, .. }) => println!("missing {field}"),
//!     Err(e) => println!("other error: {e}"),
//!     Ok(_) => unreachable!(),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`]: The typed engine and the host facade
//! - [`validator`]: Conversion of host parameter mappings into typed requests
//! - [`config`]: Parsing of the extra-arguments configuration string
//! - [`key`]: Key identities, key sources and key material
//! - [`cert`]: Certificate building, encoding and extensions
//! - [`issuer`]: Certificate signing
//! - [`tbs_certificate`]: Low-level certificate structure
//! - [`error`]: Error types

pub mod cert;
pub mod config;
pub mod engine;
pub mod error;
pub mod issuer;
pub mod key;
pub mod pem_utils;
pub mod tbs_certificate;
pub mod validator;
