#![allow(dead_code)]

use certmint::engine::{Engine, EngineFacade};
use certmint::key::{KeyPair, MemoryKeySource};
use serde_json::{Value, json};

/// A facade whose in-memory key source holds `keys` under their identities.
pub fn facade_with_keys(keys: &[(&str, &KeyPair)]) -> EngineFacade {
    let source = MemoryKeySource::new();
    for (identity, key) in keys {
        source
            .insert(*identity, key.to_pkcs8_pem().unwrap())
            .unwrap();
    }
    EngineFacade::from_engine(Engine::with_source(Box::new(source)))
}

pub fn key_identity(key_type: &str, key_identity: &str) -> Value {
    json!({ "key-type": key_type, "key-identity": key_identity })
}

/// Minimal self-signed CA parameters signed by `key_type`/`key_identity`.
pub fn ca_params(key_type: &str, key_identity: &str) -> Value {
    json!({
        "signing-private-key-identity": { "key-type": key_type, "key-identity": key_identity },
        "subject-name": { "CN": "myca.local", "O": "CertMint Tests" },
        "issuer-name": { "CN": "myca.local", "O": "CertMint Tests" },
        "serial": 1,
        "start-date": "2024-01-01T00:00:00Z",
        "expiry-date": "2034-01-01T00:00:00Z",
        "basic-constraints": { "critical": true, "ca": true },
        "key-usage": { "critical": true, "key-cert-sign": true, "crl-sign": true },
    })
}

/// Leaf parameters for `subject_public_key`, issued by the CA from
/// [`ca_params`].
pub fn leaf_params(key_type: &str, key_identity: &str, subject_public_key: &str) -> Value {
    json!({
        "subject-public-key": subject_public_key,
        "signing-private-key-identity": { "key-type": key_type, "key-identity": key_identity },
        "subject-name": { "CN": "server.myca.local" },
        "issuer-name": { "CN": "myca.local", "O": "CertMint Tests" },
        "serial": 2,
        "start-date": "2024-01-01T00:00:00Z",
        "expiry-date": "2025-01-01T00:00:00Z",
    })
}
