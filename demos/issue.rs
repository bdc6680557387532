use certmint::engine::{Engine, EngineFacade};
use certmint::error::EngineError;
use certmint::key::{KeyPair, MemoryKeySource};
use serde_json::json;

fn main() -> Result<(), EngineError> {
    // Generate a CA key and a server key; only the CA key is stored in the engine
    let ca_key = KeyPair::generate_ecdsa_p256();
    let server_key = KeyPair::generate_ed25519();

    let source = MemoryKeySource::new();
    source.insert("my-test-ca", ca_key.to_pkcs8_pem()?)?;
    let facade = EngineFacade::from_engine(Engine::with_source(Box::new(source)));

    let ca_pem = facade.public_key_pem(&json!({
        "key-type": "ecdsa-p256",
        "key-identity": "my-test-ca",
    }))?;
    println!("CA Public Key PEM:\n{ca_pem}");

    let ca_name = json!({ "CN": "My Test CA", "O": "CertMint" });

    // Self-signed CA certificate
    let ca_cert = facade.x509_pem(&json!({
        "signing-private-key-identity": { "key-type": "ecdsa-p256", "key-identity": "my-test-ca" },
        "subject-name": ca_name,
        "issuer-name": ca_name,
        "serial": 1,
        "start-date": "2024-01-01T00:00:00Z",
        "expiry-date": "2034-01-01T00:00:00Z",
        "basic-constraints": { "critical": true, "ca": true },
        "key-usage": { "critical": true, "key-cert-sign": true, "crl-sign": true },
    }))?;
    println!("CA Certificate PEM:\n{ca_cert}");

    // Server certificate signed by the CA
    let server_cert = facade.x509_pem(&json!({
        "subject-public-key": server_key.public_key().to_pem()?,
        "signing-private-key-identity": { "key-type": "ecdsa-p256", "key-identity": "my-test-ca" },
        "subject-name": { "CN": "myserver.local" },
        "issuer-name": ca_name,
        "serial": 2,
        "start-date": "2024-01-01T00:00:00Z",
        "expiry-date": "2026-04-06T00:00:00Z",
    }))?;
    println!("Server Certificate PEM:\n{server_cert}");

    Ok(())
}
