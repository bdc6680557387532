mod util;

use certmint::cert::Certificate;
use certmint::cert::extensions::{BasicConstraints, KeyUsage, KeyUsages};
use certmint::engine::{Engine, EngineFacade};
use certmint::error::CertMintError;
use certmint::key::{KeyPair, PublicKey};
use certmint::validator::build_request_from_value;
use const_oid::db::rfc5280::{
    ID_CE_AUTHORITY_KEY_IDENTIFIER, ID_CE_BASIC_CONSTRAINTS, ID_CE_KEY_USAGE,
    ID_CE_SUBJECT_KEY_IDENTIFIER,
};
use serde_json::json;

/// Minting the same request twice with the same key yields identical PEM.
#[test]
fn x509_pem_is_deterministic() {
    let key = KeyPair::generate_ed25519();
    let facade = util::facade_with_keys(&[("ca", &key)]);
    let params = util::ca_params("ed25519", "ca");

    let first = facade.x509_pem(&params).unwrap();
    let second = facade.x509_pem(&params).unwrap();
    assert_eq!(first, second);
}

/// ECDSA nonces are derived per RFC 6979, so ECDSA-signed output is stable too.
#[test]
fn x509_pem_is_deterministic_for_ecdsa() {
    let key = KeyPair::generate_ecdsa_p384();
    let facade = util::facade_with_keys(&[("ca", &key)]);
    let params = util::ca_params("ecdsa-p384", "ca");
    assert_eq!(
        facade.x509_pem(&params).unwrap(),
        facade.x509_pem(&params).unwrap()
    );
}

#[test]
fn absent_and_empty_key_usage_differ() {
    let key = KeyPair::generate_ecdsa_p256();
    let facade = util::facade_with_keys(&[("ca", &key)]);

    let mut without = util::ca_params("ecdsa-p256", "ca");
    without.as_object_mut().unwrap().remove("key-usage");
    let mut with_empty = without.clone();
    with_empty["key-usage"] = json!({});

    let without = Certificate::from_pem(&facade.x509_pem(&without).unwrap()).unwrap();
    let with_empty = Certificate::from_pem(&facade.x509_pem(&with_empty).unwrap()).unwrap();

    assert_eq!(without.extension::<KeyUsage>().unwrap(), None);
    let key_usage = with_empty.extension::<KeyUsage>().unwrap().unwrap();
    assert!(key_usage.0.is_empty());
    assert_ne!(without, with_empty);

    let ku = with_empty
        .extensions()
        .into_iter()
        .find(|ext| ext.oid == ID_CE_KEY_USAGE)
        .unwrap();
    assert!(!ku.critical);
}

#[test]
fn extensions_follow_request() {
    let key = KeyPair::generate_ecdsa_p256();
    let facade = util::facade_with_keys(&[("ca", &key)]);
    let mut params = util::ca_params("ecdsa-p256", "ca");
    params["key-usage"] = json!({ "critical": false, "key-cert-sign": true });

    let cert = Certificate::from_pem(&facade.x509_pem(&params).unwrap()).unwrap();

    let oids: Vec<_> = cert.extensions().iter().map(|ext| ext.oid).collect();
    assert_eq!(
        oids,
        [
            ID_CE_BASIC_CONSTRAINTS,
            ID_CE_KEY_USAGE,
            ID_CE_SUBJECT_KEY_IDENTIFIER,
            ID_CE_AUTHORITY_KEY_IDENTIFIER,
        ]
    );

    let basic_constraints = cert.extension::<BasicConstraints>().unwrap().unwrap();
    assert!(basic_constraints.is_ca);
    assert_eq!(basic_constraints.max_path_length, None);
    assert!(cert.extensions()[0].critical);

    let key_usage = cert.extension::<KeyUsage>().unwrap().unwrap();
    assert!(key_usage.0.contains(KeyUsages::KeyCertSign));
    assert!(!key_usage.0.contains(KeyUsages::CRLSign));
    assert!(!cert.extensions()[1].critical);
}

#[test]
fn validity_must_be_ordered() {
    let key = KeyPair::generate_ed25519();
    let source = certmint::key::MemoryKeySource::new();
    source.insert("ca", key.to_pkcs8_pem().unwrap()).unwrap();
    let engine = Engine::with_source(Box::new(source));

    let mut params = util::ca_params("ed25519", "ca");
    params["start-date"] = json!("2030-01-01T00:00:00Z");
    params["expiry-date"] = json!("2020-01-01T00:00:00Z");
    let request = build_request_from_value(&params).unwrap();
    assert!(matches!(
        engine.x509_pem(&request),
        Err(CertMintError::InvalidValidityWindow(_))
    ));

    params["start-date"] = json!("2020-01-01T00:00:00Z");
    params["expiry-date"] = json!("2030-01-01T00:00:00Z");
    let request = build_request_from_value(&params).unwrap();
    assert!(engine.x509_pem(&request).is_ok());
}

#[test]
fn unparsable_dates_are_rejected() {
    let key = KeyPair::generate_ed25519();
    let facade = util::facade_with_keys(&[("ca", &key)]);
    let mut params = util::ca_params("ed25519", "ca");
    params["start-date"] = json!("yesterday");
    let err = facade.x509_pem(&params).unwrap_err();
    assert!(err.message.contains("validity"), "{}", err.message);
}

#[test]
fn pre_1970_dates_name_the_encoder_limit() {
    let key = KeyPair::generate_ed25519();
    let facade = util::facade_with_keys(&[("ca", &key)]);
    let mut params = util::ca_params("ed25519", "ca");
    params["start-date"] = json!("1960-01-01T00:00:00Z");
    let err = facade.x509_pem(&params).unwrap_err();
    assert!(err.message.contains("before 1970-01-01"), "{}", err.message);
}

/// Without a subject key the certificate carries the signer's public key.
#[test]
fn certificate_key_matches_public_key_pem() {
    let key = KeyPair::generate_ecdsa_p256();
    let facade = util::facade_with_keys(&[("ca", &key)]);

    let public_pem = facade
        .public_key_pem(&util::key_identity("ecdsa-p256", "ca"))
        .unwrap();
    let cert = Certificate::from_pem(
        &facade
            .x509_pem(&util::ca_params("ecdsa-p256", "ca"))
            .unwrap(),
    )
    .unwrap();

    assert_eq!(cert.subject_public_key().unwrap().to_pem().unwrap(), public_pem);
}

#[test]
fn explicit_subject_key_is_used() {
    let ca_key = KeyPair::generate_ecdsa_p256();
    let leaf_key = KeyPair::generate_ed25519();
    let facade = util::facade_with_keys(&[("ca", &ca_key)]);

    let leaf_public = leaf_key.public_key().to_pem().unwrap();
    let cert = Certificate::from_pem(
        &facade
            .x509_pem(&util::leaf_params("ecdsa-p256", "ca", &leaf_public))
            .unwrap(),
    )
    .unwrap();

    assert_eq!(cert.subject_public_key().unwrap(), leaf_key.public_key());
    assert_eq!(cert.subject().unwrap().get("CN"), Some("server.myca.local"));
    assert_eq!(cert.issuer().unwrap().get("O"), Some("CertMint Tests"));
}

#[test]
fn unsupported_subject_key_encoding_is_rejected() {
    let key = KeyPair::generate_ed25519();
    let facade = util::facade_with_keys(&[("ca", &key)]);
    let private_pem = key.to_pkcs8_pem().unwrap();

    let err = facade
        .x509_pem(&util::leaf_params("ed25519", "ca", &private_pem))
        .unwrap_err();
    assert!(err.message.contains("unsupported public key encoding"));
}

#[test]
fn serial_is_required_and_zero_is_allowed() {
    let key = KeyPair::generate_ed25519();
    let facade = util::facade_with_keys(&[("ca", &key)]);

    let mut params = util::ca_params("ed25519", "ca");
    params.as_object_mut().unwrap().remove("serial");
    assert!(matches!(
        build_request_from_value(&params),
        Err(CertMintError::MissingField { field, .. }) if field == "serial"
    ));
    assert!(facade.x509_pem(&params).unwrap_err().message.contains("'serial'"));

    params["serial"] = json!(0);
    let cert = Certificate::from_pem(&facade.x509_pem(&params).unwrap()).unwrap();
    assert_eq!(cert.inner.tbs_certificate.serial_number.as_bytes(), &[0]);
}

#[test]
fn large_serials_are_positive() {
    let key = KeyPair::generate_ed25519();
    let facade = util::facade_with_keys(&[("ca", &key)]);
    let mut params = util::ca_params("ed25519", "ca");
    params["serial"] = json!(u64::MAX);

    let cert = Certificate::from_pem(&facade.x509_pem(&params).unwrap()).unwrap();
    let serial = cert.inner.tbs_certificate.serial_number.as_bytes();
    assert_eq!(serial, &[0, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
}

#[test]
fn name_order_follows_input() {
    let key = KeyPair::generate_ed25519();
    let facade = util::facade_with_keys(&[("ca", &key)]);

    let mut cn_first = util::ca_params("ed25519", "ca");
    cn_first["subject-name"] = json!({ "CN": "a", "O": "b" });
    let mut o_first = util::ca_params("ed25519", "ca");
    o_first["subject-name"] = json!({ "O": "b", "CN": "a" });

    let order = |params: &serde_json::Value| {
        let cert = Certificate::from_pem(&facade.x509_pem(params).unwrap()).unwrap();
        cert.subject()
            .unwrap()
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
    };

    assert_eq!(order(&cn_first), ["CN=a", "O=b"]);
    assert_eq!(order(&o_first), ["O=b", "CN=a"]);
}

#[test]
fn unknown_name_attribute_is_rejected() {
    let key = KeyPair::generate_ed25519();
    let facade = util::facade_with_keys(&[("ca", &key)]);
    let mut params = util::ca_params("ed25519", "ca");
    params["subject-name"] = json!({ "favouriteColour": "blue" });

    let err = facade.x509_pem(&params).unwrap_err();
    assert!(err.message.contains("favouriteColour"));
}

#[test]
fn unknown_key_identity_is_reported() {
    let facade = util::facade_with_keys(&[]);
    let err = facade
        .x509_pem(&util::ca_params("rsa", "nobody"))
        .unwrap_err();
    assert!(err.message.contains("nobody"));
    assert!(err.message.contains("rsa"));
}

#[test]
fn filesystem_backend_resolves_keys() {
    let dir = tempfile::tempdir().unwrap();
    let key = KeyPair::generate_ecdsa_p384();
    std::fs::write(dir.path().join("root-ca.pem"), key.to_pkcs8_pem().unwrap()).unwrap();

    let facade = EngineFacade::new();
    assert!(facade.register_extra_args(&format!(
        "mode=filesystem&store-path={}",
        dir.path().display()
    )));

    let public_pem = facade
        .public_key_pem(&util::key_identity("ecdsa-p384", "root-ca"))
        .unwrap();
    assert_eq!(
        PublicKey::from_pem(&public_pem).unwrap(),
        key.public_key()
    );

    let cert = facade.x509_pem(&util::ca_params("ecdsa-p384", "root-ca")).unwrap();
    assert!(cert.starts_with("-----BEGIN CERTIFICATE-----"));

    let err = facade
        .public_key_pem(&util::key_identity("ecdsa-p384", "../root-ca"))
        .unwrap_err();
    assert!(err.message.contains("../root-ca"));
}

#[test]
fn rsa_pkcs1_keys_are_accepted() {
    use rsa::pkcs1::EncodeRsaPrivateKey;
    use rsa::pkcs8::DecodePrivateKey;

    let key = KeyPair::generate_rsa(2048).unwrap();
    let rsa_key = rsa::RsaPrivateKey::from_pkcs8_pem(&key.to_pkcs8_pem().unwrap()).unwrap();
    let pkcs1_pem = rsa_key.to_pkcs1_pem(rsa::pkcs8::LineEnding::LF).unwrap();

    let source = certmint::key::MemoryKeySource::new();
    source.insert("legacy", pkcs1_pem.as_str()).unwrap();
    let facade = EngineFacade::from_engine(Engine::with_source(Box::new(source)));

    let public_pem = facade
        .public_key_pem(&util::key_identity("rsa", "legacy"))
        .unwrap();
    assert_eq!(public_pem, key.public_key().to_pem().unwrap());
}

#[test]
fn bad_configuration_fails_every_operation() {
    let facade = EngineFacade::new();
    facade.register_extra_args("mode=filesystem");

    let first = facade
        .public_key_pem(&util::key_identity("ed25519", "ca"))
        .unwrap_err();
    let second = facade.x509_pem(&util::ca_params("ed25519", "ca")).unwrap_err();
    assert!(first.message.contains("'store-path'"));
    assert_eq!(first, second);
}
