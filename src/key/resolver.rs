use tracing::debug;

use super::{KeyIdentity, KeyPair, KeySource, KeyType};
use crate::error::{CertMintError, Result};

/// Turns [`KeyIdentity`] values into usable key material.
///
/// The configured [`KeySource`] locates the PEM text; the identity's
/// `key_type` selects how it is decoded. Failures of either step are reported
/// as [`CertMintError::KeyResolution`] naming the identity, and are never
/// retried.
pub struct KeyResolver {
    source: Box<dyn KeySource>,
}

impl KeyResolver {
    pub fn new(source: Box<dyn KeySource>) -> Self {
        Self { source }
    }

    pub fn resolve(&self, identity: &KeyIdentity) -> Result<KeyPair> {
        let key_type = KeyType::try_from(identity.key_type.as_str())
            .map_err(|e| CertMintError::key_resolution(identity, e))?;

        debug!(
            key_type = %key_type,
            key_identity = %identity.key_identity,
            source = %self.source.describe(),
            "resolving key identity"
        );

        let material = self.source.fetch(identity)?;
        KeyPair::from_pem(key_type, &material).map_err(|e| CertMintError::key_resolution(identity, e))
    }

    /// Resolve `identity` and return its public half as SPKI PEM.
    ///
    /// Deterministic for unchanged key material.
    pub fn public_key_pem(&self, identity: &KeyIdentity) -> Result<String> {
        self.resolve(identity)?.public_key().to_pem()
    }
}

impl std::fmt::Debug for KeyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyResolver")
            .field("source", &self.source.describe())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::MemoryKeySource;

    fn resolver_with(id: &str, key_pair: &KeyPair) -> KeyResolver {
        let source = MemoryKeySource::new();
        source.insert(id, key_pair.to_pkcs8_pem().unwrap()).unwrap();
        KeyResolver::new(Box::new(source))
    }

    #[test]
    fn public_key_pem_is_stable() {
        let key_pair = KeyPair::generate_ecdsa_p256();
        let resolver = resolver_with("signer", &key_pair);
        let identity = KeyIdentity::new("ecdsa-p256", "signer");

        let first = resolver.public_key_pem(&identity).unwrap();
        let second = resolver.public_key_pem(&identity).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, key_pair.public_key().to_pem().unwrap());
    }

    #[test]
    fn unsupported_key_type_names_identity() {
        let resolver = resolver_with("signer", &KeyPair::generate_ed25519());
        let err = resolver
            .resolve(&KeyIdentity::new("dsa", "signer"))
            .unwrap_err();
        match err {
            CertMintError::KeyResolution {
                key_type,
                key_identity,
                ..
            } => {
                assert_eq!(key_type, "dsa");
                assert_eq!(key_identity, "signer");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn mismatched_material_is_a_resolution_error() {
        let resolver = resolver_with("signer", &KeyPair::generate_ed25519());
        let err = resolver
            .resolve(&KeyIdentity::new("ecdsa-p384", "signer"))
            .unwrap_err();
        assert!(matches!(err, CertMintError::KeyResolution { .. }));
    }

    #[test]
    fn garbage_material_is_a_resolution_error() {
        let source = MemoryKeySource::new();
        source.insert("broken", "not pem at all").unwrap();
        let resolver = KeyResolver::new(Box::new(source));
        let err = resolver
            .resolve(&KeyIdentity::new("rsa", "broken"))
            .unwrap_err();
        assert!(matches!(err, CertMintError::KeyResolution { .. }));
    }
}
