use async_trait::async_trait;

use crate::context::Context;
use crate::crypto::{
    self, CryptPrivateKey, CryptPublicKey, EncryptedClientHalf, Kid, SignatureInfo, SigningKey,
    TlfCryptKeyClientHalf, TlfEphemeralPublicKey, VerifyingKey,
};
use crate::error::CryptoError;
use crate::provider::Crypto;
use crate::unbox::{self, UnboxBundle};

/// In-process crypto engine holding this device's private keys
///
/// The first crypt key is the primary device key used for single
/// unboxes; any-unbox considers all of them.
#[derive(Debug, Clone)]
pub struct LocalCrypto {
    signing_key: SigningKey,
    crypt_keys: Vec<(Kid, CryptPrivateKey)>,
}

impl LocalCrypto {
    pub fn new(signing_key: SigningKey, crypt_key: CryptPrivateKey) -> Self {
        Self {
            signing_key,
            crypt_keys: vec![(crypt_key.public().kid(), crypt_key)],
        }
    }

    /// Register another device crypt key for any-unbox
    pub fn with_crypt_key(mut self, crypt_key: CryptPrivateKey) -> Self {
        let kid = crypt_key.public().kid();
        if !self.crypt_keys.iter().any(|(k, _)| *k == kid) {
            self.crypt_keys.push((kid, crypt_key));
        }
        self
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Public half of the primary crypt key
    pub fn crypt_public_key(&self) -> CryptPublicKey {
        self.primary_crypt_key().public()
    }

    pub fn crypt_kids(&self) -> impl Iterator<Item = &Kid> {
        self.crypt_keys.iter().map(|(kid, _)| kid)
    }

    fn primary_crypt_key(&self) -> &CryptPrivateKey {
        // `new` always installs one key and nothing removes it
        &self.crypt_keys[0].1
    }

    fn crypt_key_for(&self, kid: &Kid) -> Option<&CryptPrivateKey> {
        self.crypt_keys
            .iter()
            .find(|(k, _)| k == kid)
            .map(|(_, key)| key)
    }

    pub fn sign(&self, msg: &[u8]) -> SignatureInfo {
        tracing::debug!("signing {}-byte message", msg.len());
        SignatureInfo::new(&self.signing_key, msg)
    }

    pub fn verify(&self, msg: &[u8], info: &SignatureInfo) -> Result<(), CryptoError> {
        crypto::verify(msg, info)
    }

    /// Open a client half sealed for the primary crypt key
    pub fn unwrap_client_half(
        &self,
        ephemeral_public: &TlfEphemeralPublicKey,
        encrypted: &EncryptedClientHalf,
    ) -> Result<TlfCryptKeyClientHalf, CryptoError> {
        crypto::unwrap_client_half(self.primary_crypt_key(), ephemeral_public, encrypted)
    }

    /// Open the first bundle wrapped for one of our crypt keys
    pub fn unwrap_client_half_any(
        &self,
        bundles: &[UnboxBundle],
    ) -> Result<(TlfCryptKeyClientHalf, usize, Kid), CryptoError> {
        unbox::unwrap_any(bundles, |kid| self.crypt_key_for(kid))
    }
}

#[async_trait]
impl Crypto for LocalCrypto {
    async fn sign(&self, _ctx: &Context, msg: &[u8]) -> Result<SignatureInfo, CryptoError> {
        Ok(LocalCrypto::sign(self, msg))
    }

    async fn unwrap_client_half(
        &self,
        _ctx: &Context,
        ephemeral_public: &TlfEphemeralPublicKey,
        encrypted: &EncryptedClientHalf,
    ) -> Result<TlfCryptKeyClientHalf, CryptoError> {
        LocalCrypto::unwrap_client_half(self, ephemeral_public, encrypted)
    }

    async fn unwrap_client_half_any(
        &self,
        _ctx: &Context,
        bundles: &[UnboxBundle],
    ) -> Result<(TlfCryptKeyClientHalf, usize, Kid), CryptoError> {
        LocalCrypto::unwrap_client_half_any(self, bundles)
    }
}
