use async_trait::async_trait;

use crate::context::Context;
use crate::crypto::{
    self, EncryptedClientHalf, Kid, SignatureInfo, TlfCryptKeyClientHalf, TlfEphemeralPublicKey,
};
use crate::error::CryptoError;
use crate::unbox::UnboxBundle;

/// The crypto operations the filesystem layer depends on
///
/// Implemented in-process by [`crate::LocalCrypto`] and over a transport
/// by [`crate::CryptoClient`]. Callers pick one at construction and only
/// see this trait.
#[async_trait]
pub trait Crypto: Send + Sync {
    /// Sign `msg` with the device signing key
    async fn sign(&self, ctx: &Context, msg: &[u8]) -> Result<SignatureInfo, CryptoError>;

    /// Open one client half sealed for the device's primary crypt key
    ///
    /// Errors, in the order they are checked:
    /// * `UnknownEncryptionVersion` - the envelope version is not supported
    /// * `DecryptionFailed` - the ciphertext has the wrong size
    /// * `InvalidNonce` - the nonce is not 24 bytes
    /// * `DecryptionFailed` - the box did not open
    async fn unwrap_client_half(
        &self,
        ctx: &Context,
        ephemeral_public: &TlfEphemeralPublicKey,
        encrypted: &EncryptedClientHalf,
    ) -> Result<TlfCryptKeyClientHalf, CryptoError>;

    /// Open the first of `bundles` wrapped for one of the device's crypt keys
    ///
    /// Returns the client half, its index in `bundles` and its KID.
    async fn unwrap_client_half_any(
        &self,
        ctx: &Context,
        bundles: &[UnboxBundle],
    ) -> Result<(TlfCryptKeyClientHalf, usize, Kid), CryptoError>;

    /// Verify a signature; pure, never touches the transport
    fn verify(&self, msg: &[u8], info: &SignatureInfo) -> Result<(), CryptoError> {
        crypto::verify(msg, info)
    }
}
