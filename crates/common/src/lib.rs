/**
 * Adapter that turns typed crypto operations
 *  into transport calls, racing each call
 *  against the caller's context.
 */
pub mod client;
/**
 * Per-call cancellation.
 */
pub mod context;
/**
 * Cryptographic types and operations.
 *  - Signing and crypt keys, identified by KIDs
 *  - Folder key halves and masking
 *  - Sealed wrapping of client halves
 */
pub mod crypto;
pub mod error;
/**
 * In-process crypto engine holding a
 *  device's private keys.
 */
pub mod local;
/**
 * The `Crypto` trait, the seam callers
 *  program against.
 */
pub mod provider;
/**
 * Call protocol, framing and transports
 *  between a client and an engine.
 */
pub mod rpc;
/**
 * Trying several wrapped client halves
 *  until one opens.
 */
pub mod unbox;

pub use client::CryptoClient;
pub use context::{CancelHandle, Context};
pub use error::CryptoError;
pub use local::LocalCrypto;
pub use provider::Crypto;
pub use unbox::UnboxBundle;

pub mod prelude {
    pub use crate::client::CryptoClient;
    pub use crate::context::{CancelHandle, Context};
    pub use crate::crypto::{
        combine_key_halves, mask_key, CryptPrivateKey, CryptPublicKey, EncryptedClientHalf,
        EncryptionVersion, Kid, SignatureInfo, SigningKey, TlfCryptKey, TlfCryptKeyClientHalf,
        TlfCryptKeyServerHalf, TlfEphemeralPrivateKey, TlfEphemeralPublicKey, VerifyingKey,
    };
    pub use crate::error::CryptoError;
    pub use crate::local::LocalCrypto;
    pub use crate::provider::Crypto;
    pub use crate::rpc::{LocalTransport, TcpTransport, Transport};
    pub use crate::unbox::UnboxBundle;
}
