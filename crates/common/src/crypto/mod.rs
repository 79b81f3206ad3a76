//! Cryptographic primitives for folder keys
//!
//! - **Signing**: Ed25519 keys, identified by KIDs, sign on behalf of a device
//! - **Key halves**: a folder key is split into a server half and a client half
//! - **Wrapping**: client halves are sealed per device with an ephemeral X25519
//!   key and XChaCha20-Poly1305, and stored in a versioned envelope
//!
//! # Security Model
//!
//! Every wrap uses a fresh ephemeral keypair whose private half is
//! dropped right after sealing, so a stored envelope can only be opened
//! by the device whose crypt key it names. Failures while opening never
//! tell "wrong key" apart from "corrupted data".

mod envelope;
mod halves;
mod keys;
mod sealed;
mod signature;

pub use envelope::{
    EncryptedClientHalf, EncryptionVersion, ENCRYPTED_HALF_SIZE, NONCE_SIZE, SECRETBOX_OVERHEAD,
};
pub use halves::{
    combine_key_halves, mask_key, TlfCryptKey, TlfCryptKeyClientHalf, TlfCryptKeyServerHalf,
    KEY_HALF_SIZE,
};
pub use keys::{
    CryptPrivateKey, CryptPublicKey, Kid, KidType, SigningKey, TlfEphemeralPrivateKey,
    TlfEphemeralPublicKey, VerifyingKey, KID_SIZE, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE,
    SIGNATURE_SIZE,
};
pub use sealed::{unwrap_client_half, wrap_client_half};
pub use signature::{verify, SignatureInfo, SIG_ED25519};

use crate::error::CryptoError;

/// Fill a fixed-size array from the OS RNG
pub(crate) fn random_array<const N: usize>() -> Result<[u8; N], CryptoError> {
    let mut bytes = [0u8; N];
    getrandom::getrandom(&mut bytes).map_err(|_| CryptoError::RandomUnavailable)?;
    Ok(bytes)
}

/// Fresh key material for one folder key epoch
#[derive(Debug)]
pub struct TlfKeys {
    pub ephemeral_public: TlfEphemeralPublicKey,
    pub ephemeral_private: TlfEphemeralPrivateKey,
    pub crypt_key: TlfCryptKey,
}

/// Generate an ephemeral keypair and a random folder key
pub fn make_random_tlf_keys() -> Result<TlfKeys, CryptoError> {
    let ephemeral_private = TlfEphemeralPrivateKey::generate()?;
    Ok(TlfKeys {
        ephemeral_public: ephemeral_private.public(),
        ephemeral_private,
        crypt_key: TlfCryptKey::generate()?,
    })
}

/// Generate a random server half for a new key epoch
pub fn make_random_server_half() -> Result<TlfCryptKeyServerHalf, CryptoError> {
    TlfCryptKeyServerHalf::generate()
}
