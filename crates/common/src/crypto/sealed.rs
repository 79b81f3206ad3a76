//! Ephemeral-key sealed box for client halves
//!
//! To wrap a client half for a device:
//! 1. **Generate ephemeral keypair**: a fresh X25519 pair per wrap
//! 2. **Perform ECDH**: ephemeral private key with the device's crypt public key
//! 3. **Derive box key**: BLAKE3 over the shared secret and both public keys
//! 4. **Seal**: XChaCha20-Poly1305 under a random 24-byte nonce
//!
//! The device reverses it with its crypt private key and the ephemeral
//! public key stored next to the envelope. Any failure after the
//! envelope passes its size checks is reported as `DecryptionFailed`,
//! whether the key was wrong or the data was tampered with.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};
use x25519_dalek::SharedSecret;
use zeroize::Zeroizing;

use super::envelope::{EncryptedClientHalf, EncryptionVersion, NONCE_SIZE};
use super::halves::{TlfCryptKeyClientHalf, KEY_HALF_SIZE};
use super::keys::{
    CryptPrivateKey, CryptPublicKey, TlfEphemeralPrivateKey, TlfEphemeralPublicKey,
    PUBLIC_KEY_SIZE,
};
use super::random_array;
use crate::error::CryptoError;

const BOX_KEY_CONTEXT: &str = "tlfcrypt 2024-05-01 client half sealed box v1";

/// Derive the symmetric box key, binding both public keys into it
///
/// Returns `None` for a non-contributory exchange (low-order peer point).
fn box_key(
    shared: &SharedSecret,
    ephemeral_public: &[u8; PUBLIC_KEY_SIZE],
    recipient_public: &[u8; PUBLIC_KEY_SIZE],
) -> Option<Zeroizing<[u8; 32]>> {
    if !shared.was_contributory() {
        return None;
    }
    let mut material = Zeroizing::new([0u8; 3 * PUBLIC_KEY_SIZE]);
    material[..PUBLIC_KEY_SIZE].copy_from_slice(shared.as_bytes());
    material[PUBLIC_KEY_SIZE..2 * PUBLIC_KEY_SIZE].copy_from_slice(ephemeral_public);
    material[2 * PUBLIC_KEY_SIZE..].copy_from_slice(recipient_public);
    Some(Zeroizing::new(blake3::derive_key(
        BOX_KEY_CONTEXT,
        material.as_slice(),
    )))
}

/// Seal `client_half` for `recipient` with the sender's ephemeral key
pub fn wrap_client_half(
    ephemeral_private: &TlfEphemeralPrivateKey,
    recipient: &CryptPublicKey,
    client_half: &TlfCryptKeyClientHalf,
) -> Result<EncryptedClientHalf, CryptoError> {
    let nonce = random_array::<NONCE_SIZE>()?;
    let ephemeral_public = ephemeral_private.public();

    let shared = ephemeral_private.diffie_hellman(recipient.inner());
    let key = box_key(&shared, &ephemeral_public.to_bytes(), &recipient.to_bytes())
        .ok_or_else(|| CryptoError::InvalidKey("recipient key is a low-order point".into()))?;

    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_slice()));
    let encrypted_data = cipher
        .encrypt(XNonce::from_slice(&nonce), client_half.bytes().as_slice())
        .map_err(|_| CryptoError::InvalidKey("failed to seal client half".into()))?;

    Ok(EncryptedClientHalf {
        version: EncryptionVersion::SECRETBOX,
        nonce: nonce.to_vec(),
        encrypted_data,
    })
}

/// Open an envelope sealed for `recipient`
pub fn unwrap_client_half(
    recipient: &CryptPrivateKey,
    ephemeral_public: &TlfEphemeralPublicKey,
    encrypted: &EncryptedClientHalf,
) -> Result<TlfCryptKeyClientHalf, CryptoError> {
    let nonce = encrypted.check()?;

    let shared = recipient.diffie_hellman(&ephemeral_public.to_x25519());
    let key = box_key(
        &shared,
        &ephemeral_public.to_bytes(),
        &recipient.public().to_bytes(),
    )
    .ok_or(CryptoError::DecryptionFailed)?;

    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_slice()));
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(XNonce::from_slice(&nonce), encrypted.encrypted_data.as_slice())
            .map_err(|_| CryptoError::DecryptionFailed)?,
    );

    let bytes: [u8; KEY_HALF_SIZE] = plaintext
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::DecryptionFailed)?;
    Ok(TlfCryptKeyClientHalf::from(bytes))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::envelope::ENCRYPTED_HALF_SIZE;

    fn sealed() -> (
        CryptPrivateKey,
        TlfEphemeralPublicKey,
        TlfCryptKeyClientHalf,
        EncryptedClientHalf,
    ) {
        let device_key = CryptPrivateKey::generate().unwrap();
        let ephemeral = TlfEphemeralPrivateKey::generate().unwrap();
        let client_half = TlfCryptKeyClientHalf::generate().unwrap();
        let encrypted = wrap_client_half(&ephemeral, &device_key.public(), &client_half).unwrap();
        (device_key, ephemeral.public(), client_half, encrypted)
    }

    #[test]
    fn test_wrap_and_unwrap() {
        let (device_key, ephemeral_public, client_half, encrypted) = sealed();

        assert_eq!(encrypted.version, EncryptionVersion::SECRETBOX);
        assert_eq!(encrypted.nonce.len(), NONCE_SIZE);
        assert_eq!(encrypted.encrypted_data.len(), ENCRYPTED_HALF_SIZE);

        let recovered = unwrap_client_half(&device_key, &ephemeral_public, &encrypted).unwrap();
        assert_eq!(recovered, client_half);
    }

    #[test]
    fn test_wrong_device_cannot_unwrap() {
        let (_, ephemeral_public, _, encrypted) = sealed();
        let other_device = CryptPrivateKey::generate().unwrap();
        assert_eq!(
            unwrap_client_half(&other_device, &ephemeral_public, &encrypted),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn test_fresh_nonce_per_wrap() {
        let device_key = CryptPrivateKey::generate().unwrap();
        let ephemeral = TlfEphemeralPrivateKey::generate().unwrap();
        let client_half = TlfCryptKeyClientHalf::generate().unwrap();
        let a = wrap_client_half(&ephemeral, &device_key.public(), &client_half).unwrap();
        let b = wrap_client_half(&ephemeral, &device_key.public(), &client_half).unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.encrypted_data, b.encrypted_data);
    }

    #[test]
    fn test_low_order_ephemeral_key_is_rejected() {
        let (device_key, _, _, encrypted) = sealed();
        let zero_point = TlfEphemeralPublicKey::from([0u8; PUBLIC_KEY_SIZE]);
        assert_eq!(
            unwrap_client_half(&device_key, &zero_point, &encrypted),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn test_corrupt_tag_fails() {
        let (device_key, ephemeral_public, _, mut encrypted) = sealed();
        let last = encrypted.encrypted_data.len() - 1;
        encrypted.encrypted_data[last] ^= 0x80;
        assert_eq!(
            unwrap_client_half(&device_key, &ephemeral_public, &encrypted),
            Err(CryptoError::DecryptionFailed)
        );
    }
}
