use std::fmt;

use serde::{Deserialize, Serialize};

use super::halves::KEY_HALF_SIZE;
use crate::error::CryptoError;

/// Size of the XChaCha20-Poly1305 nonce in bytes
pub const NONCE_SIZE: usize = 24;
/// Size of the Poly1305 authentication tag appended by version 1
pub const SECRETBOX_OVERHEAD: usize = 16;
/// Exact ciphertext size of a version 1 encrypted client half
pub const ENCRYPTED_HALF_SIZE: usize = KEY_HALF_SIZE + SECRETBOX_OVERHEAD;

/// Version tag of an encrypted client half
///
/// Kept as a raw integer so that envelopes written by newer clients can
/// still be decoded and rejected with the version they declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EncryptionVersion(pub u32);

impl EncryptionVersion {
    /// Ephemeral-key sealed box: X25519 + XChaCha20-Poly1305
    pub const SECRETBOX: EncryptionVersion = EncryptionVersion(1);

    /// Authentication overhead for the versions this build can open
    pub fn overhead(self) -> Option<usize> {
        match self {
            Self::SECRETBOX => Some(SECRETBOX_OVERHEAD),
            _ => None,
        }
    }
}

impl fmt::Display for EncryptionVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A client half sealed for one device
///
/// # Wire Format
///
/// ```text
/// ( version, nonce: 24 bytes, encrypted_data: 32 + 16 bytes )
/// ```
///
/// Fields are plain byte vectors so a malformed envelope can be decoded
/// and reported precisely; [`EncryptedClientHalf::check`] enforces the sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedClientHalf {
    pub version: EncryptionVersion,
    pub nonce: Vec<u8>,
    pub encrypted_data: Vec<u8>,
}

impl EncryptedClientHalf {
    /// Validate the envelope before any key is tried
    ///
    /// The order of the checks is part of the contract: version first,
    /// then the ciphertext size, then the nonce size.
    pub fn check(&self) -> Result<[u8; NONCE_SIZE], CryptoError> {
        let overhead = self
            .version
            .overhead()
            .ok_or(CryptoError::UnknownEncryptionVersion(self.version))?;

        if self.encrypted_data.len() != KEY_HALF_SIZE + overhead {
            return Err(CryptoError::DecryptionFailed);
        }

        self.nonce
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidNonce(self.nonce.clone()))
    }
}
