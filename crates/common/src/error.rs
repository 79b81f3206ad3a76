use serde::{Deserialize, Serialize};

use crate::crypto::EncryptionVersion;

/// Errors produced by the crypto engine, the client adapter and the
/// transports underneath it.
///
/// The type is serializable so that a remote signer can hand the exact
/// variant back to the caller; the client never reinterprets it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum CryptoError {
    /// The envelope declares a version this build cannot open.
    #[error("unknown encryption version {0}")]
    UnknownEncryptionVersion(EncryptionVersion),
    /// The nonce attached to an envelope is not 24 bytes long.
    #[error("invalid nonce {}", hex::encode(.0))]
    InvalidNonce(Vec<u8>),
    /// Wrong ciphertext size, wrong key or corrupted data.
    ///  These are deliberately indistinguishable.
    #[error("decryption failed")]
    DecryptionFailed,
    /// Any-unbox was called with an empty bundle list
    #[error("no candidate keys to unbox with")]
    NoCandidateKeys,
    /// Any-unbox tried every bundle and none opened
    #[error("no matching key could unbox any bundle")]
    NoMatchingKey,
    /// The caller's context fired before the call concluded
    #[error("operation canceled")]
    OperationCanceled,
    /// The call could not be carried out by the transport
    #[error("transport failure: {0}")]
    TransportFailure(String),
    #[error("signature verification failed")]
    VerificationFailed,
    #[error("unknown signature version {0}")]
    UnknownSignatureVersion(u32),
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("OS random generator unavailable")]
    RandomUnavailable,
}

impl CryptoError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        CryptoError::TransportFailure(err.to_string())
    }
}

impl From<bincode::Error> for CryptoError {
    fn from(err: bincode::Error) -> Self {
        CryptoError::transport(format!("codec error: {}", err))
    }
}

impl From<std::io::Error> for CryptoError {
    fn from(err: std::io::Error) -> Self {
        CryptoError::transport(format!("io error: {}", err))
    }
}
