//! Folder key halves
//!
//! A folder (TLF) key is never stored directly. The key-custody service
//! holds a random server half and every reader device holds a client
//! half, `client = key XOR server`. XOR is its own inverse, so masking a
//! key and combining the halves back are the same byte operation,
//! implemented once in [`combine`].

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::random_array;
use crate::error::CryptoError;

/// Size of the folder key and of each of its halves (256 bits)
pub const KEY_HALF_SIZE: usize = 32;

macro_rules! key_bytes32 {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
        pub struct $name([u8; KEY_HALF_SIZE]);

        impl From<[u8; KEY_HALF_SIZE]> for $name {
            fn from(bytes: [u8; KEY_HALF_SIZE]) -> Self {
                $name(bytes)
            }
        }

        impl $name {
            /// Generate a new random value from the OS RNG
            pub fn generate() -> Result<Self, CryptoError> {
                Ok($name(random_array::<KEY_HALF_SIZE>()?))
            }

            pub fn bytes(&self) -> &[u8; KEY_HALF_SIZE] {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "(..)"))
            }
        }
    };
}

key_bytes32!(
    /// The 32-byte symmetric key shared by all readers of one folder
    TlfCryptKey
);
key_bytes32!(
    /// Half of a folder key held by the key-custody service
    TlfCryptKeyServerHalf
);
key_bytes32!(
    /// Half of a folder key held (wrapped) for each reader device
    TlfCryptKeyClientHalf
);

/// The reversible bytewise combinator behind both masking and unmasking
fn combine(a: &[u8; KEY_HALF_SIZE], b: &[u8; KEY_HALF_SIZE]) -> [u8; KEY_HALF_SIZE] {
    let mut out = [0u8; KEY_HALF_SIZE];
    for (o, (x, y)) in out.iter_mut().zip(a.iter().zip(b.iter())) {
        *o = x ^ y;
    }
    out
}

/// Mask a folder key with the server half, producing the client half
pub fn mask_key(
    server_half: &TlfCryptKeyServerHalf,
    crypt_key: &TlfCryptKey,
) -> TlfCryptKeyClientHalf {
    TlfCryptKeyClientHalf(combine(&server_half.0, &crypt_key.0))
}

/// Recombine the two halves into the folder key
pub fn combine_key_halves(
    server_half: &TlfCryptKeyServerHalf,
    client_half: &TlfCryptKeyClientHalf,
) -> TlfCryptKey {
    TlfCryptKey(combine(&server_half.0, &client_half.0))
}
