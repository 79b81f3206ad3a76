use serde::{Deserialize, Serialize};

use crate::crypto::{
    EncryptedClientHalf, EncryptionVersion, Kid, TlfCryptKeyClientHalf, TlfEphemeralPublicKey,
    NONCE_SIZE, PUBLIC_KEY_SIZE,
};
use crate::error::CryptoError;
use crate::unbox::UnboxBundle;

/// Ask the remote signer to sign a message with its device key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignEd25519Arg {
    pub msg: Vec<u8>,
}

/// Raw signature plus the public key that made it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ed25519SignatureInfo {
    pub sig: Vec<u8>,
    pub public_key: [u8; PUBLIC_KEY_SIZE],
}

/// Ask the remote unboxer to open one client half with its primary key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnboxBytes32Arg {
    pub encrypted_bytes32: Vec<u8>,
    pub nonce: [u8; NONCE_SIZE],
    pub peers_public_key: [u8; PUBLIC_KEY_SIZE],
}

impl UnboxBytes32Arg {
    pub fn into_parts(self) -> (TlfEphemeralPublicKey, EncryptedClientHalf) {
        (
            TlfEphemeralPublicKey::from(self.peers_public_key),
            EncryptedClientHalf {
                version: EncryptionVersion::SECRETBOX,
                nonce: self.nonce.to_vec(),
                encrypted_data: self.encrypted_bytes32,
            },
        )
    }
}

/// One candidate in an `unboxBytes32Any` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextBundle {
    pub kid: Kid,
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_SIZE],
    pub public_key: [u8; PUBLIC_KEY_SIZE],
}

impl From<CiphertextBundle> for UnboxBundle {
    fn from(bundle: CiphertextBundle) -> Self {
        UnboxBundle {
            ephemeral_public: TlfEphemeralPublicKey::from(bundle.public_key),
            client_half: EncryptedClientHalf {
                version: EncryptionVersion::SECRETBOX,
                nonce: bundle.nonce.to_vec(),
                encrypted_data: bundle.ciphertext,
            },
            kid: bundle.kid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnboxBytes32AnyArg {
    pub bundles: Vec<CiphertextBundle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnboxAnyRes {
    pub plaintext: TlfCryptKeyClientHalf,
    /// Index into the bundles of the request that was sent
    pub index: u32,
    pub kid: Kid,
}

/// Every call the crypto service understands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    Sign(SignEd25519Arg),
    UnboxBytes32(UnboxBytes32Arg),
    UnboxBytes32Any(UnboxBytes32AnyArg),
}

impl Request {
    /// Method name, for logs and error messages
    pub fn method(&self) -> &'static str {
        match self {
            Request::Sign(_) => "crypto.signED25519",
            Request::UnboxBytes32(_) => "crypto.unboxBytes32",
            Request::UnboxBytes32Any(_) => "crypto.unboxBytes32Any",
        }
    }
}

/// Successful result of a `Request`, variant for variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Sign(Ed25519SignatureInfo),
    UnboxBytes32(TlfCryptKeyClientHalf),
    UnboxBytes32Any(UnboxAnyRes),
}

impl Response {
    pub fn method(&self) -> &'static str {
        match self {
            Response::Sign(_) => "crypto.signED25519",
            Response::UnboxBytes32(_) => "crypto.unboxBytes32",
            Response::UnboxBytes32Any(_) => "crypto.unboxBytes32Any",
        }
    }
}

/// A request on the wire, tagged so replies can arrive out of order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallFrame {
    pub seq: u64,
    pub request: Request,
}

/// The reply to the `CallFrame` with the same `seq`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyFrame {
    pub seq: u64,
    pub reply: Result<Response, CryptoError>,
}
