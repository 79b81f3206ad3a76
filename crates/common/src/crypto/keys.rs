use std::fmt;

use ed25519_dalek::Signer;
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey as X25519PublicKey, SharedSecret, StaticSecret};

use super::random_array;
use crate::error::CryptoError;

/// Size of Ed25519 and X25519 private keys in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;
/// Size of Ed25519 and X25519 public keys in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;
/// Size of a detached Ed25519 signature in bytes
pub const SIGNATURE_SIZE: usize = 64;

const KID_VERSION: u8 = 0x01;
const KID_SUFFIX: u8 = 0x0a;
/// Total size of a KID: version || type || public key || suffix
pub const KID_SIZE: usize = PUBLIC_KEY_SIZE + 3;

const SIGNING_PEM_TAG: &str = "ED25519 PRIVATE KEY";
const CRYPT_PEM_TAG: &str = "X25519 PRIVATE KEY";

/// Algorithm byte embedded in a KID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KidType {
    /// Ed25519 signature key
    Ed25519 = 0x20,
    /// X25519 Diffie-Hellman key
    Dh = 0x21,
}

impl KidType {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x20 => Some(KidType::Ed25519),
            0x21 => Some(KidType::Dh),
            _ => None,
        }
    }
}

/// Key identifier, a stable fingerprint naming a public key
///
/// Layout:
///
/// ```text
/// [ 0x01 ][ type: 1 byte ][ public key: 32 bytes ][ 0x0a ]
/// ```
///
/// The public key can be recovered from the KID, so a verifier only
/// needs the KID carried in a `SignatureInfo`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kid(Vec<u8>);

impl Kid {
    pub fn new(kind: KidType, public_key: &[u8; PUBLIC_KEY_SIZE]) -> Self {
        let mut bytes = Vec::with_capacity(KID_SIZE);
        bytes.push(KID_VERSION);
        bytes.push(kind as u8);
        bytes.extend_from_slice(public_key);
        bytes.push(KID_SUFFIX);
        Kid(bytes)
    }

    /// Parse a KID from a hexadecimal string
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes = hex::decode(hex)
            .map_err(|_| CryptoError::InvalidKey("kid hex decode error".to_string()))?;
        Self::try_from(bytes.as_slice())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn kind(&self) -> Option<KidType> {
        self.0.get(1).copied().and_then(KidType::from_byte)
    }

    /// Extract the public key, checking that the KID names a key of the expected type
    pub fn public_key_bytes(&self, kind: KidType) -> Result<[u8; PUBLIC_KEY_SIZE], CryptoError> {
        if self.0.len() != KID_SIZE
            || self.0[0] != KID_VERSION
            || self.0[KID_SIZE - 1] != KID_SUFFIX
        {
            return Err(CryptoError::InvalidKey(format!("malformed kid {}", self)));
        }
        if self.kind() != Some(kind) {
            return Err(CryptoError::InvalidKey(format!(
                "kid {} is not a {:?} key",
                self, kind
            )));
        }
        let mut key = [0u8; PUBLIC_KEY_SIZE];
        key.copy_from_slice(&self.0[2..2 + PUBLIC_KEY_SIZE]);
        Ok(key)
    }
}

impl TryFrom<&[u8]> for Kid {
    type Error = CryptoError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != KID_SIZE {
            return Err(CryptoError::InvalidKey(format!(
                "invalid kid size, expected {}, got {}",
                KID_SIZE,
                bytes.len()
            )));
        }
        Ok(Kid(bytes.to_vec()))
    }
}

impl fmt::Display for Kid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Kid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kid({})", self.to_hex())
    }
}

fn decode_hex_key(hex: &str, what: &str) -> Result<[u8; PRIVATE_KEY_SIZE], CryptoError> {
    let hex = hex.strip_prefix("0x").unwrap_or(hex);
    let mut buff = [0; PRIVATE_KEY_SIZE];
    hex::decode_to_slice(hex, &mut buff)
        .map_err(|_| CryptoError::InvalidKey(format!("{} hex decode error", what)))?;
    Ok(buff)
}

fn decode_pem_key(pem_str: &str, tag: &str) -> Result<[u8; PRIVATE_KEY_SIZE], CryptoError> {
    let pem = pem::parse(pem_str)
        .map_err(|e| CryptoError::InvalidKey(format!("failed to parse PEM: {}", e)))?;

    if pem.tag() != tag {
        return Err(CryptoError::InvalidKey(format!(
            "invalid PEM tag, expected {}",
            tag
        )));
    }

    let contents = pem.contents();
    if contents.len() != PRIVATE_KEY_SIZE {
        return Err(CryptoError::InvalidKey(format!(
            "invalid private key size in PEM, expected {}, got {}",
            PRIVATE_KEY_SIZE,
            contents.len()
        )));
    }

    let mut bytes = [0u8; PRIVATE_KEY_SIZE];
    bytes.copy_from_slice(contents);
    Ok(bytes)
}

/// Ed25519 key used to sign messages on behalf of this device
#[derive(Clone)]
pub struct SigningKey(ed25519_dalek::SigningKey);

impl From<[u8; PRIVATE_KEY_SIZE]> for SigningKey {
    fn from(secret: [u8; PRIVATE_KEY_SIZE]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&secret))
    }
}

impl SigningKey {
    /// Generate a new random signing key from the OS RNG
    pub fn generate() -> Result<Self, CryptoError> {
        Ok(Self::from(random_array::<PRIVATE_KEY_SIZE>()?))
    }

    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        Ok(Self::from(decode_hex_key(hex, "signing key")?))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_bytes())
    }

    /// Parse a signing key from PEM with tag "ED25519 PRIVATE KEY"
    pub fn from_pem(pem_str: &str) -> Result<Self, CryptoError> {
        Ok(Self::from(decode_pem_key(pem_str, SIGNING_PEM_TAG)?))
    }

    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem::new(SIGNING_PEM_TAG, self.0.to_bytes()))
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(self.0.verifying_key())
    }

    /// Deterministic detached signature over `msg`
    pub fn sign(&self, msg: &[u8]) -> [u8; SIGNATURE_SIZE] {
        self.0.sign(msg).to_bytes()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SigningKey")
            .field(&self.verifying_key().kid())
            .finish()
    }
}

/// Public half of a `SigningKey`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyingKey(ed25519_dalek::VerifyingKey);

impl VerifyingKey {
    /// Rebuild a verifying key from the KID it is known by
    pub fn from_kid(kid: &Kid) -> Result<Self, CryptoError> {
        let bytes = kid.public_key_bytes(KidType::Ed25519)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8; PUBLIC_KEY_SIZE]) -> Result<Self, CryptoError> {
        ed25519_dalek::VerifyingKey::from_bytes(bytes)
            .map(VerifyingKey)
            .map_err(|_| CryptoError::InvalidKey("invalid ed25519 public key".to_string()))
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0.to_bytes()
    }

    pub fn kid(&self) -> Kid {
        Kid::new(KidType::Ed25519, &self.to_bytes())
    }

    /// Verify a detached signature over `msg`
    pub fn verify(&self, msg: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        let signature = ed25519_dalek::Signature::from_slice(signature)
            .map_err(|_| CryptoError::VerificationFailed)?;
        self.0
            .verify_strict(msg, &signature)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

/// X25519 private key a device unwraps folder key halves with
#[derive(Clone)]
pub struct CryptPrivateKey(StaticSecret);

impl From<[u8; PRIVATE_KEY_SIZE]> for CryptPrivateKey {
    fn from(secret: [u8; PRIVATE_KEY_SIZE]) -> Self {
        Self(StaticSecret::from(secret))
    }
}

impl CryptPrivateKey {
    pub fn generate() -> Result<Self, CryptoError> {
        Ok(Self::from(random_array::<PRIVATE_KEY_SIZE>()?))
    }

    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        Ok(Self::from(decode_hex_key(hex, "crypt key")?))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_bytes())
    }

    /// Parse a crypt key from PEM with tag "X25519 PRIVATE KEY"
    pub fn from_pem(pem_str: &str) -> Result<Self, CryptoError> {
        Ok(Self::from(decode_pem_key(pem_str, CRYPT_PEM_TAG)?))
    }

    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem::new(CRYPT_PEM_TAG, self.0.to_bytes()))
    }

    pub fn to_bytes(&self) -> [u8; PRIVATE_KEY_SIZE] {
        self.0.to_bytes()
    }

    pub fn public(&self) -> CryptPublicKey {
        CryptPublicKey(X25519PublicKey::from(&self.0))
    }

    pub(crate) fn diffie_hellman(&self, peer: &X25519PublicKey) -> SharedSecret {
        self.0.diffie_hellman(peer)
    }
}

impl fmt::Debug for CryptPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CryptPrivateKey")
            .field(&self.public().kid())
            .finish()
    }
}

/// X25519 public key folder key halves are wrapped for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CryptPublicKey(X25519PublicKey);

impl From<[u8; PUBLIC_KEY_SIZE]> for CryptPublicKey {
    fn from(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(X25519PublicKey::from(bytes))
    }
}

impl CryptPublicKey {
    pub fn from_kid(kid: &Kid) -> Result<Self, CryptoError> {
        Ok(Self::from(kid.public_key_bytes(KidType::Dh)?))
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0.to_bytes()
    }

    pub fn kid(&self) -> Kid {
        Kid::new(KidType::Dh, self.0.as_bytes())
    }

    pub(crate) fn inner(&self) -> &X25519PublicKey {
        &self.0
    }
}

/// One-time private key used to seal a single client half
///
/// Dropping it zeroizes the scalar; callers should drop it as soon as
/// the wrap is done.
pub struct TlfEphemeralPrivateKey(StaticSecret);

impl From<[u8; PRIVATE_KEY_SIZE]> for TlfEphemeralPrivateKey {
    fn from(secret: [u8; PRIVATE_KEY_SIZE]) -> Self {
        Self(StaticSecret::from(secret))
    }
}

impl TlfEphemeralPrivateKey {
    pub fn generate() -> Result<Self, CryptoError> {
        Ok(Self::from(random_array::<PRIVATE_KEY_SIZE>()?))
    }

    pub fn public(&self) -> TlfEphemeralPublicKey {
        TlfEphemeralPublicKey(X25519PublicKey::from(&self.0).to_bytes())
    }

    pub(crate) fn diffie_hellman(&self, peer: &X25519PublicKey) -> SharedSecret {
        self.0.diffie_hellman(peer)
    }
}

impl fmt::Debug for TlfEphemeralPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TlfEphemeralPrivateKey(..)")
    }
}

/// Public half of an ephemeral keypair, stored next to the wrapped key
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TlfEphemeralPublicKey([u8; PUBLIC_KEY_SIZE]);

impl From<[u8; PUBLIC_KEY_SIZE]> for TlfEphemeralPublicKey {
    fn from(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }
}

impl TlfEphemeralPublicKey {
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0
    }

    pub(crate) fn to_x25519(self) -> X25519PublicKey {
        X25519PublicKey::from(self.0)
    }
}

impl fmt::Debug for TlfEphemeralPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TlfEphemeralPublicKey({})", hex::encode(self.0))
    }
}
