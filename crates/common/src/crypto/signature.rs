use serde::{Deserialize, Serialize};

use super::keys::{Kid, SigningKey, VerifyingKey};
use crate::error::CryptoError;

/// Signature scheme tag carried in `SignatureInfo`
pub const SIG_ED25519: u32 = 1;

/// A detached signature together with the key that made it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureInfo {
    pub version: u32,
    pub signature: Vec<u8>,
    /// KID of the verifying key
    pub verifying_key: Kid,
}

impl SignatureInfo {
    pub fn new(signing_key: &SigningKey, msg: &[u8]) -> Self {
        SignatureInfo {
            version: SIG_ED25519,
            signature: signing_key.sign(msg).to_vec(),
            verifying_key: signing_key.verifying_key().kid(),
        }
    }
}

/// Check `info` against `msg`
///
/// Pure: the verifying key is recovered from the KID in `info`, nothing
/// else is consulted.
pub fn verify(msg: &[u8], info: &SignatureInfo) -> Result<(), CryptoError> {
    if info.version != SIG_ED25519 {
        return Err(CryptoError::UnknownSignatureVersion(info.version));
    }
    VerifyingKey::from_kid(&info.verifying_key)?.verify(msg, &info.signature)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_verify_checks_version() {
        let signing_key = SigningKey::generate().unwrap();
        let mut info = SignatureInfo::new(&signing_key, b"message");
        assert!(verify(b"message", &info).is_ok());

        info.version = 9;
        assert_eq!(
            verify(b"message", &info),
            Err(CryptoError::UnknownSignatureVersion(9))
        );
    }

    #[test]
    fn test_verify_rejects_truncated_signature() {
        let signing_key = SigningKey::generate().unwrap();
        let mut info = SignatureInfo::new(&signing_key, b"message");
        info.signature.pop();
        assert_eq!(
            verify(b"message", &info),
            Err(CryptoError::VerificationFailed)
        );
    }
}
