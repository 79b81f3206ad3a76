use serde::{Deserialize, Serialize};

use crate::crypto::{
    self, CryptPrivateKey, EncryptedClientHalf, Kid, TlfCryptKeyClientHalf,
    TlfEphemeralPublicKey,
};
use crate::error::CryptoError;

/// One candidate wrapped client half in an any-unbox request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnboxBundle {
    pub ephemeral_public: TlfEphemeralPublicKey,
    pub client_half: EncryptedClientHalf,
    /// KID of the device crypt key the half was wrapped for
    pub kid: Kid,
}

/// Try `bundles` in order and return the first client half that opens,
///  with its index in `bundles` and the KID it was wrapped for.
///
/// `lookup` maps a target KID to a local private key. Bundles naming a
///  key we don't hold are skipped without an attempt.
pub fn unwrap_any<'a, F>(
    bundles: &[UnboxBundle],
    mut lookup: F,
) -> Result<(TlfCryptKeyClientHalf, usize, Kid), CryptoError>
where
    F: FnMut(&Kid) -> Option<&'a CryptPrivateKey>,
{
    if bundles.is_empty() {
        return Err(CryptoError::NoCandidateKeys);
    }

    for (index, bundle) in bundles.iter().enumerate() {
        let Some(key) = lookup(&bundle.kid) else {
            tracing::trace!(index, kid = %bundle.kid, "no local key for bundle");
            continue;
        };

        match crypto::unwrap_client_half(key, &bundle.ephemeral_public, &bundle.client_half) {
            Ok(client_half) => {
                tracing::debug!(index, kid = %bundle.kid, "unboxed client half");
                return Ok((client_half, index, bundle.kid.clone()));
            }
            Err(err) => {
                tracing::debug!(index, kid = %bundle.kid, "bundle did not open: {}", err);
            }
        }
    }

    Err(CryptoError::NoMatchingKey)
}
