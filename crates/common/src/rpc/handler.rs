use crate::crypto::VerifyingKey;
use crate::error::CryptoError;
use crate::local::LocalCrypto;
use crate::unbox::UnboxBundle;

use super::messages::{Ed25519SignatureInfo, Request, Response, UnboxAnyRes};

/// Carry out one request against the local engine
///
/// This is the responder side of every transport: the in-process
/// transport calls it directly and the crypto service calls it for each
/// frame it reads.
pub fn handle_request(engine: &LocalCrypto, request: Request) -> Result<Response, CryptoError> {
    let method = request.method();
    let result = match request {
        Request::Sign(arg) => {
            let info = engine.sign(&arg.msg);
            let public_key = VerifyingKey::from_kid(&info.verifying_key)?.to_bytes();
            Ok(Response::Sign(Ed25519SignatureInfo {
                sig: info.signature,
                public_key,
            }))
        }
        Request::UnboxBytes32(arg) => {
            let (ephemeral_public, encrypted) = arg.into_parts();
            engine
                .unwrap_client_half(&ephemeral_public, &encrypted)
                .map(Response::UnboxBytes32)
        }
        Request::UnboxBytes32Any(arg) => {
            let bundles: Vec<UnboxBundle> = arg.bundles.into_iter().map(Into::into).collect();
            let (plaintext, index, kid) = engine.unwrap_client_half_any(&bundles)?;
            Ok(Response::UnboxBytes32Any(UnboxAnyRes {
                plaintext,
                index: index as u32,
                kid,
            }))
        }
    };

    match &result {
        Ok(_) => tracing::debug!("{} handled", method),
        Err(e) => tracing::debug!("{} failed: {}", method, e),
    }
    result
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::{CryptPrivateKey, SigningKey};
    use crate::rpc::messages::SignEd25519Arg;

    #[test]
    fn test_sign_reply_carries_public_key() {
        let signing_key = SigningKey::generate().unwrap();
        let engine = LocalCrypto::new(signing_key.clone(), CryptPrivateKey::generate().unwrap());

        let response = handle_request(
            &engine,
            Request::Sign(SignEd25519Arg {
                msg: b"hello".to_vec(),
            }),
        )
        .unwrap();

        let Response::Sign(info) = response else {
            panic!("expected a sign response");
        };
        assert_eq!(info.public_key, signing_key.verifying_key().to_bytes());
        assert!(signing_key
            .verifying_key()
            .verify(b"hello", &info.sig)
            .is_ok());
    }
}
