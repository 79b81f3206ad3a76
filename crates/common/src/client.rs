use async_trait::async_trait;

use crate::context::Context;
use crate::crypto::{
    EncryptedClientHalf, Kid, KidType, SignatureInfo, TlfCryptKeyClientHalf,
    TlfEphemeralPublicKey, SIG_ED25519,
};
use crate::error::CryptoError;
use crate::local::LocalCrypto;
use crate::provider::Crypto;
use crate::rpc::{
    CiphertextBundle, LocalTransport, Request, Response, SignEd25519Arg, Transport,
    UnboxBytes32AnyArg, UnboxBytes32Arg,
};
use crate::unbox::UnboxBundle;

/// Crypto operations carried out by whatever sits behind a [`Transport`]
///
/// Each call races the transport against the caller's [`Context`]. Once
/// the context fires the call reports `OperationCanceled`, whatever the
/// transport ends up answering. Errors from the remote engine are
/// returned as they came.
#[derive(Debug, Clone)]
pub struct CryptoClient<T> {
    transport: T,
}

impl<T: Transport> CryptoClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn call(&self, ctx: &Context, request: Request) -> Result<Response, CryptoError> {
        let method = request.method();
        if ctx.is_cancelled() {
            tracing::debug!("{} not sent, context already canceled", method);
            return Err(CryptoError::OperationCanceled);
        }

        tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                tracing::debug!("{} canceled while outstanding", method);
                Err(CryptoError::OperationCanceled)
            }
            result = self.transport.call(request) => match result {
                Err(_) if ctx.is_cancelled() => Err(CryptoError::OperationCanceled),
                Err(e) => {
                    tracing::debug!("{} failed: {}", method, e);
                    Err(e)
                }
                Ok(response) => Ok(response),
            },
        }
    }
}

impl CryptoClient<LocalTransport> {
    /// A client answered by an in-process engine
    pub fn local(engine: LocalCrypto) -> Self {
        Self::new(LocalTransport::new(engine))
    }
}

fn unexpected(expected: &str, response: &Response) -> CryptoError {
    CryptoError::transport(format!(
        "expected {} reply, got {}",
        expected,
        response.method()
    ))
}

#[async_trait]
impl<T: Transport> Crypto for CryptoClient<T> {
    async fn sign(&self, ctx: &Context, msg: &[u8]) -> Result<SignatureInfo, CryptoError> {
        let request = Request::Sign(SignEd25519Arg { msg: msg.to_vec() });
        let method = request.method();
        match self.call(ctx, request).await? {
            Response::Sign(info) => Ok(SignatureInfo {
                version: SIG_ED25519,
                signature: info.sig,
                verifying_key: Kid::new(KidType::Ed25519, &info.public_key),
            }),
            other => Err(unexpected(method, &other)),
        }
    }

    async fn unwrap_client_half(
        &self,
        ctx: &Context,
        ephemeral_public: &TlfEphemeralPublicKey,
        encrypted: &EncryptedClientHalf,
    ) -> Result<TlfCryptKeyClientHalf, CryptoError> {
        let nonce = encrypted.check()?;
        let request = Request::UnboxBytes32(UnboxBytes32Arg {
            encrypted_bytes32: encrypted.encrypted_data.clone(),
            nonce,
            peers_public_key: ephemeral_public.to_bytes(),
        });
        let method = request.method();
        match self.call(ctx, request).await? {
            Response::UnboxBytes32(client_half) => Ok(client_half),
            other => Err(unexpected(method, &other)),
        }
    }

    async fn unwrap_client_half_any(
        &self,
        ctx: &Context,
        bundles: &[UnboxBundle],
    ) -> Result<(TlfCryptKeyClientHalf, usize, Kid), CryptoError> {
        if bundles.is_empty() {
            return Err(CryptoError::NoCandidateKeys);
        }

        // position in `bundles` of each bundle actually sent
        let mut index_lookup = Vec::with_capacity(bundles.len());
        let mut sent = Vec::with_capacity(bundles.len());
        for (index, bundle) in bundles.iter().enumerate() {
            match bundle.client_half.check() {
                Ok(nonce) => {
                    index_lookup.push(index);
                    sent.push(CiphertextBundle {
                        kid: bundle.kid.clone(),
                        ciphertext: bundle.client_half.encrypted_data.clone(),
                        nonce,
                        public_key: bundle.ephemeral_public.to_bytes(),
                    });
                }
                Err(e) => tracing::debug!(index, kid = %bundle.kid, "dropping bundle: {}", e),
            }
        }
        if sent.is_empty() {
            return Err(CryptoError::NoMatchingKey);
        }

        let request = Request::UnboxBytes32Any(UnboxBytes32AnyArg { bundles: sent });
        let method = request.method();
        match self.call(ctx, request).await? {
            Response::UnboxBytes32Any(res) => {
                let index = index_lookup
                    .get(res.index as usize)
                    .copied()
                    .ok_or_else(|| {
                        CryptoError::transport(format!("reply index {} out of range", res.index))
                    })?;
                Ok((res.plaintext, index, res.kid))
            }
            other => Err(unexpected(method, &other)),
        }
    }
}
