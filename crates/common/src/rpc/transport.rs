use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CryptoError;
use crate::local::LocalCrypto;

use super::handler::handle_request;
use super::messages::{Request, Response};

/// Carries one request to a crypto engine and brings back its reply
///
/// A transport has no notion of cancellation; the client drops the
/// returned future when the caller's context fires. Errors the engine
/// returned must come back as-is, transport-level problems as
/// `CryptoError::TransportFailure`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, request: Request) -> Result<Response, CryptoError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn call(&self, request: Request) -> Result<Response, CryptoError> {
        (**self).call(request).await
    }
}

/// Transport that answers from an in-process engine
#[derive(Debug, Clone)]
pub struct LocalTransport {
    engine: Arc<LocalCrypto>,
}

impl LocalTransport {
    pub fn new(engine: LocalCrypto) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

impl From<Arc<LocalCrypto>> for LocalTransport {
    fn from(engine: Arc<LocalCrypto>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn call(&self, request: Request) -> Result<Response, CryptoError> {
        handle_request(&self.engine, request)
    }
}
