//! Shared test utilities for crypto client integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Barrier;

use common::crypto::{
    wrap_client_half, CryptPrivateKey, SigningKey, TlfCryptKeyClientHalf, TlfEphemeralPrivateKey,
};
use common::rpc::{handle_request, Request, Response, Transport};
use common::{CancelHandle, CryptoError, LocalCrypto, UnboxBundle};

/// Two-party meeting point between a fake remote and the test body
pub struct Rendezvous {
    barrier: Barrier,
}

impl Rendezvous {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            barrier: Barrier::new(2),
        })
    }

    pub async fn meet(&self) {
        self.barrier.wait().await;
    }
}

/// Remote engine that runs each call on its own task
///
/// With a rendezvous set, every call meets the test twice before it
/// answers: once when it has started and once when it may finish. The
/// work completes on the remote side even if the caller has given up.
pub struct FakeRemote {
    engine: LocalCrypto,
    rendezvous: Option<Arc<Rendezvous>>,
    calls: AtomicUsize,
}

impl FakeRemote {
    pub fn new(engine: LocalCrypto) -> Arc<Self> {
        Arc::new(Self {
            engine,
            rendezvous: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn with_rendezvous(engine: LocalCrypto, rendezvous: Arc<Rendezvous>) -> Arc<Self> {
        Arc::new(Self {
            engine,
            rendezvous: Some(rendezvous),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeRemote {
    async fn call(&self, request: Request) -> Result<Response, CryptoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let engine = self.engine.clone();
        let rendezvous = self.rendezvous.clone();
        tokio::spawn(async move {
            if let Some(rendezvous) = rendezvous {
                rendezvous.meet().await;
                rendezvous.meet().await;
            }
            handle_request(&engine, request)
        })
        .await
        .map_err(CryptoError::transport)?
    }
}

/// Transport that answers every call with the same reply
pub struct ScriptedTransport {
    reply: Result<Response, CryptoError>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(reply: Result<Response, CryptoError>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn call(&self, _request: Request) -> Result<Response, CryptoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone()
    }
}

/// Transport that fires the caller's context and then fails the call
pub struct CancelThenFail {
    handle: Mutex<Option<CancelHandle>>,
}

impl CancelThenFail {
    pub fn new(handle: CancelHandle) -> Self {
        Self {
            handle: Mutex::new(Some(handle)),
        }
    }
}

#[async_trait]
impl Transport for CancelThenFail {
    async fn call(&self, _request: Request) -> Result<Response, CryptoError> {
        if let Some(handle) = self.handle.lock().take() {
            handle.cancel();
        }
        Err(CryptoError::TransportFailure("connection reset".to_string()))
    }
}

/// A device engine with a fresh signing key and one crypt key
pub fn device() -> (LocalCrypto, CryptPrivateKey) {
    let crypt_key = CryptPrivateKey::generate().unwrap();
    let engine = LocalCrypto::new(SigningKey::generate().unwrap(), crypt_key.clone());
    (engine, crypt_key)
}

/// Wrap `half` for `recipient` under a fresh ephemeral key
pub fn bundle_for(recipient: &CryptPrivateKey, half: &TlfCryptKeyClientHalf) -> UnboxBundle {
    let ephemeral = TlfEphemeralPrivateKey::generate().unwrap();
    UnboxBundle {
        ephemeral_public: ephemeral.public(),
        client_half: wrap_client_half(&ephemeral, &recipient.public(), half).unwrap(),
        kid: recipient.public().kid(),
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
