//! Shared test utilities for crypto service integration tests
#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;

use tempfile::TempDir;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use ::common::crypto::{
    wrap_client_half, CryptPrivateKey, SigningKey, TlfCryptKeyClientHalf, TlfEphemeralPrivateKey,
};
use ::common::UnboxBundle;
use service::{Config, Server};

/// A running service and the keys it was configured with
pub struct TestService {
    pub addr: SocketAddr,
    pub signing_key: SigningKey,
    pub crypt_keys: Vec<CryptPrivateKey>,
    shutdown: watch::Sender<()>,
    handle: JoinHandle<()>,
    _dir: TempDir,
}

impl TestService {
    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        let _ = self.handle.await;
    }
}

/// Write key files and a config into a temp dir
pub fn write_config(crypt_key_count: usize) -> (TempDir, SigningKey, Vec<CryptPrivateKey>) {
    let dir = TempDir::new().unwrap();
    let signing_key = SigningKey::generate().unwrap();
    fs::write(dir.path().join("signing.pem"), signing_key.to_pem()).unwrap();

    let mut crypt_keys = Vec::new();
    let mut paths = Vec::new();
    for i in 0..crypt_key_count {
        let key = CryptPrivateKey::generate().unwrap();
        let name = format!("crypt-{}.pem", i);
        fs::write(dir.path().join(&name), key.to_pem()).unwrap();
        paths.push(format!("\"{}\"", name));
        crypt_keys.push(key);
    }

    let config = format!(
        "listen_addr = \"127.0.0.1:0\"\nsigning_key_path = \"signing.pem\"\ncrypt_key_paths = [{}]\nlog_level = \"debug\"\n",
        paths.join(", ")
    );
    fs::write(dir.path().join("config.toml"), config).unwrap();
    (dir, signing_key, crypt_keys)
}

/// Start a service on an ephemeral port
pub async fn spawn_service(crypt_key_count: usize) -> TestService {
    let (dir, signing_key, crypt_keys) = write_config(crypt_key_count);
    let config = Config::load(&dir.path().join("config.toml")).unwrap();
    let engine = config.load_engine().unwrap();

    let server = Server::bind(config.listen_addr, engine).await.unwrap();
    let addr = server.local_addr().unwrap();
    let (shutdown, shutdown_rx) = watch::channel(());
    let handle = tokio::spawn(async move {
        server.run(shutdown_rx).await.unwrap();
    });

    TestService {
        addr,
        signing_key,
        crypt_keys,
        shutdown,
        handle,
        _dir: dir,
    }
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
