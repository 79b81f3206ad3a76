use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use common::crypto::{CryptPrivateKey, SigningKey};
use common::LocalCrypto;

pub const DEFAULT_LISTEN_PORT: u16 = 7471;

/// Crypto service configuration, read from a TOML file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Address the service accepts client connections on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    /// PEM file holding the device signing key (ED25519 PRIVATE KEY)
    pub signing_key_path: PathBuf,
    /// PEM files holding device crypt keys (X25519 PRIVATE KEY).
    ///  The first one is the primary key.
    #[serde(default)]
    pub crypt_key_paths: Vec<PathBuf>,
    /// Default log level, overridden by RUST_LOG
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_LISTEN_PORT)
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Parse a config; relative key paths stay as written
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Load a config file, resolving relative key paths
    ///  against the directory it lives in
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let toml_str = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config = Self::from_toml(&toml_str)?;

        if let Some(base) = path.parent() {
            config.signing_key_path = base.join(&config.signing_key_path);
            config.crypt_key_paths = config
                .crypt_key_paths
                .iter()
                .map(|p| base.join(p))
                .collect();
        }
        Ok(config)
    }

    pub fn log_level(&self) -> Result<tracing::Level, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }

    /// Read the configured key files into an engine
    pub fn load_engine(&self) -> Result<LocalCrypto, ConfigError> {
        let signing_key = SigningKey::from_pem(&read_key_file(&self.signing_key_path)?)
            .map_err(|e| ConfigError::InvalidKey {
                path: self.signing_key_path.clone(),
                reason: e.to_string(),
            })?;

        let mut crypt_keys = self
            .crypt_key_paths
            .iter()
            .map(|path| {
                CryptPrivateKey::from_pem(&read_key_file(path)?).map_err(|e| {
                    ConfigError::InvalidKey {
                        path: path.clone(),
                        reason: e.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?
            .into_iter();

        let primary = crypt_keys.next().ok_or(ConfigError::NoCryptKeys)?;
        let engine = crypt_keys.fold(LocalCrypto::new(signing_key, primary), |engine, key| {
            engine.with_crypt_key(key)
        });
        tracing::info!(
            "loaded signing key {} and {} crypt key(s)",
            engine.verifying_key().kid(),
            engine.crypt_kids().count()
        );
        Ok(engine)
    }
}

fn read_key_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("invalid key in {path}: {reason}")]
    InvalidKey { path: PathBuf, reason: String },

    #[error("at least one crypt key file is required")]
    NoCryptKeys,

    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),
}
