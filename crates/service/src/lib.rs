//! Remote crypto service for tlfcrypt.
//!
//! Holds a device's signing and crypt keys and answers the crypto call
//! protocol over TCP, so clients can sign and unbox without ever seeing
//! the private keys.

pub mod config;
pub mod server;

pub use config::{Config, ConfigError};
pub use server::{Server, ServerError};
