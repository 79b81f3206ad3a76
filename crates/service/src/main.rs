//! tlfcrypt-service - answers crypto calls with a device's keys
//!
//! Loads the device signing key and crypt keys named in its config and
//! serves sign / unbox requests to crypto clients over TCP.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use service::{Config, Server};

/// tlfcrypt crypto service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: PathBuf,

    /// Address to listen on, overrides the config file
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Log level (error, warn, info, debug, trace), overrides the config file
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    if let Some(log_level) = args.log_level {
        config.log_level = log_level;
    }

    // Initialize tracing
    let (non_blocking_writer, _guard) = tracing_appender::non_blocking(std::io::stdout());
    let env_filter = EnvFilter::builder()
        .with_default_directive(config.log_level()?.into())
        .from_env_lossy();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(non_blocking_writer)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stdout_layer).init();

    tracing::info!("Starting tlfcrypt crypto service");

    let engine = match config.load_engine() {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("Failed to load device keys: {}", e);
            std::process::exit(1);
        }
    };

    let server = Server::bind(config.listen_addr, engine).await?;

    // Set up graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl+c: {}", e);
            // holding the sender keeps the server running
            std::future::pending::<()>().await;
        }
        tracing::info!("Received shutdown signal");
        let _ = shutdown_tx.send(());
    });

    server.run(shutdown_rx).await?;

    tracing::info!("Crypto service shutdown complete");
    Ok(())
}
