//! tinycache server entry point.
//!
//! Sets up logging, the shared store and its expiry sweeper, then accepts
//! connections until Ctrl+C.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tinycache::connection::{handle_connection, ConnectionConfig};
use tinycache::{CommandHandler, Config, StorageEngine};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&config.log_level))
                .context("invalid log filter")?,
        )
        .with_target(false)
        .init();

    let storage = StorageEngine::with_sweeper(config.expiry());
    info!(version = tinycache::VERSION, "Storage engine initialized");

    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    info!("Listening on {}", config.bind_address());

    tokio::select! {
        _ = accept_loop(listener, Arc::clone(&storage), config.connection()) => {}
        result = signal::ctrl_c() => {
            result.context("failed to listen for Ctrl+C")?;
            info!("Shutdown signal received, stopping server...");
        }
    }

    if let Some(sweeper) = storage.sweeper() {
        sweeper.stop();
    }
    info!(keys = storage.len(), "Server shutdown complete");
    Ok(())
}

/// Accepts clients forever, one task per connection.
async fn accept_loop(listener: TcpListener, storage: Arc<StorageEngine>, config: ConnectionConfig) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = CommandHandler::new(Arc::clone(&storage));
                tokio::spawn(handle_connection(stream, addr, handler, config));
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
