//! Server configuration, read from the command line and the environment.

use crate::connection::ConnectionConfig;
use crate::storage::ExpiryConfig;
use crate::{DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "tinycache", version, about = "In-memory key-value cache server")]
pub struct Config {
    /// Host to bind to
    #[arg(long, env = "TINYCACHE_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "TINYCACHE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Milliseconds between background expiry sweeps
    #[arg(
        long,
        env = "TINYCACHE_SWEEP_INTERVAL_MS",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub sweep_interval_ms: u64,

    /// Largest unprocessed input a single client may buffer, in bytes
    #[arg(
        long,
        env = "TINYCACHE_MAX_BUFFER",
        default_value_t = 64 * 1024,
        value_parser = parse_buffer_size
    )]
    pub max_buffer: usize,

    /// Default log filter; `RUST_LOG` takes precedence when set
    #[arg(long, env = "TINYCACHE_LOG", default_value = "info")]
    pub log_level: String,
}

fn parse_buffer_size(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("buffer size must be at least 1 byte".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("invalid buffer size '{s}': {e}")),
    }
}

impl Config {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn expiry(&self) -> ExpiryConfig {
        ExpiryConfig {
            interval: Duration::from_millis(self.sweep_interval_ms),
        }
    }

    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            max_buffer: self.max_buffer,
        }
    }
}
