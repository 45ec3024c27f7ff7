//! # tinycache - An In-Memory Key-Value Cache Server
//!
//! tinycache speaks a small RESP-style protocol over TCP. Clients send
//! commands as arrays of bulk strings and get back exactly one reply per
//! command. Values are integers, text, or lists, and any key may carry an
//! expiry deadline.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            tinycache                             │
//! │                                                                  │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────────────┐   │
//! │  │ TCP Server  │───>│ Connection  │───>│  CommandHandler     │   │
//! │  │ (Listener)  │    │  Handler    │    │ decode ▸ validate ▸ │   │
//! │  └─────────────┘    └─────────────┘    │ dispatch ▸ encode   │   │
//! │                                        └──────────┬──────────┘   │
//! │                                                   ▼              │
//! │                     ┌─────────────────────────────────────────┐  │
//! │                     │             StorageEngine               │  │
//! │                     │     RwLock<HashMap<Bytes, Entry>>       │  │
//! │                     └─────────────────────────────────────────┘  │
//! │                                                   ▲              │
//! │                     ┌─────────────────────────────┴───────────┐  │
//! │                     │    ExpirySweeper (Background Task)      │  │
//! │                     └─────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use tinycache::{CommandHandler, StorageEngine};
//! use std::sync::Arc;
//!
//! let handler = CommandHandler::new(Arc::new(StorageEngine::new()));
//!
//! handler.handle(b"*3\r\n$3\r\nSET\r\n$6\r\nnumber\r\n$2\r\n10\r\n");
//! let reply = handler.handle(b"*2\r\n$4\r\nINCR\r\n$6\r\nnumber\r\n");
//! assert_eq!(&reply[..], b":11\r\n");
//! ```
//!
//! ## Supported Commands
//!
//! - `SET key value [ttl]`, `GET key`, `EXISTS key`, `DEL key`
//! - `INCR key`, `DECR key`
//! - `LPUSH key v [v ...]`, `RPUSH key v [v ...]`, `LPOP key`, `RPOP key`
//! - `LRANGE key start end`
//! - `EXPIRE key seconds`, `TTL key`, `PERSIST key`
//! - `PING`, `FLUSHALL`
//!
//! ## Module Overview
//!
//! - [`protocol`]: request decoding and reply encoding
//! - [`commands`]: command table, validation and dispatch
//! - [`storage`]: the concurrent store and its expiry sweeper
//! - [`connection`]: per-client connection loop
//! - [`config`]: command-line and environment configuration
//! - [`error`]: the error kinds shared by every layer
//!
//! ## Expiry
//!
//! Keys with a TTL are expired in two ways:
//! 1. **Lazy**: reads treat an expired entry as absent
//! 2. **Active**: a background task periodically removes expired entries
//!
//! Memory is reclaimed even for keys that are never accessed again.

pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod storage;

pub use commands::CommandHandler;
pub use config::Config;
pub use connection::{handle_connection, ConnectionConfig};
pub use error::{CacheError, CacheResult};
pub use protocol::{decode, encode_command, Reply};
pub use storage::{ExpiryConfig, ExpirySweeper, StorageEngine};

/// The default port tinycache listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host tinycache binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of tinycache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
