//! Connection Handling
//!
//! Each accepted client is served by its own [`ConnectionHandler`] task.
//! The handler owns a read buffer, frames pipelined commands out of it and
//! writes the replies back in order.
//!
//! ## Example
//!
//! ```ignore
//! use tinycache::connection::{handle_connection, ConnectionConfig};
//! use tinycache::{CommandHandler, StorageEngine};
//! use std::sync::Arc;
//!
//! let storage = Arc::new(StorageEngine::new());
//!
//! // For each accepted connection...
//! let (stream, addr) = listener.accept().await?;
//! let handler = CommandHandler::new(Arc::clone(&storage));
//! tokio::spawn(handle_connection(stream, addr, handler, ConnectionConfig::default()));
//! ```

pub mod handler;

pub use handler::{handle_connection, ConnectionConfig, ConnectionError, ConnectionHandler};
