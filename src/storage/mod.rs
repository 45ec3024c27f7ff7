//! Cache Store Module
//!
//! The store holds every key, its typed value, and its optional expiry
//! deadline, behind a single reader/writer lock. A background sweeper owned
//! by the store reclaims expired entries nobody reads again.
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │            StorageEngine            │
//! │   RwLock<HashMap<Bytes, Entry>>     │
//! │   Entry = Value + Option<Instant>   │
//! └─────────────────────────────────────┘
//!                   ▲
//!                   │ Weak
//!      ┌────────────┴────────────┐
//!      │      ExpirySweeper      │
//!      │  (Background Tokio Task) │
//!      └─────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use tinycache::storage::StorageEngine;
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! let engine = StorageEngine::new();
//!
//! engine.set(Bytes::from("color"), Bytes::from("blue"));
//! assert_eq!(engine.get(b"color"), Ok(Bytes::from("blue")));
//!
//! engine.set_with_ttl(
//!     Bytes::from("session"),
//!     Bytes::from("token123"),
//!     Duration::from_secs(3600),
//! );
//! assert!(engine.ttl(b"session").unwrap() > 0);
//! ```

pub mod engine;
pub mod entry;
pub mod expiry;

pub use engine::{StorageEngine, StorageStats};
pub use entry::{Entry, Value};
pub use expiry::{ExpiryConfig, ExpirySweeper};
