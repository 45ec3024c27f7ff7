//! Command Dispatcher
//!
//! Glue between the codec, the validator and the store:
//!
//! ```text
//! raw bytes ──> decode ──> validate ──> CommandSpec::run ──> Reply::encode
//!                  │           │               │
//!                  └───────────┴───────────────┴──> error reply
//! ```
//!
//! Every failure along the way becomes an error reply; nothing here can take
//! down the connection or the process.
//!
//! ## Replies
//!
//! | Command                    | Success reply                           |
//! |----------------------------|-----------------------------------------|
//! | `SET`, `EXPIRE`, `FLUSHALL`| `+OK`                                   |
//! | `PING`                     | `+PONG`                                 |
//! | `GET`                      | bulk string (integers as decimal text)  |
//! | `EXISTS`, `DEL`            | `:0` / `:1`                             |
//! | `INCR`, `DECR`             | new value                               |
//! | `LPUSH`, `RPUSH`           | new list length                         |
//! | `LPOP`, `RPOP`             | popped element, or null if list empty   |
//! | `LRANGE`                   | array of bulk strings                   |
//! | `TTL`                      | seconds left, `-1` without an expiry    |
//! | `PERSIST`                  | `:1` if an expiry was removed, else `:0`|
//!
//! Missing keys are reported as `KeyNotFound` by `GET`, the pops, `LRANGE`,
//! `EXPIRE`, `TTL` and `PERSIST`.

use crate::commands::table::CommandSpec;
use crate::commands::validator::{validate, validate_raw};
use crate::error::{CacheError, CacheResult};
use crate::protocol::{decode, Reply};
use crate::storage::entry::parse_integer;
use crate::storage::StorageEngine;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Executes commands against a shared store.
///
/// Cheap to clone; every connection gets its own handle.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    storage: Arc<StorageEngine>,
}

impl CommandHandler {
    /// Creates a new command handler with the given storage engine.
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<StorageEngine> {
        &self.storage
    }

    /// Processes one raw request frame and returns the encoded reply.
    ///
    /// # Example
    /// ```
    /// use tinycache::{CommandHandler, StorageEngine};
    /// use std::sync::Arc;
    ///
    /// let handler = CommandHandler::new(Arc::new(StorageEngine::new()));
    /// let reply = handler.handle(b"*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$5\r\nvalue\r\n");
    /// assert_eq!(&reply[..], b"+OK\r\n");
    /// ```
    pub fn handle(&self, raw: &[u8]) -> Bytes {
        let reply = match decode(raw) {
            Ok(args) => self.execute(&args),
            Err(e) => {
                debug!(error = %e, "Rejected malformed frame");
                Reply::Error(e)
            }
        };
        reply.encode()
    }

    /// Validates and runs a decoded command (verb first).
    pub fn execute(&self, args: &[Bytes]) -> Reply {
        let result = validate(args).and_then(|spec| self.run(spec, args));
        Self::into_reply(result)
    }

    /// Validates and runs a human-typed command line such as
    /// `SET greeting "hello world"`.
    pub fn execute_inline(&self, line: &str) -> Reply {
        let result = validate_raw(line).and_then(|(spec, args)| self.run(spec, &args));
        Self::into_reply(result)
    }

    fn run(&self, spec: &CommandSpec, args: &[Bytes]) -> CacheResult<Reply> {
        trace!(command = spec.name, args = args.len() - 1, "Executing command");
        (spec.run)(&self.storage, &args[1..])
    }

    fn into_reply(result: CacheResult<Reply>) -> Reply {
        result.unwrap_or_else(|e| {
            debug!(kind = e.kind(), error = %e, "Command failed");
            Reply::Error(e)
        })
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Parses an integer argument. The validator has already checked numeric
/// positions, so this only fails for callers that skipped it.
fn integer_arg(arg: &Bytes) -> CacheResult<i64> {
    parse_integer(arg).ok_or_else(CacheError::not_an_integer)
}

/// Converts a TTL in seconds; zero or negative means "already expired".
fn ttl_arg(arg: &Bytes) -> CacheResult<Duration> {
    let secs = integer_arg(arg)?;
    Ok(Duration::from_secs(secs.max(0) as u64))
}

// ============================================================================
// Key / String Commands
// ============================================================================

/// SET key value [ttl]
pub(crate) fn cmd_set(storage: &StorageEngine, args: &[Bytes]) -> CacheResult<Reply> {
    let key = args[0].clone();
    let value = args[1].clone();

    match args.get(2) {
        Some(ttl) => storage.set_with_ttl(key, value, ttl_arg(ttl)?),
        None => storage.set(key, value),
    }

    Ok(Reply::ok())
}

/// GET key
pub(crate) fn cmd_get(storage: &StorageEngine, args: &[Bytes]) -> CacheResult<Reply> {
    storage.get(&args[0]).map(Reply::Bulk)
}

/// EXISTS key
pub(crate) fn cmd_exists(storage: &StorageEngine, args: &[Bytes]) -> CacheResult<Reply> {
    Ok(Reply::Integer(storage.exists(&args[0]) as i64))
}

/// DEL key
pub(crate) fn cmd_del(storage: &StorageEngine, args: &[Bytes]) -> CacheResult<Reply> {
    Ok(Reply::Integer(storage.delete(&args[0]) as i64))
}

/// INCR key
pub(crate) fn cmd_incr(storage: &StorageEngine, args: &[Bytes]) -> CacheResult<Reply> {
    storage.incr(&args[0]).map(Reply::Integer)
}

/// DECR key
pub(crate) fn cmd_decr(storage: &StorageEngine, args: &[Bytes]) -> CacheResult<Reply> {
    storage.decr(&args[0]).map(Reply::Integer)
}

// ============================================================================
// List Commands
// ============================================================================

/// LPUSH key value [value ...]
pub(crate) fn cmd_lpush(storage: &StorageEngine, args: &[Bytes]) -> CacheResult<Reply> {
    let len = storage.lpush(args[0].clone(), args[1..].to_vec())?;
    Ok(Reply::Integer(len as i64))
}

/// RPUSH key value [value ...]
pub(crate) fn cmd_rpush(storage: &StorageEngine, args: &[Bytes]) -> CacheResult<Reply> {
    let len = storage.rpush(args[0].clone(), args[1..].to_vec())?;
    Ok(Reply::Integer(len as i64))
}

/// LPOP key
pub(crate) fn cmd_lpop(storage: &StorageEngine, args: &[Bytes]) -> CacheResult<Reply> {
    Ok(storage.lpop(&args[0])?.map_or(Reply::Null, Reply::Bulk))
}

/// RPOP key
pub(crate) fn cmd_rpop(storage: &StorageEngine, args: &[Bytes]) -> CacheResult<Reply> {
    Ok(storage.rpop(&args[0])?.map_or(Reply::Null, Reply::Bulk))
}

/// LRANGE key start end
pub(crate) fn cmd_lrange(storage: &StorageEngine, args: &[Bytes]) -> CacheResult<Reply> {
    let start = integer_arg(&args[1])?;
    let end = integer_arg(&args[2])?;
    storage.lrange(&args[0], start, end).map(Reply::Array)
}

// ============================================================================
// Expiry Commands
// ============================================================================

/// EXPIRE key seconds
pub(crate) fn cmd_expire(storage: &StorageEngine, args: &[Bytes]) -> CacheResult<Reply> {
    if storage.expire(&args[0], ttl_arg(&args[1])?) {
        Ok(Reply::ok())
    } else {
        Err(CacheError::KeyNotFound)
    }
}

/// TTL key
pub(crate) fn cmd_ttl(storage: &StorageEngine, args: &[Bytes]) -> CacheResult<Reply> {
    storage
        .ttl(&args[0])
        .map(Reply::Integer)
        .ok_or(CacheError::KeyNotFound)
}

/// PERSIST key
pub(crate) fn cmd_persist(storage: &StorageEngine, args: &[Bytes]) -> CacheResult<Reply> {
    storage
        .persist(&args[0])
        .map(|removed| Reply::Integer(removed as i64))
        .ok_or(CacheError::KeyNotFound)
}

// ============================================================================
// Server Commands
// ============================================================================

/// PING
pub(crate) fn cmd_ping(_storage: &StorageEngine, _args: &[Bytes]) -> CacheResult<Reply> {
    Ok(Reply::pong())
}

/// FLUSHALL
pub(crate) fn cmd_flushall(storage: &StorageEngine, _args: &[Bytes]) -> CacheResult<Reply> {
    storage.flush();
    Ok(Reply::ok())
}
