//! The command table.
//!
//! Each supported verb has one [`CommandSpec`]: its argument-count bounds,
//! which argument positions must be integers, and the function that runs it.
//! The validator and the dispatcher both read this table, so adding a
//! command is a single entry here plus its handler.

use crate::commands::handler;
use crate::error::CacheResult;
use crate::protocol::Reply;
use crate::storage::StorageEngine;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Runs a validated command. Receives the arguments after the verb.
pub type Run = fn(&StorageEngine, &[Bytes]) -> CacheResult<Reply>;

/// Metadata and callback for one command.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    /// Canonical uppercase verb.
    pub name: &'static str,
    /// Minimum argument count, verb included.
    pub min: usize,
    /// Maximum argument count, verb included; `None` for variadic commands.
    pub max: Option<usize>,
    /// Argument positions (verb = 0) that must parse as integers when present.
    pub numeric: &'static [usize],
    pub run: Run,
}

macro_rules! spec {
    ($name:literal, $min:expr, $max:expr, $numeric:expr, $run:path) => {
        CommandSpec {
            name: $name,
            min: $min,
            max: $max,
            numeric: $numeric,
            run: $run,
        }
    };
}

/// Every supported command.
pub static COMMANDS: &[CommandSpec] = &[
    spec!("SET", 3, Some(4), &[3], handler::cmd_set),
    spec!("GET", 2, Some(2), &[], handler::cmd_get),
    spec!("EXISTS", 2, Some(2), &[], handler::cmd_exists),
    spec!("DEL", 2, Some(2), &[], handler::cmd_del),
    spec!("LRANGE", 4, Some(4), &[2, 3], handler::cmd_lrange),
    spec!("LPUSH", 3, None, &[], handler::cmd_lpush),
    spec!("RPUSH", 3, None, &[], handler::cmd_rpush),
    spec!("LPOP", 2, Some(2), &[], handler::cmd_lpop),
    spec!("RPOP", 2, Some(2), &[], handler::cmd_rpop),
    spec!("EXPIRE", 3, Some(3), &[2], handler::cmd_expire),
    spec!("TTL", 2, Some(2), &[], handler::cmd_ttl),
    spec!("PERSIST", 2, Some(2), &[], handler::cmd_persist),
    spec!("INCR", 2, Some(2), &[], handler::cmd_incr),
    spec!("DECR", 2, Some(2), &[], handler::cmd_decr),
    spec!("PING", 1, Some(1), &[], handler::cmd_ping),
    spec!("FLUSHALL", 1, Some(1), &[], handler::cmd_flushall),
];

/// Finds the spec for a verb, ignoring ASCII case.
pub fn lookup(verb: &[u8]) -> Option<&'static CommandSpec> {
    static INDEX: OnceLock<HashMap<&'static str, &'static CommandSpec>> = OnceLock::new();

    let index = INDEX.get_or_init(|| COMMANDS.iter().map(|spec| (spec.name, spec)).collect());
    let name = std::str::from_utf8(verb).ok()?.to_ascii_uppercase();
    index.get(name.as_str()).copied()
}
