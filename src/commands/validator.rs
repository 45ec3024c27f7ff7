//! Argument validation.
//!
//! A command is checked against its [`CommandSpec`] before anything touches
//! the store, so a malformed command can never leave a partial mutation
//! behind.

use crate::commands::table::{lookup, CommandSpec};
use crate::error::{CacheError, CacheResult};
use crate::protocol::split_command_line;
use crate::storage::entry::parse_integer;
use bytes::Bytes;

/// Checks a decoded command (verb first) and returns its spec.
///
/// Checks run in order: known verb, minimum count, maximum count, numeric
/// arguments.
pub fn validate(args: &[Bytes]) -> CacheResult<&'static CommandSpec> {
    let verb = args
        .first()
        .ok_or_else(|| CacheError::UnknownCommand(String::new()))?;

    let spec = lookup(verb)
        .ok_or_else(|| CacheError::UnknownCommand(String::from_utf8_lossy(verb).into_owned()))?;

    if args.len() < spec.min {
        return Err(CacheError::IncompleteCommand);
    }

    if spec.max.is_some_and(|max| args.len() > max) {
        return Err(CacheError::WrongNumberOfArguments(spec.name.to_string()));
    }

    for &position in spec.numeric {
        if let Some(arg) = args.get(position) {
            if parse_integer(arg).is_none() {
                return Err(CacheError::TypeError(format!(
                    "argument {} of '{}' is not an integer",
                    position, spec.name
                )));
            }
        }
    }

    Ok(spec)
}

/// Validates a human-typed command line and returns its spec and arguments.
///
/// The line must have balanced double quotes; it is then tokenized and
/// checked like a decoded command.
pub fn validate_raw(line: &str) -> CacheResult<(&'static CommandSpec, Vec<Bytes>)> {
    if line.chars().filter(|&c| c == '"').count() % 2 != 0 {
        return Err(CacheError::InvalidCommandFormat);
    }

    let args = split_command_line(line);
    let spec = validate(&args)?;
    Ok((spec, args))
}
