//! Error taxonomy shared by the codec, the validator and the store.
//!
//! Every variant is recoverable: the dispatcher turns it into a wire error
//! reply of the form `-<Kind> <message>\r\n` and the connection carries on.

use thiserror::Error;

/// Everything that can go wrong while processing a single command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A byte that does not belong at this position of the frame.
    #[error("unexpected character at byte {offset}")]
    UnexpectedCharacter { offset: usize },

    /// The frame ended early, or the command has too few arguments.
    #[error("incomplete command")]
    IncompleteCommand,

    /// A bulk payload was not followed by `\r\n`.
    #[error("expected CRLF at byte {offset}")]
    MissingCrlf { offset: usize },

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("wrong number of arguments for '{0}' command")]
    WrongNumberOfArguments(String),

    /// A non-numeric argument where a number is required, or an operation
    /// against a value of the wrong variant.
    #[error("{0}")]
    TypeError(String),

    /// Unbalanced double quotes in a human-typed command line.
    #[error("unbalanced quotes in command line")]
    InvalidCommandFormat,

    #[error("no such key")]
    KeyNotFound,
}

impl CacheError {
    /// The kind name written at the start of an error reply.
    pub fn kind(&self) -> &'static str {
        match self {
            CacheError::UnexpectedCharacter { .. } => "UnexpectedCharacter",
            CacheError::IncompleteCommand => "IncompleteCommand",
            CacheError::MissingCrlf { .. } => "MissingCRLF",
            CacheError::UnknownCommand(_) => "UnknownCommand",
            CacheError::WrongNumberOfArguments(_) => "WrongNumberOfArguments",
            CacheError::TypeError(_) => "TypeError",
            CacheError::InvalidCommandFormat => "InvalidCommandFormat",
            CacheError::KeyNotFound => "KeyNotFound",
        }
    }

    pub(crate) fn not_an_integer() -> Self {
        CacheError::TypeError("value is not an integer or out of range".to_string())
    }

    pub(crate) fn wrong_type() -> Self {
        CacheError::TypeError(
            "operation against a key holding the wrong kind of value".to_string(),
        )
    }
}

/// Result type used throughout the command pipeline.
pub type CacheResult<T> = Result<T, CacheError>;
