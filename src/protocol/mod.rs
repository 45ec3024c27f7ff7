//! Wire Protocol Codec
//!
//! Requests arrive as an array of bulk strings and are decoded into an
//! ordered list of arguments; replies are built as [`Reply`] values and
//! encoded back into bytes.
//!
//! ## Modules
//!
//! - `types`: the `Reply` enum, its wire encoding, and request frame encoding
//! - `parser`: the request frame decoder and the command-line tokenizer
//!
//! ## Example
//!
//! ```
//! use tinycache::protocol::{decode, encode_command, Reply};
//!
//! let frame = encode_command(["SET", "name", "blue"]);
//! let args = decode(&frame).unwrap();
//! assert_eq!(args.len(), 3);
//!
//! assert_eq!(&Reply::ok().encode()[..], b"+OK\r\n");
//! ```

pub mod parser;
pub mod types;

pub use parser::{decode, decode_frame, split_command_line, MAX_BULK_SIZE};
pub use types::{encode_command, Reply};
