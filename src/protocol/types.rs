//! Reply Types and Wire Encoding
//!
//! Every command produces exactly one [`Reply`]. Each reply kind has a fixed
//! wire form, all terminated with CRLF (`\r\n`):
//!
//! | Reply        | Wire form                               |
//! |--------------|-----------------------------------------|
//! | `Status`     | `+OK\r\n`                               |
//! | `Integer`    | `:<n>\r\n`                              |
//! | `Bulk`       | `$<len>\r\n<bytes>\r\n`                 |
//! | `Null`       | `$-1\r\n`                               |
//! | `Array`      | `*<count>\r\n` then one bulk per element |
//! | `Error`      | `-<Kind> <message>\r\n`                 |
//!
//! Requests travel the other way as an array of bulk strings, which
//! [`encode_command`] builds.

use crate::error::CacheError;
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// The CRLF terminator used by every frame.
pub const CRLF: &[u8] = b"\r\n";

/// Frame type markers.
pub mod prefix {
    pub const STATUS: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A reply sent back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Short status line such as `OK` or `PONG`. Must not contain CRLF.
    Status(&'static str),

    Integer(i64),

    /// Binary-safe string.
    Bulk(Bytes),

    /// The absence marker.
    Null,

    /// A flat array of bulk strings.
    Array(Vec<Bytes>),

    Error(CacheError),
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Status("OK")
    }

    pub fn pong() -> Self {
        Reply::Status("PONG")
    }

    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Reply::Bulk(data.into())
    }

    /// Encodes the reply into a fresh buffer.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len_hint());
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Appends the wire form of the reply to `buf`.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        match self {
            Reply::Status(s) => {
                buf.put_u8(prefix::STATUS);
                buf.put_slice(s.as_bytes());
                buf.put_slice(CRLF);
            }
            Reply::Integer(n) => {
                buf.put_u8(prefix::INTEGER);
                buf.put_slice(n.to_string().as_bytes());
                buf.put_slice(CRLF);
            }
            Reply::Bulk(data) => put_bulk(buf, data),
            Reply::Null => {
                buf.put_u8(prefix::BULK);
                buf.put_slice(b"-1");
                buf.put_slice(CRLF);
            }
            Reply::Array(items) => {
                put_header(buf, prefix::ARRAY, items.len());
                for item in items {
                    put_bulk(buf, item);
                }
            }
            Reply::Error(err) => {
                buf.put_u8(prefix::ERROR);
                buf.put_slice(err.kind().as_bytes());
                buf.put_u8(b' ');
                // Messages can echo client input, so keep them on one line.
                let message = err.to_string().replace(['\r', '\n'], " ");
                buf.put_slice(message.as_bytes());
                buf.put_slice(CRLF);
            }
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    fn encoded_len_hint(&self) -> usize {
        match self {
            Reply::Bulk(data) => data.len() + 16,
            Reply::Array(items) => items.iter().map(|i| i.len() + 16).sum::<usize>() + 16,
            _ => 32,
        }
    }
}

impl From<CacheError> for Reply {
    fn from(err: CacheError) -> Self {
        Reply::Error(err)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Status(s) => write!(f, "{}", s),
            Reply::Integer(n) => write!(f, "(integer) {}", n),
            Reply::Bulk(data) => write!(f, "\"{}\"", String::from_utf8_lossy(data)),
            Reply::Null => write!(f, "(nil)"),
            Reply::Array(items) if items.is_empty() => write!(f, "(empty array)"),
            Reply::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) \"{}\"", i + 1, String::from_utf8_lossy(item))?;
                }
                Ok(())
            }
            Reply::Error(err) => write!(f, "(error) {} {}", err.kind(), err),
        }
    }
}

/// Builds a request frame: an array marker followed by one bulk string per
/// argument.
///
/// # Example
/// ```
/// use tinycache::protocol::encode_command;
/// let frame = encode_command(["GET", "name"]);
/// assert_eq!(&frame[..], b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n");
/// ```
pub fn encode_command<I, A>(args: I) -> Bytes
where
    I: IntoIterator<Item = A>,
    A: AsRef<[u8]>,
{
    let args: Vec<A> = args.into_iter().collect();
    let mut buf = BytesMut::new();
    put_header(&mut buf, prefix::ARRAY, args.len());
    for arg in &args {
        put_bulk(&mut buf, arg.as_ref());
    }
    buf.freeze()
}

fn put_header(buf: &mut BytesMut, marker: u8, len: usize) {
    buf.put_u8(marker);
    buf.put_slice(len.to_string().as_bytes());
    buf.put_slice(CRLF);
}

fn put_bulk(buf: &mut BytesMut, data: &[u8]) {
    put_header(buf, prefix::BULK, data.len());
    buf.put_slice(data);
    buf.put_slice(CRLF);
}
