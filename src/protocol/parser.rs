//! Request Frame Decoder
//!
//! A request is an array marker followed by exactly that many bulk strings:
//!
//! ```text
//! *<N>\r\n
//! $<len>\r\n<len bytes>\r\n      (N times)
//! ```
//!
//! Decoding walks the buffer with a cursor and never looks past the end of
//! the frame, so the same function frames a TCP stream: on success it reports
//! how many bytes the frame used, and [`CacheError::IncompleteCommand`] means
//! the caller should wait for more data.
//!
//! Decoding is a pure function of the input bytes.

use crate::error::{CacheError, CacheResult};
use crate::protocol::types::{prefix, CRLF};
use bytes::Bytes;

/// Largest length accepted in a frame header (512 MB, same as Redis).
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Cap on up-front allocation for the argument vector; a hostile count
/// must not reserve memory the payload never delivers.
const MAX_PREALLOC_ARGS: usize = 64;

/// Decodes the first request frame in `buf` into its arguments.
///
/// Bytes after the first complete frame are ignored.
///
/// # Example
/// ```
/// use tinycache::protocol::decode;
/// let args = decode(b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n").unwrap();
/// assert_eq!(args, vec!["GET", "name"]);
/// ```
pub fn decode(buf: &[u8]) -> CacheResult<Vec<Bytes>> {
    decode_frame(buf).map(|(args, _)| args)
}

/// Decodes the first request frame in `buf`, returning its arguments and the
/// number of bytes it occupied.
pub fn decode_frame(buf: &[u8]) -> CacheResult<(Vec<Bytes>, usize)> {
    let mut cursor = Cursor::new(buf);

    cursor.expect_marker(prefix::ARRAY)?;
    let count = cursor.read_length()?;

    let mut args = Vec::with_capacity(count.min(MAX_PREALLOC_ARGS));
    for _ in 0..count {
        args.push(cursor.read_bulk()?);
    }

    Ok((args, cursor.pos))
}

/// Position-tracking reader over a request buffer.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Consumes `marker`, failing if a different byte is found.
    fn expect_marker(&mut self, marker: u8) -> CacheResult<()> {
        match self.buf.get(self.pos) {
            None => Err(CacheError::IncompleteCommand),
            Some(&byte) if byte == marker => {
                self.pos += 1;
                Ok(())
            }
            Some(_) => Err(CacheError::UnexpectedCharacter { offset: self.pos }),
        }
    }

    /// Reads an unsigned decimal length and its terminating CRLF.
    fn read_length(&mut self) -> CacheResult<usize> {
        let start = self.pos;
        let mut value: usize = 0;

        while let Some(&byte) = self.buf.get(self.pos) {
            if byte == b'\r' {
                match self.buf.get(self.pos + 1) {
                    None => return Err(CacheError::IncompleteCommand),
                    Some(b'\n') if self.pos > start => {
                        self.pos += CRLF.len();
                        return Ok(value);
                    }
                    Some(_) => return Err(CacheError::UnexpectedCharacter { offset: self.pos }),
                }
            }

            if !byte.is_ascii_digit() {
                return Err(CacheError::UnexpectedCharacter { offset: self.pos });
            }

            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(usize::from(byte - b'0')))
                .filter(|v| *v <= MAX_BULK_SIZE)
                .ok_or(CacheError::UnexpectedCharacter { offset: self.pos })?;
            self.pos += 1;
        }

        Err(CacheError::IncompleteCommand)
    }

    /// Reads one `$<len>\r\n<payload>\r\n` element.
    fn read_bulk(&mut self) -> CacheResult<Bytes> {
        self.expect_marker(prefix::BULK)?;
        let len = self.read_length()?;

        let start = self.pos;
        let end = start + len;
        if self.buf.len() < end + CRLF.len() {
            return Err(CacheError::IncompleteCommand);
        }
        if &self.buf[end..end + CRLF.len()] != CRLF {
            return Err(CacheError::MissingCrlf { offset: end });
        }

        let data = Bytes::copy_from_slice(&self.buf[start..end]);
        self.pos = end + CRLF.len();
        Ok(data)
    }
}

/// Splits a human-typed command line into arguments.
///
/// Whitespace separates arguments except inside double quotes; the quotes
/// themselves are dropped, so `SET msg "hello world"` yields three arguments.
/// Quote balance is checked by the validator before this runs.
pub fn split_command_line(line: &str) -> Vec<Bytes> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(Bytes::from(std::mem::take(&mut current)));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if has_token {
        args.push(Bytes::from(current));
    }

    args
}
