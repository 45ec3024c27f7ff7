//! Client Connection Loop
//!
//! Each client gets its own handler task that runs in a loop, reading bytes,
//! framing complete commands out of its buffer and writing one reply per
//! command.
//!
//! ```text
//!   read ──> buffer ──> frame? ──yes──> execute ──> queue reply ──┐
//!              ▲          │                                        │
//!              │          no (incomplete)                          │
//!              │          ▼                                        │
//!              └──────  flush replies  <───────────────────────────┘
//! ```
//!
//! TCP is a stream protocol, so a read may hold half a command or several
//! of them. Complete frames are consumed from the front of the buffer and
//! pipelined replies are flushed together before the next read.
//!
//! A buffered line that does not start with `*` is treated as an inline
//! command typed by a human (`SET greeting "hello world"`), terminated by
//! `\n` with an optional preceding `\r`.

use crate::commands::CommandHandler;
use crate::error::CacheError;
use crate::protocol::types::prefix;
use crate::protocol::{decode_frame, Reply};
use bytes::{Buf, BytesMut};
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, error, info, trace, warn};

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Per-connection limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Largest amount of unprocessed input a client may buffer (default: 64 KiB)
    pub max_buffer: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_buffer: 64 * 1024,
        }
    }
}

/// Handles a single client connection.
///
/// Generic over the transport so tests can drive it with an in-memory mock.
pub struct ConnectionHandler<S> {
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Unprocessed input
    buffer: BytesMut,

    command_handler: CommandHandler,

    config: ConnectionConfig,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        config: ConnectionConfig,
    ) -> Self {
        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE.min(config.max_buffer)),
            command_handler,
            config,
        }
    }

    /// Runs the connection until the client disconnects or an error occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected"),
            Err(ConnectionError::Io(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        result
    }

    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        let mut out = BytesMut::new();

        loop {
            while let Some(reply) = self.next_reply() {
                trace!(client = %self.addr, error = reply.is_error(), reply = %reply, "Reply");
                reply.encode_into(&mut out);
            }

            if !out.is_empty() {
                self.stream.write_all(&out).await?;
                self.stream.flush().await?;
                trace!(client = %self.addr, bytes = out.len(), "Sent replies");
                out.clear();
            }

            if !self.read_more_data().await? {
                return if self.buffer.is_empty() {
                    Ok(())
                } else {
                    Err(ConnectionError::UnexpectedEof)
                };
            }
        }
    }

    /// Executes the next complete command in the buffer, if any.
    fn next_reply(&mut self) -> Option<Reply> {
        loop {
            let &first = self.buffer.first()?;

            if first != prefix::ARRAY {
                let newline = self.buffer.iter().position(|&b| b == b'\n')?;
                let line = self.buffer.split_to(newline + 1);
                let text = String::from_utf8_lossy(&line[..newline]);
                let text = text.trim_end_matches('\r');

                if text.trim().is_empty() {
                    continue;
                }
                trace!(client = %self.addr, line = text, "Inline command");
                return Some(self.command_handler.execute_inline(text));
            }

            return match decode_frame(&self.buffer) {
                Ok((args, consumed)) => {
                    self.buffer.advance(consumed);
                    trace!(
                        client = %self.addr,
                        consumed = consumed,
                        remaining = self.buffer.len(),
                        "Framed command"
                    );
                    Some(self.command_handler.execute(&args))
                }
                Err(CacheError::IncompleteCommand) => {
                    trace!(
                        client = %self.addr,
                        buffered = self.buffer.len(),
                        "Incomplete command, need more data"
                    );
                    None
                }
                Err(e) => {
                    // The stream position is lost; drop what is buffered.
                    warn!(client = %self.addr, error = %e, "Malformed frame");
                    self.buffer.clear();
                    Some(Reply::Error(e))
                }
            };
        }
    }

    /// Reads more data into the buffer. Returns `false` on end of stream.
    async fn read_more_data(&mut self) -> Result<bool, ConnectionError> {
        if self.buffer.len() >= self.config.max_buffer {
            error!(
                client = %self.addr,
                size = self.buffer.len(),
                limit = self.config.max_buffer,
                "Buffer size limit exceeded"
            );
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(n > 0)
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The client closed the stream in the middle of a command
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    #[error("Buffer size limit exceeded")]
    BufferFull,
}

/// Runs a TCP client to completion.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    command_handler: CommandHandler,
    config: ConnectionConfig,
) {
    let handler = ConnectionHandler::new(stream, addr, command_handler, config);
    // Outcome is already logged by `run`.
    let _ = handler.run().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageEngine;
    use std::sync::Arc;
    use tokio::net::TcpListener;
    use tokio_test::io::Builder;

    fn peer() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 40000))
    }

    fn connection<S>(stream: S, config: ConnectionConfig) -> ConnectionHandler<S>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let handler = CommandHandler::new(Arc::new(StorageEngine::new()));
        ConnectionHandler::new(stream, peer(), handler, config)
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let mock = Builder::new()
            .read(b"*1\r\n$4\r\nPING\r\n")
            .write(b"+PONG\r\n")
            .build();

        connection(mock, ConnectionConfig::default())
            .run()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_pipelined_commands() {
        let mock = Builder::new()
            .read(b"*3\r\n$3\r\nSET\r\n$2\r\nk1\r\n$2\r\nv1\r\n*2\r\n$3\r\nGET\r\n$2\r\nk1\r\n*1\r\n$4\r\nPING\r\n")
            .write(b"+OK\r\n$2\r\nv1\r\n+PONG\r\n")
            .build();

        connection(mock, ConnectionConfig::default())
            .run()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_command_split_across_reads() {
        let mock = Builder::new()
            .read(b"*2\r\n$3\r\nGE")
            .read(b"T\r\n$4\r\nna")
            .read(b"me\r\n")
            .write(b"-KeyNotFound no such key\r\n")
            .build();

        connection(mock, ConnectionConfig::default())
            .run()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_malformed_frame_gets_error_and_connection_continues() {
        let mock = Builder::new()
            .read(b"*1\r\n#4\r\nPING\r\n")
            .write(b"-UnexpectedCharacter unexpected character at byte 4\r\n")
            .read(b"*1\r\n$4\r\nPING\r\n")
            .write(b"+PONG\r\n")
            .build();

        connection(mock, ConnectionConfig::default())
            .run()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_inline_commands() {
        let mock = Builder::new()
            .read(b"SET greeting \"hello world\"\r\n\r\nget greeting\n")
            .write(b"+OK\r\n$11\r\nhello world\r\n")
            .read(b"SET broken \"value\r\n")
            .write(b"-InvalidCommandFormat unbalanced quotes in command line\r\n")
            .build();

        connection(mock, ConnectionConfig::default())
            .run()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_eof_mid_command() {
        let mock = Builder::new().read(b"*1\r\n$4\r\nPI").build();

        let result = connection(mock, ConnectionConfig::default()).run().await;
        assert!(matches!(result, Err(ConnectionError::UnexpectedEof)));
    }

    #[tokio::test]
    async fn test_buffer_limit() {
        let mock = Builder::new()
            .read(b"*1\r\n$100\r\naaaaaaaaaaaaaaaaaaaa")
            .build();

        let result = connection(mock, ConnectionConfig { max_buffer: 16 }).run().await;
        assert!(matches!(result, Err(ConnectionError::BufferFull)));
    }

    #[tokio::test]
    async fn test_tcp_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let storage = Arc::new(StorageEngine::new());

        let server_storage = Arc::clone(&storage);
        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                let handler = CommandHandler::new(Arc::clone(&server_storage));
                tokio::spawn(handle_connection(
                    stream,
                    client_addr,
                    handler,
                    ConnectionConfig::default(),
                ));
            }
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"*3\r\n$3\r\nSET\r\n$4\r\nname\r\n$4\r\nblue\r\n")
            .await
            .unwrap();

        let mut buf = [0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"+OK\r\n");

        client
            .write_all(b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n")
            .await
            .unwrap();
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"$4\r\nblue\r\n");

        assert!(storage.exists(b"name"));
    }
}
