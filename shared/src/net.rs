//! Framed message exchange over a TCP stream.
//!
//! `Connection` owns one peer's socket and enforces the expected-message-kind
//! sequence: every receive states which kinds are acceptable, and anything
//! else is a protocol violation. End-of-stream, I/O failure and receive
//! timeout all collapse into `Disconnected` — from the session's point of
//! view the peer is simply gone.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use log::trace;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::protocol::{Message, MessageKind, ProtocolError};

/// Why an exchange with a peer stopped.
#[derive(Debug)]
pub enum NetError {
    /// The connection was lost: end-of-stream, an I/O failure, or a stalled
    /// peer exceeding a receive timeout.
    Disconnected,
    /// The peer sent something structurally invalid or out of sequence.
    Violation(String),
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::Disconnected => write!(f, "connection lost"),
            NetError::Violation(reason) => write!(f, "protocol violation: {}", reason),
        }
    }
}

impl std::error::Error for NetError {}

impl From<std::io::Error> for NetError {
    fn from(_: std::io::Error) -> NetError {
        NetError::Disconnected
    }
}

impl From<ProtocolError> for NetError {
    fn from(err: ProtocolError) -> NetError {
        NetError::Violation(err.reason)
    }
}

/// One peer's message stream.
pub struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    peer: Option<SocketAddr>,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Connection {
        let peer = stream.peer_addr().ok();
        let (read_half, write_half) = stream.into_split();
        Connection {
            reader: BufReader::new(read_half),
            writer: write_half,
            peer,
        }
    }

    pub async fn connect(host: &str, port: u16) -> std::io::Result<Connection> {
        let stream = TcpStream::connect((host, port)).await?;
        Ok(Connection::new(stream))
    }

    /// The peer address, for log lines.
    pub fn peer(&self) -> String {
        match self.peer {
            Some(addr) => addr.to_string(),
            None => "<unknown>".to_string(),
        }
    }

    pub async fn send(&mut self, message: &Message) -> Result<(), NetError> {
        let mut line = message.encode();
        trace!("-> {}: {}", self.peer(), line);
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receives the next message, requiring its kind to be one of `expected`.
    pub async fn recv(&mut self, expected: &[MessageKind]) -> Result<Message, NetError> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line).await?;
        if read == 0 {
            return Err(NetError::Disconnected);
        }
        let line = line.trim_end();
        trace!("<- {}: {}", self.peer(), line);
        let message = Message::parse(line)?;
        if !expected.contains(&message.kind()) {
            return Err(NetError::Violation(format!(
                "unexpected {:?} message, expected one of {:?}",
                message.kind(),
                expected
            )));
        }
        Ok(message)
    }

    /// Like `recv`, but converts a stalled peer into `Disconnected` after
    /// `timeout` instead of waiting forever.
    pub async fn recv_timeout(
        &mut self,
        expected: &[MessageKind],
        timeout: Duration,
    ) -> Result<Message, NetError> {
        match tokio::time::timeout(timeout, self.recv(expected)).await {
            Ok(result) => result,
            Err(_) => Err(NetError::Disconnected),
        }
    }

    /// Closes the write side. Receiving after this still drains anything the
    /// peer already sent.
    pub async fn shutdown(&mut self) {
        let _ = self.writer.shutdown().await;
    }
}
