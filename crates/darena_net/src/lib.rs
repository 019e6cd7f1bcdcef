//! # Duel Arena Transport
//!
//! Frames [`darena_core::protocol`] messages over tokio TCP streams.
//!
//! Both the relay server and the client use [`Connection`]. A connection
//! is a plain owned value: whoever needs to block on the socket takes it,
//! and hands it back when done.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

use std::io;
use std::net::SocketAddr;

use darena_core::protocol::{self, ProtocolError, HEADER_LEN};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, NetError>;

/// Transport errors.
#[derive(Debug, Error)]
pub enum NetError {
    /// Socket-level failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The peer closed the connection.
    #[error("Connection closed by peer")]
    Closed,

    /// The peer announced a frame the codec refuses; the stream can no
    /// longer be trusted to be aligned on frame boundaries.
    #[error("Bad frame header: {0}")]
    BadHeader(#[source] ProtocolError),

    /// A complete frame arrived but its body did not decode.
    #[error("Failed to decode frame: {0}")]
    Decode(#[source] ProtocolError),

    /// An outgoing message could not be encoded.
    #[error("Failed to encode frame: {0}")]
    Encode(#[source] ProtocolError),
}

impl NetError {
    /// Whether the connection is still usable after this error.
    ///
    /// Only body decode failures are transient: the whole frame was
    /// consumed, so the next read starts on a frame boundary.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

fn map_read_error(err: io::Error) -> NetError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        NetError::Closed
    } else {
        NetError::Io(err)
    }
}

/// One framed TCP connection.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Connection {
    /// Open a connection to `addr`.
    ///
    /// # Errors
    /// Returns [`NetError::Io`] when the connect fails.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Self::from_stream(stream)
    }

    /// Wrap an accepted stream.
    ///
    /// # Errors
    /// Returns [`NetError::Io`] when the socket cannot be configured.
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        Ok(Self { stream, peer })
    }

    /// Address of the remote end.
    #[must_use]
    pub const fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Send one message as a frame.
    ///
    /// # Errors
    /// Returns [`NetError::Encode`] or [`NetError::Io`].
    pub async fn send<T: Serialize>(&mut self, message: &T) -> Result<()> {
        let frame = protocol::encode(message).map_err(NetError::Encode)?;
        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;
        tracing::trace!(peer = %self.peer, bytes = frame.len(), "frame sent");
        Ok(())
    }

    /// Receive one frame and decode it.
    ///
    /// A body that does not decode yields [`NetError::Decode`] and leaves
    /// the connection usable.
    ///
    /// # Errors
    /// Returns [`NetError::Closed`] at end of stream, [`NetError::BadHeader`]
    /// for a refused length prefix, or [`NetError::Io`].
    pub async fn recv<T: DeserializeOwned>(&mut self) -> Result<T> {
        let mut header = [0u8; HEADER_LEN];
        self.stream
            .read_exact(&mut header)
            .await
            .map_err(map_read_error)?;
        let len = protocol::body_len(header).map_err(NetError::BadHeader)?;

        let mut body = vec![0u8; len];
        self.stream
            .read_exact(&mut body)
            .await
            .map_err(map_read_error)?;
        tracing::trace!(peer = %self.peer, bytes = len, "frame received");

        protocol::decode_body(&body).map_err(NetError::Decode)
    }

    /// Receive the next frame that decodes, skipping ones that do not.
    pub async fn recv_valid<T: DeserializeOwned>(&mut self) -> Result<T> {
        loop {
            match self.recv().await {
                Err(err) if err.is_transient() => {
                    tracing::warn!(peer = %self.peer, error = %err, "skipping undecodable frame");
                }
                other => return other,
            }
        }
    }

    /// Shut down the write half; the peer sees end of stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }

    /// Write raw bytes, bypassing the codec.
    ///
    /// Exists so tests can put malformed frames on the wire.
    #[doc(hidden)]
    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }
}
