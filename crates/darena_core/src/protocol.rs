//! Wire protocol between clients and the relay server.
//!
//! Every message travels as one frame: a 4-byte big-endian body length
//! followed by the bincode body. Bodies use big-endian varint encoding and
//! may not exceed [`MAX_FRAME_LEN`].

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::terrain::TerrainPoint;
pub use crate::turn_log::TurnLog as TurnPayload;

/// Size of the length prefix.
pub const HEADER_LEN: usize = 4;

/// Largest body a frame may carry.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Errors produced while encoding or decoding frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The length prefix is zero or larger than [`MAX_FRAME_LEN`].
    #[error("Malformed frame length: {0}")]
    MalformedLength(usize),

    /// Fewer bytes than the header announced.
    #[error("Truncated frame: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes announced by the header (or the header itself).
        expected: usize,
        /// Bytes available.
        actual: usize,
    },

    /// More bytes than the header announced.
    #[error("Frame has {0} trailing bytes")]
    TrailingBytes(usize),

    /// The body does not match any known message shape.
    #[error("Schema mismatch: {0}")]
    Schema(#[source] bincode::Error),

    /// A message could not be serialized.
    #[error("Failed to encode message: {0}")]
    Encode(#[source] bincode::Error),
}

/// Messages sent by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// First message on a new connection.
    ConnectionRequest {
        /// Display name typed by the user.
        player_name: String,
    },
    /// The sender's finished turn.
    Turn(TurnPayload),
}

/// Both islands, sent once both seats are filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerTerrainResponse {
    /// Seat of the receiving client.
    pub client_id: u8,
    /// Left then right island heightmaps.
    pub heightmaps: [Vec<TerrainPoint>; 2],
}

/// Messages sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Reply to a [`ClientMessage::ConnectionRequest`].
    ConnectionAck {
        /// Seat assigned to the client.
        client_id: u8,
    },
    /// Match start: both islands.
    Terrain(ServerTerrainResponse),
    /// The opponent's trimmed turn.
    Turn(TurnPayload),
}

fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_big_endian()
        .with_varint_encoding()
        .with_limit(MAX_FRAME_LEN as u64)
        .reject_trailing_bytes()
}

/// Serialize `message` into a complete frame.
///
/// # Errors
/// Returns [`ProtocolError::Encode`] when serialization fails or the body
/// exceeds [`MAX_FRAME_LEN`].
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    let body = wire_options()
        .serialize(message)
        .map_err(ProtocolError::Encode)?;

    let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Parse a length prefix.
///
/// # Errors
/// Returns [`ProtocolError::MalformedLength`] for zero or oversized lengths.
pub fn body_len(header: [u8; HEADER_LEN]) -> Result<usize, ProtocolError> {
    let len = u32::from_be_bytes(header) as usize;
    if len == 0 || len > MAX_FRAME_LEN {
        return Err(ProtocolError::MalformedLength(len));
    }
    Ok(len)
}

/// Decode a complete frame, header included.
///
/// # Errors
/// Returns a [`ProtocolError`] when the frame is short, long, or its body
/// does not decode as `T`.
pub fn decode<T: DeserializeOwned>(frame: &[u8]) -> Result<T, ProtocolError> {
    if frame.len() < HEADER_LEN {
        return Err(ProtocolError::Truncated {
            expected: HEADER_LEN,
            actual: frame.len(),
        });
    }

    let (header, body) = frame.split_at(HEADER_LEN);
    let len = body_len([header[0], header[1], header[2], header[3]])?;
    if body.len() < len {
        return Err(ProtocolError::Truncated {
            expected: len,
            actual: body.len(),
        });
    }
    if body.len() > len {
        return Err(ProtocolError::TrailingBytes(body.len() - len));
    }

    decode_body(body)
}

/// Decode a body whose length prefix was already consumed.
///
/// # Errors
/// Returns [`ProtocolError::Schema`] when the body is not a valid `T`.
pub fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ProtocolError> {
    wire_options()
        .deserialize(body)
        .map_err(ProtocolError::Schema)
}
