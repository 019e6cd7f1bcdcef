//! Seat assignment: accepting clients until both seats are filled.

use std::time::Duration;

use darena_core::match_state::PlayerId;
use darena_core::protocol::{ClientMessage, ServerMessage};
use darena_net::{Connection, NetError};
use tokio::net::TcpListener;
use tokio::time::timeout;

use crate::config::ServerConfig;
use crate::ServerError;

/// A connected client that completed the handshake.
#[derive(Debug)]
pub struct Seat {
    /// Seat assigned by the server.
    pub id: PlayerId,
    /// Name from the connection request.
    pub name: String,
    /// The client's connection.
    pub connection: Connection,
}

/// Why a new connection did not get a seat.
#[derive(Debug, thiserror::Error)]
enum Rejected {
    #[error("{0}")]
    Net(NetError),
    #[error("first message was not a connection request")]
    UnexpectedMessage,
    #[error("no connection request in time")]
    TimedOut,
}

/// Read the connection request and acknowledge it with `id`.
async fn handshake(connection: &mut Connection, id: PlayerId) -> Result<String, Rejected> {
    let player_name = match connection.recv::<ClientMessage>().await {
        Ok(ClientMessage::ConnectionRequest { player_name }) => player_name,
        Ok(ClientMessage::Turn(_)) => return Err(Rejected::UnexpectedMessage),
        Err(err) => return Err(Rejected::Net(err)),
    };

    connection
        .send(&ServerMessage::ConnectionAck { client_id: id.get() })
        .await
        .map_err(Rejected::Net)?;

    Ok(player_name)
}

/// Accept connections until one completes the handshake for seat `id`.
///
/// Connections that send anything other than a connection request, go
/// silent, or drop are discarded and the seat keeps waiting.
pub async fn accept_seat(
    listener: &TcpListener,
    id: PlayerId,
    config: &ServerConfig,
) -> Result<Seat, ServerError> {
    let poll = Duration::from_millis(config.accept_poll_ms);
    let handshake_limit = Duration::from_millis(config.handshake_timeout_ms);

    loop {
        let (stream, addr) = match timeout(poll, listener.accept()).await {
            Ok(accepted) => accepted?,
            Err(_) => {
                tracing::trace!(seat = %id, "still waiting for a client");
                continue;
            }
        };

        let mut connection = match Connection::from_stream(stream) {
            Ok(connection) => connection,
            Err(err) => {
                tracing::warn!(%addr, error = %err, "failed to set up connection");
                continue;
            }
        };

        let result = match timeout(handshake_limit, handshake(&mut connection, id)).await {
            Ok(result) => result,
            Err(_) => Err(Rejected::TimedOut),
        };

        match result {
            Ok(name) => {
                tracing::info!(seat = %id, %addr, player = %name, "client connected");
                return Ok(Seat {
                    id,
                    name,
                    connection,
                });
            }
            Err(reason) => {
                tracing::warn!(seat = %id, %addr, %reason, "dropping client that failed the handshake");
            }
        }
    }
}
