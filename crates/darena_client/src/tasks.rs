//! Background network tasks polled from the update loop.
//!
//! Each task runs on the tokio runtime, owns the [`Connection`] while it
//! waits, and hands it back together with its result. The loop checks for
//! the result once per tick and never blocks.

use std::future::Future;

use darena_core::match_state::PlayerId;
use darena_core::protocol::{ClientMessage, ServerMessage, ServerTerrainResponse};
use darena_core::turn_log::TurnLog;
use darena_net::{Connection, NetError};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

/// Result of polling a [`PendingTask`].
#[derive(Debug)]
pub enum TaskPoll<T> {
    /// Still running.
    Pending,
    /// Finished with this output.
    Ready(T),
    /// The task ended without producing output (panicked or was cancelled).
    Lost,
}

/// A spawned task whose output is collected by polling.
#[derive(Debug)]
pub struct PendingTask<T> {
    receiver: oneshot::Receiver<T>,
}

impl<T: Send + 'static> PendingTask<T> {
    /// Spawn `future` on `handle`.
    pub fn spawn<F>(handle: &Handle, future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        handle.spawn(async move {
            // The poller may be gone; nothing to do then
            let _ = sender.send(future.await);
        });
        Self { receiver }
    }

    /// Take the output if the task has finished.
    pub fn poll(&mut self) -> TaskPoll<T> {
        match self.receiver.try_recv() {
            Ok(output) => TaskPoll::Ready(output),
            Err(TryRecvError::Empty) => TaskPoll::Pending,
            Err(TryRecvError::Closed) => TaskPoll::Lost,
        }
    }
}

/// A connection handed back by a task, with what the task produced.
pub type Returned<T> = (Connection, Result<T, NetError>);

/// Open a connection, introduce ourselves and wait for the seat.
pub async fn connect(addr: String, player_name: String) -> Result<(Connection, PlayerId), NetError> {
    let mut connection = Connection::connect(addr.as_str()).await?;
    connection
        .send(&ClientMessage::ConnectionRequest { player_name })
        .await?;

    loop {
        match connection.recv_valid::<ServerMessage>().await? {
            ServerMessage::ConnectionAck { client_id } => match PlayerId::new(client_id) {
                Ok(id) => return Ok((connection, id)),
                Err(err) => tracing::warn!(error = %err, "ignoring ack with a bad seat"),
            },
            other => tracing::warn!(message = ?other, "expected a connection ack"),
        }
    }
}

/// Wait for the islands.
pub async fn await_terrain(mut connection: Connection) -> Returned<ServerTerrainResponse> {
    let result = loop {
        match connection.recv_valid::<ServerMessage>().await {
            Ok(ServerMessage::Terrain(response)) => break Ok(response),
            Ok(other) => tracing::warn!(message = ?other, "expected terrain"),
            Err(err) => break Err(err),
        }
    };
    (connection, result)
}

/// Send the finished turn.
pub async fn send_turn(mut connection: Connection, log: TurnLog) -> Returned<()> {
    let result = connection.send(&ClientMessage::Turn(log)).await;
    (connection, result)
}

/// Wait for the opponent's next turn.
pub async fn await_turn(mut connection: Connection) -> Returned<TurnLog> {
    let result = loop {
        match connection.recv_valid::<ServerMessage>().await {
            Ok(ServerMessage::Turn(log)) => break Ok(log),
            Ok(other) => tracing::warn!(message = ?other, "expected a turn"),
            Err(err) => break Err(err),
        }
    };
    (connection, result)
}
