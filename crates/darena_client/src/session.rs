//! Connection ownership and the one network task in flight.

use darena_core::match_state::PlayerId;
use darena_core::protocol::ServerTerrainResponse;
use darena_core::turn_log::TurnLog;
use darena_net::{Connection, NetError};
use tokio::runtime::Handle;

use crate::tasks::{self, PendingTask, Returned, TaskPoll};

/// The network task currently running, if any.
#[derive(Debug)]
enum NetTask {
    Connect(PendingTask<Result<(Connection, PlayerId), NetError>>),
    Terrain(PendingTask<Returned<ServerTerrainResponse>>),
    SendTurn(PendingTask<Returned<()>>),
    AwaitTurn(PendingTask<Returned<TurnLog>>),
}

/// A finished network task.
#[derive(Debug)]
pub enum NetOutcome {
    /// The server assigned a seat.
    Connected(PlayerId),
    /// Connecting failed; the caller may retry.
    ConnectFailed(NetError),
    /// Both islands arrived.
    Terrain(ServerTerrainResponse),
    /// The local turn went out.
    TurnSent,
    /// The opponent's turn arrived.
    TurnReceived(TurnLog),
    /// The connection failed and was dropped.
    Disconnected(NetError),
}

/// The client's server connection and the task currently using it.
///
/// The connection lives here while idle and inside the task while one
/// runs, so at most one task touches the socket at a time.
#[derive(Debug)]
pub struct ConnectionSession {
    runtime: Handle,
    player_id: Option<PlayerId>,
    connection: Option<Connection>,
    task: Option<NetTask>,
}

impl ConnectionSession {
    /// Create a session with no connection.
    #[must_use]
    pub const fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            player_id: None,
            connection: None,
            task: None,
        }
    }

    /// Seat assigned by the server.
    #[must_use]
    pub const fn player_id(&self) -> Option<PlayerId> {
        self.player_id
    }

    /// Whether a task is running.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.task.is_some()
    }

    /// Whether a turn is still on its way to the server.
    #[must_use]
    pub const fn is_sending(&self) -> bool {
        matches!(self.task, Some(NetTask::SendTurn(_)))
    }

    /// Whether the session holds or lends out a live connection.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connection.is_some() || matches!(
            self.task,
            Some(NetTask::Terrain(_) | NetTask::SendTurn(_) | NetTask::AwaitTurn(_))
        )
    }

    /// Start connecting to `addr` as `player_name`.
    pub fn start_connect(&mut self, addr: &str, player_name: &str) -> bool {
        if self.is_busy() {
            return false;
        }
        tracing::debug!(%addr, player = %player_name, "connecting");
        let task = tasks::connect(addr.to_string(), player_name.to_string());
        self.task = Some(NetTask::Connect(PendingTask::spawn(&self.runtime, task)));
        true
    }

    /// Start waiting for the islands.
    pub fn start_await_terrain(&mut self) -> bool {
        let Some(connection) = self.lend() else {
            return false;
        };
        let task = PendingTask::spawn(&self.runtime, tasks::await_terrain(connection));
        self.task = Some(NetTask::Terrain(task));
        true
    }

    /// Start sending the finished turn.
    pub fn start_send_turn(&mut self, log: TurnLog) -> bool {
        let Some(connection) = self.lend() else {
            tracing::warn!("no connection to send the turn on");
            return false;
        };
        let task = PendingTask::spawn(&self.runtime, tasks::send_turn(connection, log));
        self.task = Some(NetTask::SendTurn(task));
        true
    }

    /// Start waiting for the opponent's turn.
    pub fn start_await_turn(&mut self) -> bool {
        let Some(connection) = self.lend() else {
            return false;
        };
        let task = PendingTask::spawn(&self.runtime, tasks::await_turn(connection));
        self.task = Some(NetTask::AwaitTurn(task));
        true
    }

    /// Collect the result of the running task if it has finished.
    pub fn poll(&mut self) -> Option<NetOutcome> {
        let outcome = match self.task.as_mut()? {
            NetTask::Connect(task) => match task.poll() {
                TaskPoll::Pending => return None,
                TaskPoll::Ready(Ok((connection, id))) => {
                    tracing::info!(client_id = id.get(), peer = %connection.peer(), "seat assigned");
                    self.connection = Some(connection);
                    self.player_id = Some(id);
                    Some(NetOutcome::Connected(id))
                }
                TaskPoll::Ready(Err(err)) => Some(NetOutcome::ConnectFailed(err)),
                TaskPoll::Lost => Some(NetOutcome::ConnectFailed(NetError::Closed)),
            },
            NetTask::Terrain(task) => settle(&mut self.connection, task.poll(), NetOutcome::Terrain),
            NetTask::SendTurn(task) => {
                settle(&mut self.connection, task.poll(), |()| NetOutcome::TurnSent)
            }
            NetTask::AwaitTurn(task) => {
                settle(&mut self.connection, task.poll(), NetOutcome::TurnReceived)
            }
        };

        if outcome.is_some() {
            self.task = None;
        }
        outcome
    }

    fn lend(&mut self) -> Option<Connection> {
        if self.is_busy() {
            tracing::warn!("network task already running");
            return None;
        }
        self.connection.take()
    }
}

/// Put a returned connection back and map the task output.
///
/// A failed task drops its connection.
fn settle<T>(
    slot: &mut Option<Connection>,
    poll: TaskPoll<Returned<T>>,
    done: impl FnOnce(T) -> NetOutcome,
) -> Option<NetOutcome> {
    match poll {
        TaskPoll::Pending => None,
        TaskPoll::Ready((connection, Ok(value))) => {
            *slot = Some(connection);
            Some(done(value))
        }
        TaskPoll::Ready((_, Err(err))) => Some(NetOutcome::Disconnected(err)),
        TaskPoll::Lost => Some(NetOutcome::Disconnected(NetError::Closed)),
    }
}
