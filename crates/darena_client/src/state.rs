//! Client state machine.
//!
//! [`transition`] is pure: the [`crate::game::Game`] loop decides which
//! event happened and applies the side effects itself.

use std::fmt;

/// Phase of the match as seen by one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClientState {
    /// Waiting for a name and server address.
    #[default]
    Initial,
    /// Opening the connection and waiting for the seat.
    Connecting,
    /// Seated; waiting for the opponent and the islands.
    WaitingForTerrain,
    /// Islands received; the first turn starts next tick.
    Connected,
    /// The local player moves, aims and charges.
    PlayTurn,
    /// The local shot is in flight.
    ShootProjectile,
    /// Waiting for the opponent's turn to arrive.
    WaitTurn,
    /// Replaying the opponent's turn, shot included.
    SimulateOpponentTurn,
    /// The local player hit the opponent or the opponent fell off.
    Won,
    /// The opponent hit the local player or the local player fell off.
    Lost,
}

impl ClientState {
    /// Text the UI shows for this state.
    #[must_use]
    pub const fn status_text(self) -> &'static str {
        match self {
            Self::Initial => "ENTER NAME AND SERVER",
            Self::Connecting => "CONNECTING",
            Self::WaitingForTerrain => "WAITING FOR GAME TO START",
            Self::Connected => "CONNECTED",
            Self::PlayTurn => "YOUR TURN",
            Self::ShootProjectile => "FIRING",
            Self::WaitTurn => "OPPONENT'S TURN",
            Self::SimulateOpponentTurn => "OPPONENT IS PLAYING",
            Self::Won => "YOU WON",
            Self::Lost => "YOU LOST",
        }
    }

    /// Whether both avatars are on the field and being simulated.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(
            self,
            Self::PlayTurn | Self::ShootProjectile | Self::WaitTurn | Self::SimulateOpponentTurn
        )
    }

    /// Whether the match is over.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status_text())
    }
}

/// Something the client loop observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    /// The UI supplied a name and address.
    ConnectRequested,
    /// The server assigned a seat.
    ConnectAcknowledged,
    /// Both islands arrived.
    TerrainReceived,
    /// First tick after the islands arrived.
    MatchStarted {
        /// Whether the local seat takes the first turn.
        moves_first: bool,
    },
    /// The local shot was released.
    ShotFired,
    /// The local avatar dropped below the playfield.
    PlayerFellOff,
    /// The local shot hit the opponent.
    EnemyHit,
    /// The local shot hit terrain or left the playfield.
    ShotMissed,
    /// The opponent's turn arrived.
    OpponentTurnReceived,
    /// The opponent's avatar dropped below the playfield during replay.
    EnemyFellOff,
    /// The opponent's shot hit the local player.
    PlayerHit,
    /// The opponent's shot hit terrain or left the playfield.
    OpponentTurnEnded,
}

/// Next state after `event`.
///
/// Pairs with no edge leave the state unchanged and are logged.
#[must_use]
pub fn transition(state: ClientState, event: ClientEvent) -> ClientState {
    use ClientEvent as E;
    use ClientState as S;

    match (state, event) {
        (S::Initial, E::ConnectRequested) => S::Connecting,
        (S::Connecting, E::ConnectAcknowledged) => S::WaitingForTerrain,
        (S::WaitingForTerrain, E::TerrainReceived) => S::Connected,
        (S::Connected, E::MatchStarted { moves_first: true }) => S::PlayTurn,
        (S::Connected, E::MatchStarted { moves_first: false }) => S::WaitTurn,
        (S::PlayTurn, E::ShotFired) => S::ShootProjectile,
        (S::ShootProjectile, E::EnemyHit) => S::Won,
        (S::ShootProjectile, E::ShotMissed) => S::WaitTurn,
        (S::WaitTurn, E::OpponentTurnReceived) => S::SimulateOpponentTurn,
        (S::SimulateOpponentTurn, E::PlayerHit) => S::Lost,
        (S::SimulateOpponentTurn, E::OpponentTurnEnded) => S::PlayTurn,
        // Either avatar can drop off while the match is live
        (state, E::PlayerFellOff) if state.is_live() => S::Lost,
        (state, E::EnemyFellOff) if state.is_live() => S::Won,
        (state, event) => {
            tracing::warn!(%state, ?event, "no transition for event");
            state
        }
    }
}
