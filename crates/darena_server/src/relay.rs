//! Relay state machine: terrain distribution and turn forwarding.
//!
//! The server never simulates. It generates the two islands once per match,
//! sends the same heightmaps to both seats, then forwards each finished turn
//! from the active seat to the waiting one.

use darena_core::layout::{Side, POINTS_PER_ISLAND};
use darena_core::match_state::PlayerId;
use darena_core::protocol::{ClientMessage, ServerMessage, ServerTerrainResponse};
use darena_core::terrain::Terrain;
use darena_net::NetError;
use rand::Rng;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::lobby::{accept_seat, Seat};
use crate::ServerError;

/// Phase of one match on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Not listening yet.
    Startup,
    /// Waiting for a client to take seat `n`.
    AwaitPair(u8),
    /// Both seats filled; terrain not sent yet.
    DistributeTerrain,
    /// Forwarding turns; `active` is the seat whose turn is awaited.
    RelayLoop {
        /// Seat expected to send the next turn.
        active: PlayerId,
    },
}

/// Something that happened while running a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEvent {
    /// The listener is ready.
    Listening,
    /// A client completed the handshake.
    SeatFilled,
    /// Both clients received the terrain.
    TerrainSent,
    /// A turn was forwarded to the waiting seat.
    TurnRelayed,
}

impl RelayState {
    /// Follow `event` from this state.
    ///
    /// Events that do not apply leave the state unchanged.
    #[must_use]
    pub fn next(self, event: RelayEvent) -> Self {
        let next = match (self, event) {
            (Self::Startup, RelayEvent::Listening) => Self::AwaitPair(0),
            (Self::AwaitPair(0), RelayEvent::SeatFilled) => Self::AwaitPair(1),
            (Self::AwaitPair(_), RelayEvent::SeatFilled) => Self::DistributeTerrain,
            (Self::DistributeTerrain, RelayEvent::TerrainSent) => Self::RelayLoop {
                active: PlayerId::FIRST,
            },
            (Self::RelayLoop { active }, RelayEvent::TurnRelayed) => Self::RelayLoop {
                active: active.other(),
            },
            (state, event) => {
                tracing::warn!(?state, ?event, "event does not apply to relay state");
                state
            }
        };
        tracing::debug!(from = ?self, to = ?next, "relay state");
        next
    }
}

/// How a match ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSummary {
    /// Turns forwarded before the match ended.
    pub turns_relayed: u32,
    /// Seat whose connection failed.
    pub dropped: PlayerId,
}

/// Generate both islands, left first.
pub fn generate_terrains<R: Rng + ?Sized>(rng: &mut R) -> [Terrain; 2] {
    let left = Terrain::generate(Side::Left.island_origin(), POINTS_PER_ISLAND, rng);
    let right = Terrain::generate(Side::Right.island_origin(), POINTS_PER_ISLAND, rng);
    [left, right]
}

/// Send the same heightmaps to both seats.
///
/// On failure returns the seat that could not be reached.
pub async fn distribute_terrain(
    seats: &mut [Seat; 2],
    terrains: &[Terrain; 2],
) -> Result<(), (PlayerId, NetError)> {
    let heightmaps = [terrains[0].points().to_vec(), terrains[1].points().to_vec()];

    for seat in seats.iter_mut() {
        let response = ServerMessage::Terrain(ServerTerrainResponse {
            client_id: seat.id.get(),
            heightmaps: heightmaps.clone(),
        });
        seat.connection
            .send(&response)
            .await
            .map_err(|err| (seat.id, err))?;
    }

    tracing::info!("terrain distributed");
    Ok(())
}

/// Forward turns until a connection fails.
///
/// Turns are trimmed before forwarding. A turn whose owner is not the
/// active seat and frames that do not decode are dropped with a warning.
pub async fn relay_turns(seats: &mut [Seat; 2], mut state: RelayState) -> MatchSummary {
    let mut turns_relayed = 0;

    loop {
        let RelayState::RelayLoop { active } = state else {
            tracing::error!(?state, "relay loop entered outside the relay state");
            return MatchSummary {
                turns_relayed,
                dropped: PlayerId::FIRST,
            };
        };

        let (first, second) = seats.split_at_mut(1);
        let (sender, receiver) = if active.moves_first() {
            (&mut first[0], &mut second[0])
        } else {
            (&mut second[0], &mut first[0])
        };

        let log = match sender.connection.recv::<ClientMessage>().await {
            Ok(ClientMessage::Turn(log)) => log,
            Ok(ClientMessage::ConnectionRequest { .. }) => {
                tracing::warn!(seat = %active, "ignoring repeated connection request");
                continue;
            }
            Err(err) if err.is_transient() => {
                tracing::warn!(seat = %active, error = %err, "skipping undecodable frame");
                continue;
            }
            Err(err) => {
                tracing::info!(seat = %active, error = %err, "client disconnected, ending match");
                return MatchSummary {
                    turns_relayed,
                    dropped: active,
                };
            }
        };

        if log.owner_id != active.get() {
            tracing::warn!(
                seat = %active,
                owner_id = log.owner_id,
                "dropping turn from the wrong owner"
            );
            continue;
        }

        let log = log.trimmed();
        tracing::debug!(
            from = %active,
            movements = log.movements.len(),
            aim_deltas = log.aim_deltas.len(),
            "relaying turn"
        );
        if let Err(err) = receiver.connection.send(&ServerMessage::Turn(log)).await {
            tracing::info!(seat = %receiver.id, error = %err, "client disconnected, ending match");
            return MatchSummary {
                turns_relayed,
                dropped: receiver.id,
            };
        }

        turns_relayed += 1;
        state = state.next(RelayEvent::TurnRelayed);
    }
}

/// Run one full match on `listener`: pair, distribute, relay.
///
/// Returns when a client drops. Errors are listener failures only.
pub async fn run_match<R: Rng + ?Sized>(
    listener: &TcpListener,
    config: &ServerConfig,
    rng: &mut R,
) -> Result<MatchSummary, ServerError> {
    let mut state = RelayState::Startup.next(RelayEvent::Listening);

    let first = accept_seat(listener, PlayerId::FIRST, config).await?;
    state = state.next(RelayEvent::SeatFilled);
    let second = accept_seat(listener, PlayerId::SECOND, config).await?;
    state = state.next(RelayEvent::SeatFilled);
    tracing::info!(first = %first.name, second = %second.name, "both seats filled");

    let mut seats = [first, second];
    let terrains = generate_terrains(rng);
    if let Err((dropped, err)) = distribute_terrain(&mut seats, &terrains).await {
        tracing::info!(seat = %dropped, error = %err, "client lost before the match started");
        return Ok(MatchSummary {
            turns_relayed: 0,
            dropped,
        });
    }
    state = state.next(RelayEvent::TerrainSent);

    Ok(relay_turns(&mut seats, state).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_relay_state_sequence() {
        let mut state = RelayState::Startup;
        state = state.next(RelayEvent::Listening);
        assert_eq!(state, RelayState::AwaitPair(0));
        state = state.next(RelayEvent::SeatFilled);
        assert_eq!(state, RelayState::AwaitPair(1));
        state = state.next(RelayEvent::SeatFilled);
        assert_eq!(state, RelayState::DistributeTerrain);
        state = state.next(RelayEvent::TerrainSent);
        assert_eq!(
            state,
            RelayState::RelayLoop {
                active: PlayerId::FIRST
            }
        );
        state = state.next(RelayEvent::TurnRelayed);
        assert_eq!(
            state,
            RelayState::RelayLoop {
                active: PlayerId::SECOND
            }
        );
        state = state.next(RelayEvent::TurnRelayed);
        assert_eq!(
            state,
            RelayState::RelayLoop {
                active: PlayerId::FIRST
            }
        );
    }

    #[test]
    fn test_relay_state_ignores_stray_events() {
        assert_eq!(
            RelayState::Startup.next(RelayEvent::TurnRelayed),
            RelayState::Startup
        );
        assert_eq!(
            RelayState::DistributeTerrain.next(RelayEvent::SeatFilled),
            RelayState::DistributeTerrain
        );
    }

    #[test]
    fn test_generated_islands_sit_on_their_sides() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let [left, right] = generate_terrains(&mut rng);
        assert_eq!(left.origin(), Side::Left.island_origin());
        assert_eq!(right.origin(), Side::Right.island_origin());
        let heights = |t: &Terrain| -> Vec<f32> { t.points().iter().map(|p| p.position.y).collect() };
        assert_ne!(heights(&left), heights(&right));
    }
}
