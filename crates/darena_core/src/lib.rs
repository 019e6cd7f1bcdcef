//! # Duel Arena Core
//!
//! Deterministic model for the Duel Arena artillery duel.
//!
//! This crate contains **only** game logic that both peers must agree on:
//! - No rendering
//! - No IO
//! - No system randomness (generators take a seeded RNG)
//!
//! This separation enables:
//! - A relay-only server that shares the wire codec
//! - Replaying an opponent's turn from its compact action log
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`layout`] - Playfield and island constants
//! - [`math`] - 2D vector helpers
//! - [`terrain`] - Destructible heightmap islands
//! - [`turn_log`] - Per-turn action log and trimming
//! - [`avatar`] - Ground-following avatar physics
//! - [`projectile`] - Ballistics and impact resolution
//! - [`match_state`] - Owned container for one match
//! - [`protocol`] - Length-prefixed message codec

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod avatar;
pub mod error;
pub mod layout;
pub mod match_state;
pub mod math;
pub mod projectile;
pub mod protocol;
pub mod terrain;
pub mod turn_log;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::avatar::{Avatar, ShotState};
    pub use crate::error::{GameError, Result};
    pub use crate::layout::{Side, FIXED_TIMESTEP};
    pub use crate::match_state::{MatchState, PlayerId, Role};
    pub use crate::math::Vec2;
    pub use crate::projectile::{ImpactOutcome, Projectile};
    pub use crate::protocol::{
        ClientMessage, ProtocolError, ServerMessage, ServerTerrainResponse, TurnPayload,
    };
    pub use crate::terrain::{Terrain, TerrainPoint};
    pub use crate::turn_log::TurnLog;
}
