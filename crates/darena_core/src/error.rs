//! Error types for the duel model.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all duel model errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Terrain point index outside the heightmap.
    #[error("Invalid terrain index {index} (terrain has {len} points)")]
    InvalidTerrainIndex {
        /// Requested index.
        index: usize,
        /// Number of points in the terrain.
        len: usize,
    },

    /// A terrain without any points was supplied.
    #[error("Terrain has no points")]
    EmptyTerrain,

    /// Player identifier outside the two seats of a match.
    #[error("Invalid player ID: {0}")]
    InvalidPlayerId(u8),

    /// A turn log is missing data needed for replay.
    #[error("Turn data missing: {0}")]
    MissingTurnData(String),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Replayed opponent state diverged from what the opponent reported.
    #[error("Desync detected at tick {tick}: local hash {local_hash}, remote hash {remote_hash}")]
    DesyncDetected {
        /// Tick where desync occurred.
        tick: u64,
        /// Local state hash.
        local_hash: u64,
        /// Remote state hash.
        remote_hash: u64,
    },
}
