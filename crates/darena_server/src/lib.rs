//! # Duel Arena Relay Server
//!
//! Headless relay server for two-player duels.
//!
//! Pairs two clients, generates and distributes the islands, and forwards
//! each player's turn log to the opponent. It never simulates the match:
//! each client decides the outcome from its own replay.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod lobby;
pub mod relay;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tokio::net::TcpListener;

pub use config::{ConfigError, ServerConfig};
pub use relay::{MatchSummary, RelayEvent, RelayState};

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Listener failure.
    #[error("Listener error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Terrain RNG for a server run: seeded from config, or from entropy.
#[must_use]
pub fn terrain_rng(config: &ServerConfig) -> ChaCha8Rng {
    let seed = config.seed.unwrap_or_else(rand::random::<u64>);
    tracing::info!(seed, "terrain seed");
    ChaCha8Rng::seed_from_u64(seed)
}

/// Bind the configured address.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, ServerError> {
    config.validate()?;
    let listener = TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    Ok(listener)
}

/// Serve matches one after another until the listener fails.
///
/// `max_matches` stops the loop after that many matches when set.
pub async fn serve(
    listener: TcpListener,
    config: ServerConfig,
    max_matches: Option<u32>,
) -> Result<(), ServerError> {
    let mut rng = terrain_rng(&config);
    let mut played = 0;

    while max_matches.map_or(true, |max| played < max) {
        let summary = relay::run_match(&listener, &config, &mut rng).await?;
        played += 1;
        tracing::info!(
            matches = played,
            turns = summary.turns_relayed,
            dropped = %summary.dropped,
            "match ended"
        );
    }

    Ok(())
}
