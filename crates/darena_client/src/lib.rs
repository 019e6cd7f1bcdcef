//! # Duel Arena Client
//!
//! Headless game client for Duel Arena.
//!
//! Drives the client state machine over the deterministic core: connects
//! to the relay, records the local player's turn, and replays the
//! opponent's turn tick by tick. Rendering and key mapping are left to the
//! embedding UI, which talks to [`Game`] through
//! [`Game::request_connect`], [`Game::handle_input`] and
//! [`Game::frame_view`].
//!
//! ## Crate Structure
//!
//! - [`state`] - Client states, events and transitions
//! - [`game`] - Fixed-timestep update loop
//! - [`session`] - Connection ownership and network task polling
//! - [`tasks`] - Background network tasks
//! - [`replay`] - Opponent replay feed
//! - [`input`] - Input intents
//! - [`autopilot`] - Scripted player for the headless binary
//! - [`config`] - RON configuration

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod autopilot;
pub mod config;
pub mod game;
pub mod input;
pub mod replay;
pub mod session;
pub mod state;
pub mod tasks;

pub use autopilot::Autopilot;
pub use config::{AutopilotConfig, ClientConfig, ConfigError};
pub use game::{FrameView, Game};
pub use input::{InputEvent, InputIntent};
pub use state::{ClientEvent, ClientState};
