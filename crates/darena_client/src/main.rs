//! Duel Arena - Headless Client
//!
//! Connects to a relay server and plays scripted turns until the match
//! ends.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use darena_client::{Autopilot, ClientConfig, Game};
use darena_core::layout::FIXED_TIMESTEP;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Frames to wait for a last turn to reach the server.
const FLUSH_FRAMES: u32 = 300;

#[derive(Parser)]
#[command(name = "darena-client")]
#[command(about = "Headless Duel Arena client with a scripted player")]
struct Cli {
    /// RON config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Name sent to the server
    #[arg(short, long)]
    name: Option<String>,
    /// Server host
    #[arg(long)]
    host: Option<String>,
    /// Server port
    #[arg(short, long)]
    port: Option<u16>,
    /// Give up after this many frames
    #[arg(long)]
    max_frames: Option<u64>,
}

fn load_config(cli: &Cli) -> Result<ClientConfig, darena_client::ConfigError> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    if let Some(name) = &cli.name {
        config.player_name.clone_from(name);
    }
    if let Some(host) = &cli.host {
        config.server_host.clone_from(host);
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(max_frames) = cli.max_frames {
        config.max_frames = max_frames;
    }
    config.validate()?;
    Ok(config)
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start the network runtime: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(player = %config.player_name, server = %config.server_addr(), "Starting Duel Arena client");

    let mut game = Game::new(runtime.handle().clone());
    let mut pilot = Autopilot::new(config.autopilot.clone());
    game.request_connect(&config.player_name, &config.server_addr());

    let frame = Duration::from_secs_f32(FIXED_TIMESTEP);
    let mut last = Instant::now();
    let mut frames = 0u64;

    while !game.state().is_finished() {
        if config.max_frames > 0 && frames >= config.max_frames {
            tracing::warn!(frames, state = %game.state(), "frame limit reached");
            std::process::exit(1);
        }

        pilot.drive(&mut game);
        let now = Instant::now();
        game.update(now.duration_since(last).as_secs_f32());
        last = now;
        frames += 1;

        std::thread::sleep(frame);
    }

    // A fall is reported by sending the turn after the match ended locally
    let mut flush_frames = 0;
    while game.is_sending() && flush_frames < FLUSH_FRAMES {
        game.update(FIXED_TIMESTEP);
        flush_frames += 1;
        std::thread::sleep(frame);
    }

    tracing::info!(result = %game.state(), frames, "match over");
}
