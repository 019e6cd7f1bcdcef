//! Duel Arena - Relay Server

use std::path::PathBuf;

use clap::Parser;
use darena_server::ServerConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "darena-server")]
#[command(about = "Relay server for Duel Arena matches")]
struct Cli {
    /// RON config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Interface to bind
    #[arg(long)]
    host: Option<String>,
    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,
    /// Terrain seed, for reproducible matches
    #[arg(long)]
    seed: Option<u64>,
    /// Stop after this many matches
    #[arg(long)]
    matches: Option<u32>,
}

fn load_config(cli: &Cli) -> Result<ServerConfig, darena_server::ConfigError> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(host) = &cli.host {
        config.host.clone_from(host);
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    Ok(config)
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting Duel Arena relay server");

    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    let result = match darena_server::bind(&config).await {
        Ok(listener) => darena_server::serve(listener, config, cli.matches).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        tracing::error!("Server stopped: {e}");
        std::process::exit(1);
    }
}
