//! envwatch - Entry Point

use anyhow::Result;
use clap::Parser;
use envwatch_server::config::DEFAULT_CONFIG_PATH;
use tracing::info;

/// Environmental sensor monitoring service
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via ENVWATCH_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before anything reads the environment
    dotenvy::dotenv().ok();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    envwatch_telemetry::init_logging()?;

    info!("Starting envwatch v{}", env!("CARGO_PKG_VERSION"));

    // Determine config path: CLI arg > ENVWATCH_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("ENVWATCH_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    info!(config_path = %config_path, "Loading configuration");

    let config = envwatch_server::AppConfig::load(&config_path)?;
    info!(
        port = config.server.port,
        store = %config.store.uri,
        poller_enabled = config.poller.is_enabled(),
        "Configuration loaded"
    );

    let app = envwatch_server::Application::new(config)?;
    app.run().await?;

    Ok(())
}
