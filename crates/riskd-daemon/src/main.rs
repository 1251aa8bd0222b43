//! riskd - automated risk enforcement for leveraged trading accounts.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Automated risk-enforcement daemon
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via RISKD_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    riskd_telemetry::init_logging()?;

    info!("Starting riskd v{}", env!("CARGO_PKG_VERSION"));

    let config_path = args
        .config
        .or_else(|| std::env::var("RISKD_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());
    info!(config_path = %config_path, "Loading configuration");

    let config = riskd_daemon::AppConfig::from_path_or_default(&config_path)?;
    let app = riskd_daemon::Application::new(config)?;
    app.run().await?;

    Ok(())
}
