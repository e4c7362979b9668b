use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use talon_zenoh_runtime::config::RuntimeConfig;

/// Drive a Talon SRX from zenoh controller frames
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON runtime configuration (defaults are used for missing fields)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CAN id of the Talon, overrides the config file
    #[arg(short, long)]
    port: Option<u8>,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match RuntimeConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Config error ({}): {}", path.display(), e);
                std::process::exit(2);
            }
        },
        None => RuntimeConfig::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }

    if let Err(e) = talon_zenoh_runtime::runtime::run(config).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
