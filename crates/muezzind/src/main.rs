//! Muezzin Daemon - runs the prayer loop, silent activation and like digest

use anyhow::Result;
use clap::Parser;
use muezzin_core::{constants, EngineConfig};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod daemon;

use daemon::Daemon;

#[derive(Parser, Debug)]
#[command(name = "muezzind")]
#[command(author, version, about = "Muezzin notification daemon", long_about = None)]
struct Args {
    /// Config file (.toml, .yaml, .yml or .json); defaults to ~/.muezzin/muezzin.toml
    #[arg(short, long, env = "MUEZZIN_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Secrets may come from a local .env
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "muezzind=info,muezzin_engine=info,muezzin_db=info,muezzin_push=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Muezzin daemon starting...");

    // Ensure home directory exists
    let home = constants::muezzin_home();
    if !home.exists() {
        std::fs::create_dir_all(&home)?;
        info!("Created Muezzin home directory: {}", home.display());
    }

    let config = match &args.config {
        Some(path) => EngineConfig::load_from(path)?,
        None => EngineConfig::load()?,
    };

    let daemon = Daemon::new(config).await?;

    // Set up signal handlers
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

    tokio::select! {
        result = daemon.run() => {
            if let Err(e) = result {
                error!("Daemon error: {}", e);
                return Err(e);
            }
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down...");
        }
    }

    daemon.shutdown().await;
    info!("Daemon shutdown complete");
    Ok(())
}
