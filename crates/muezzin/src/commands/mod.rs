//! Command implementations

pub mod config;
pub mod import;
pub mod like;
pub mod run;
pub mod status;

use anyhow::{Context, Result};
use muezzin_core::EngineConfig;
use muezzin_engine::Engine;
use std::path::Path;

/// Load the explicit config file, or the default one if present
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EngineConfig::load().context("Failed to load config")?,
    };
    Ok(config)
}

/// Open the engine against the configured database and gateway
pub async fn open_engine(path: Option<&Path>) -> Result<Engine> {
    let config = load_config(path)?;
    tracing::debug!(
        db = %config.database.resolved_path().display(),
        gateway = %config.gateway.url,
        "opening engine"
    );
    let engine = Engine::from_config(config).await?;
    Ok(engine)
}
