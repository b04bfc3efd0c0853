//! Configuration commands

use anyhow::{bail, Result};
use muezzin_core::{constants, EngineConfig};
use std::path::Path;

use crate::cli::ConfigCommand;
use crate::output::{is_json_mode, print_info, print_success};

pub fn execute(config_path: Option<&Path>, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => show(config_path),
        ConfigCommand::Init { force } => init(config_path, force),
    }
}

fn show(config_path: Option<&Path>) -> Result<()> {
    let mut config = super::load_config(config_path)?;
    redact(&mut config);

    if is_json_mode() {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}

/// Hide the gateway secret when printing
fn redact(config: &mut EngineConfig) {
    if let Some(token) = config.gateway.access_token.as_mut() {
        let visible: String = token.chars().take(4).collect();
        *token = format!("{}...", visible);
    }
}

fn init(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(constants::config_path);

    if path.extension().and_then(|e| e.to_str()) != Some("toml") {
        bail!("config init writes TOML; use a .toml path");
    }
    if path.exists() && !force {
        print_info("Use --force to overwrite it");
        bail!("Config file already exists: {}", path.display());
    }

    EngineConfig::default().save_to(&path)?;
    print_success(&format!("Config written to {}", path.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_redact_hides_token() {
        let mut config = EngineConfig::default();
        config.gateway.access_token = Some("supersecretvalue".to_string());
        redact(&mut config);
        assert_eq!(config.gateway.access_token.as_deref(), Some("supe..."));
    }

    #[test]
    fn test_init_writes_loadable_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("muezzin.toml");

        init(Some(&path), false).unwrap();
        let loaded = EngineConfig::load_from(&path).unwrap();
        assert_eq!(loaded.windows, EngineConfig::default().windows);

        assert!(init(Some(&path), false).is_err());
        assert!(init(Some(&path), true).is_ok());
    }

    #[test]
    fn test_init_rejects_non_toml() {
        let dir = tempdir().unwrap();
        assert!(init(Some(&dir.path().join("muezzin.yaml")), false).is_err());
    }
}
