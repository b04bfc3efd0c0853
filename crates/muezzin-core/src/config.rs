//! Engine configuration
//!
//! Supports multiple configuration file formats:
//! - TOML (.toml)
//! - YAML (.yaml, .yml)
//! - JSON (.json)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::error::{Error, Result};
use crate::stage::StageWindows;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(ConfigFormat::Toml),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "json" => Some(ConfigFormat::Json),
            _ => None,
        }
    }

    /// Detect format from file path
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Parse any deserializable document in this format
    pub fn parse<T: serde::de::DeserializeOwned>(&self, content: &str) -> Result<T> {
        Ok(match self {
            ConfigFormat::Toml => toml::from_str(content)?,
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        })
    }
}

/// Where the record store lives
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file (default: ~/.muezzin/muezzin.db)
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(db_path)
    }
}

/// Push gateway settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Endpoint receiving POSTed messages
    pub url: String,
    /// Bearer token sent with every request, if the gateway requires one
    pub access_token: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Sound used for every visible notification without the adhan
    pub default_sound: String,
    /// Sound asset requested for adhan notifications
    pub adhan_sound: String,
    /// Android channel configured with the adhan sound
    pub adhan_channel_id: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_GATEWAY_URL.to_string(),
            access_token: None,
            timeout_secs: DEFAULT_GATEWAY_TIMEOUT_SECS,
            default_sound: DEFAULT_SOUND.to_string(),
            adhan_sound: DEFAULT_ADHAN_SOUND.to_string(),
            adhan_channel_id: DEFAULT_ADHAN_CHANNEL.to_string(),
        }
    }
}

/// Job cadences used by the daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub prayer_interval_secs: u64,
    pub blocker_interval_secs: u64,
    pub like_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            prayer_interval_secs: DEFAULT_PRAYER_INTERVAL_SECS,
            blocker_interval_secs: DEFAULT_PRAYER_INTERVAL_SECS,
            like_interval_secs: DEFAULT_LIKE_INTERVAL_SECS,
        }
    }
}

/// Silent blocker activation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockerConfig {
    /// Activate when the prayer time is between 0 and this many seconds old
    pub window_secs: u64,
    /// Destinations per outbound request
    pub batch_size: usize,
}

impl Default for BlockerConfig {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_BLOCKER_WINDOW_SECS,
            batch_size: DEFAULT_GATEWAY_BATCH_SIZE,
        }
    }
}

/// Like digest settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LikesConfig {
    /// Delay between a like and its earliest delivery
    pub deferral_minutes: i64,
    /// Digest window width, anchored on the first event
    pub window_minutes: i64,
    /// Window size at which names collapse to "+N others"
    pub batch_threshold: usize,
}

impl Default for LikesConfig {
    fn default() -> Self {
        Self {
            deferral_minutes: DEFAULT_LIKE_DEFERRAL_MINUTES,
            window_minutes: DEFAULT_LIKE_WINDOW_MINUTES,
            batch_threshold: DEFAULT_DIGEST_BATCH_THRESHOLD,
        }
    }
}

impl LikesConfig {
    pub fn deferral(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.deferral_minutes)
    }

    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.window_minutes)
    }
}

/// Engine configuration (muezzin.toml)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub database: DatabaseConfig,
    pub gateway: GatewayConfig,
    pub windows: StageWindows,
    pub schedule: ScheduleConfig,
    pub blocker: BlockerConfig,
    pub likes: LikesConfig,
}

impl EngineConfig {
    /// Load config from the default path, falling back to defaults
    pub fn load() -> Result<Self> {
        let path = config_path();
        let mut config = if path.exists() {
            Self::read(&path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from an explicit path, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        let mut config = Self::read(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            Error::ConfigError(format!(
                "Unsupported config file extension: {}. Expected .toml, .yaml, .yml, or .json",
                path.display()
            ))
        })?;
        let content = std::fs::read_to_string(path)?;
        format.parse(&content)
    }

    /// Parse config content with specified format
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let config: EngineConfig = format.parse(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Take secrets and paths from the environment when set
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var(ENV_PUSH_TOKEN) {
            if !token.is_empty() {
                self.gateway.access_token = Some(token);
            }
        }
        if let Ok(path) = std::env::var(ENV_DB_PATH) {
            if !path.is_empty() {
                self.database.path = Some(PathBuf::from(path));
            }
        }
    }

    /// Reject settings the schedulers cannot work with
    pub fn validate(&self) -> Result<()> {
        self.windows.validate()?;

        if self.gateway.url.trim().is_empty() {
            return Err(Error::config("gateway.url must not be empty"));
        }
        if self.gateway.timeout_secs == 0 {
            return Err(Error::config("gateway.timeout_secs must be positive"));
        }
        if self.schedule.prayer_interval_secs == 0
            || self.schedule.blocker_interval_secs == 0
            || self.schedule.like_interval_secs == 0
        {
            return Err(Error::config("schedule intervals must be positive"));
        }
        if self.blocker.batch_size == 0 {
            return Err(Error::config("blocker.batch_size must be positive"));
        }
        if self.likes.deferral_minutes < 0 || self.likes.window_minutes < 0 {
            return Err(Error::config("likes durations must not be negative"));
        }
        if self.likes.batch_threshold < 2 {
            return Err(Error::config("likes.batch_threshold must be at least 2"));
        }
        Ok(())
    }

    /// Save config to a specific path as TOML
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, &content)?;

        // Config may carry the gateway access token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_format_detection() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("yaml"), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_extension("yml"), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("txt"), None);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.gateway.timeout_secs, 5);
        assert_eq!(config.blocker.batch_size, 100);
        assert_eq!(config.likes.deferral_minutes, 30);
        assert_eq!(config.likes.window_minutes, 10);
        assert_eq!(config.likes.batch_threshold, 5);
    }

    #[test]
    fn test_parse_partial_toml() {
        let content = r#"
[gateway]
url = "https://push.example.com/send"
adhan_sound = "makkah.wav"

[windows.at_time]
start = 0.0
end = 0.5

[likes]
window_minutes = 15
"#;
        let config = EngineConfig::parse(content, ConfigFormat::Toml).unwrap();
        assert_eq!(config.gateway.url, "https://push.example.com/send");
        assert_eq!(config.gateway.adhan_sound, "makkah.wav");
        assert_eq!(config.gateway.default_sound, "default");
        assert_eq!(config.windows.at_time.end, 0.5);
        assert_eq!(config.windows.pre_reminder.start, -5.5);
        assert_eq!(config.likes.window_minutes, 15);
        assert_eq!(config.likes.deferral_minutes, 30);
    }

    #[test]
    fn test_parse_yaml() {
        let content = r#"
schedule:
  prayer_interval_secs: 30
blocker:
  window_secs: 90
"#;
        let config = EngineConfig::parse(content, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.schedule.prayer_interval_secs, 30);
        assert_eq!(config.schedule.like_interval_secs, 300);
        assert_eq!(config.blocker.window_secs, 90);
    }

    #[test]
    fn test_invalid_windows_rejected() {
        let content = r#"
[windows.delay_reminder]
start = -5.0
end = -4.0
"#;
        let result = EngineConfig::parse(content, ConfigFormat::Toml);
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let content = r#"{"blocker": {"batch_size": 0}}"#;
        let result = EngineConfig::parse(content, ConfigFormat::Json);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_not_found() {
        let result = EngineConfig::load_from(Path::new("/nonexistent/muezzin.toml"));
        assert!(matches!(result, Err(Error::ConfigNotFound(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        file.write_all(br#"{"gateway": {"timeout_secs": 3}}"#).unwrap();

        let config = EngineConfig::load_from(file.path()).unwrap();
        assert_eq!(config.gateway.timeout_secs, 3);
    }

    #[test]
    fn test_save_and_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("muezzin.toml");

        let mut config = EngineConfig::default();
        config.gateway.adhan_channel_id = "adhan-v2".to_string();
        config.likes.batch_threshold = 4;
        config.save_to(&path).unwrap();

        let loaded = EngineConfig::load_from(&path).unwrap();
        assert_eq!(loaded.gateway.adhan_channel_id, "adhan-v2");
        assert_eq!(loaded.likes.batch_threshold, 4);
        assert_eq!(loaded.windows, config.windows);
    }
}
