//! Error types for Muezzin

use std::path::PathBuf;

/// Muezzin error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Prayer time missing")]
    MissingPrayerTime,

    #[error("Invalid prayer time: {0}")]
    InvalidPrayerTime(String),

    #[error("Unknown prayer: {0}")]
    UnknownPrayer(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Database error: {0}")]
    DbError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Result type alias for Muezzin
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::ConfigError(msg.into())
    }

    pub fn db<S: Into<String>>(msg: S) -> Self {
        Error::DbError(msg.into())
    }

    pub fn invalid_time<S: Into<String>>(msg: S) -> Self {
        Error::InvalidPrayerTime(msg.into())
    }

    /// Whether this error means "skip the prayer this cycle" rather than a
    /// processing failure
    pub fn is_skippable_time(&self) -> bool {
        matches!(self, Error::MissingPrayerTime | Error::InvalidPrayerTime(_))
    }
}
