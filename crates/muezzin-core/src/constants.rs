//! Constants and default values for Muezzin

use std::path::PathBuf;

/// Default Muezzin home directory name
pub const MUEZZIN_DIR: &str = ".muezzin";

/// Default database file name
pub const DB_FILE: &str = "muezzin.db";

/// Default config file name
pub const CONFIG_FILE: &str = "muezzin.toml";

/// Environment variable overriding the gateway access token
pub const ENV_PUSH_TOKEN: &str = "MUEZZIN_PUSH_TOKEN";

/// Environment variable overriding the database path
pub const ENV_DB_PATH: &str = "MUEZZIN_DB";

/// Default push gateway endpoint
pub const DEFAULT_GATEWAY_URL: &str = "https://exp.host/--/api/v2/push/send";

/// Default gateway request timeout in seconds
pub const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 5;

/// Sound asset requested when the user chose the adhan
pub const DEFAULT_ADHAN_SOUND: &str = "adhan.wav";

/// Android channel carrying the adhan sound
pub const DEFAULT_ADHAN_CHANNEL: &str = "adhan";

/// Default alert sound
pub const DEFAULT_SOUND: &str = "default";

/// Prayer-loop and blocker cadence in seconds
pub const DEFAULT_PRAYER_INTERVAL_SECS: u64 = 60;

/// Like aggregator cadence in seconds
pub const DEFAULT_LIKE_INTERVAL_SECS: u64 = 300;

/// Blocker activation fires when the prayer time is at most this many seconds old
pub const DEFAULT_BLOCKER_WINDOW_SECS: u64 = 120;

/// Maximum destinations per outbound gateway request
pub const DEFAULT_GATEWAY_BATCH_SIZE: usize = 100;

/// Delay between a like and its earliest delivery
pub const DEFAULT_LIKE_DEFERRAL_MINUTES: i64 = 30;

/// Width of a digest window, anchored on its first event
pub const DEFAULT_LIKE_WINDOW_MINUTES: i64 = 10;

/// Digest size at which names collapse into "+N others"
pub const DEFAULT_DIGEST_BATCH_THRESHOLD: usize = 5;

/// Minutes in a day, used for rollover arithmetic
pub const MINUTES_PER_DAY: f64 = 1440.0;

/// A prayer more than this many minutes "ahead" belongs to the previous day
pub const ROLLOVER_THRESHOLD_MINUTES: f64 = -720.0;

/// Get the Muezzin home directory
pub fn muezzin_home() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(MUEZZIN_DIR))
        .unwrap_or_else(|| PathBuf::from(MUEZZIN_DIR))
}

/// Get the database path
pub fn db_path() -> PathBuf {
    muezzin_home().join(DB_FILE)
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    muezzin_home().join(CONFIG_FILE)
}
