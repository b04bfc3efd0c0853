//! Core types for Muezzin

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

fn default_true() -> bool {
    true
}

/// The six daily prayer events tracked by the app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum PrayerName {
    Fajr,
    Sunrise,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl PrayerName {
    pub const ALL: [PrayerName; 6] = [
        PrayerName::Fajr,
        PrayerName::Sunrise,
        PrayerName::Dhuhr,
        PrayerName::Asr,
        PrayerName::Maghrib,
        PrayerName::Isha,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "fajr",
            PrayerName::Sunrise => "sunrise",
            PrayerName::Dhuhr => "dhuhr",
            PrayerName::Asr => "asr",
            PrayerName::Maghrib => "maghrib",
            PrayerName::Isha => "isha",
        }
    }

    /// Capitalized name used in notification text
    pub fn display_name(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "Fajr",
            PrayerName::Sunrise => "Sunrise",
            PrayerName::Dhuhr => "Dhuhr",
            PrayerName::Asr => "Asr",
            PrayerName::Maghrib => "Maghrib",
            PrayerName::Isha => "Isha",
        }
    }

    /// One of the five obligatory prayers (everything except sunrise)
    pub fn is_obligatory(&self) -> bool {
        !matches!(self, PrayerName::Sunrise)
    }
}

impl fmt::Display for PrayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PrayerName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "fajr" => Ok(PrayerName::Fajr),
            "sunrise" | "shuruq" => Ok(PrayerName::Sunrise),
            "dhuhr" | "zuhr" => Ok(PrayerName::Dhuhr),
            "asr" => Ok(PrayerName::Asr),
            "maghrib" => Ok(PrayerName::Maghrib),
            "isha" => Ok(PrayerName::Isha),
            _ => Err(Error::UnknownPrayer(s.to_string())),
        }
    }
}

impl TryFrom<String> for PrayerName {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// A stored prayer time.
///
/// Exactly one representation is kept per entry. Build it with
/// [`PrayerTime::from_parts`] so an available instant always wins over a
/// wall-clock string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PrayerTime {
    /// Absolute instant; authoritative
    Instant(DateTime<Utc>),
    /// Local wall-clock text such as "4:54 PM"; carries no date
    WallClock(String),
    #[default]
    Unset,
}

impl PrayerTime {
    pub fn from_parts(instant: Option<DateTime<Utc>>, wall_clock: Option<String>) -> Self {
        match (instant, wall_clock) {
            (Some(at), _) => PrayerTime::Instant(at),
            (None, Some(text)) if !text.trim().is_empty() => PrayerTime::WallClock(text),
            _ => PrayerTime::Unset,
        }
    }

    /// Whether this value can only be resolved through the dateless string path
    pub fn is_degraded(&self) -> bool {
        matches!(self, PrayerTime::WallClock(_))
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, PrayerTime::Unset)
    }
}

impl Serialize for PrayerTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            PrayerTime::Instant(at) => serializer.serialize_str(&at.to_rfc3339()),
            PrayerTime::WallClock(text) => serializer.serialize_str(text),
            PrayerTime::Unset => serializer.serialize_none(),
        }
    }
}

/// Interpret a loosely-typed stored value as an instant.
///
/// Accepts RFC 3339 strings, `{seconds, nanoseconds}` timestamp objects (with or
/// without a leading underscore) and integer epoch milliseconds.
pub fn instant_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Object(map) => {
            let secs = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Utc.timestamp_opt(secs, nanos as u32).single()
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

/// Stored shape of a prayer entry before the time representation is settled
#[derive(Deserialize)]
struct RawPrayerEntry {
    name: PrayerName,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default)]
    time: Option<Value>,
    #[serde(default)]
    timestamp: Option<Value>,
}

impl From<RawPrayerEntry> for PrayerEntry {
    fn from(raw: RawPrayerEntry) -> Self {
        let instant = raw
            .timestamp
            .as_ref()
            .and_then(instant_from_value)
            .or_else(|| raw.time.as_ref().and_then(instant_from_value));
        let wall_clock = match raw.time {
            Some(Value::String(text)) => Some(text),
            _ => None,
        };

        PrayerEntry {
            name: raw.name,
            enabled: raw.enabled,
            time: PrayerTime::from_parts(instant, wall_clock),
        }
    }
}

/// One prayer in a user's daily schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPrayerEntry")]
pub struct PrayerEntry {
    pub name: PrayerName,
    pub enabled: bool,
    pub time: PrayerTime,
}

impl PrayerEntry {
    pub fn new(name: PrayerName, time: PrayerTime) -> Self {
        Self {
            name,
            enabled: true,
            time,
        }
    }
}

/// Per-prayer notification preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationSetting {
    #[default]
    Off,
    Notification,
    Adhan,
}

impl NotificationSetting {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationSetting::Off => "off",
            NotificationSetting::Notification => "notification",
            NotificationSetting::Adhan => "adhan",
        }
    }

    pub fn is_off(&self) -> bool {
        matches!(self, NotificationSetting::Off)
    }
}

impl FromStr for NotificationSetting {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "off" | "none" | "false" => Ok(NotificationSetting::Off),
            "notification" | "on" | "default" | "true" => Ok(NotificationSetting::Notification),
            "adhan" | "athan" | "azan" => Ok(NotificationSetting::Adhan),
            other => Err(Error::config(format!("Unknown notification setting '{}'", other))),
        }
    }
}

impl<'de> Deserialize<'de> for NotificationSetting {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Mode(String),
            Missing(()),
        }

        // Unknown modes are treated as off rather than failing the whole record
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Flag(true) => NotificationSetting::Notification,
            Raw::Flag(false) | Raw::Missing(()) => NotificationSetting::Off,
            Raw::Mode(mode) => mode.parse().unwrap_or_default(),
        })
    }
}

/// `notificationSetting` map; keys are matched case-insensitively
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationSettings(BTreeMap<String, NotificationSetting>);

impl NotificationSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, prayer: PrayerName) -> NotificationSetting {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(prayer.as_str()))
            .map(|(_, setting)| *setting)
            .unwrap_or_default()
    }

    pub fn set(&mut self, prayer: PrayerName, setting: NotificationSetting) {
        self.0.retain(|key, _| !key.eq_ignore_ascii_case(prayer.as_str()));
        self.0.insert(prayer.as_str().to_string(), setting);
    }

    /// Whether any prayer has notifications switched on
    pub fn any_enabled(&self) -> bool {
        self.0.values().any(|s| !s.is_off())
    }
}

/// A user's stored record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub registration_token: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub prayers: Vec<PrayerEntry>,
    #[serde(default, alias = "notificationSetting")]
    pub notification_settings: NotificationSettings,
    #[serde(default)]
    pub daily_night_notification_enabled: bool,
    #[serde(default)]
    pub prayer_blocker_enabled: bool,
    #[serde(default)]
    pub token_stale: bool,
    #[serde(default)]
    pub token_error_code: Option<String>,
    #[serde(default)]
    pub token_stale_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            registration_token: None,
            timezone: None,
            prayers: Vec::new(),
            notification_settings: NotificationSettings::default(),
            daily_night_notification_enabled: false,
            prayer_blocker_enabled: false,
            token_stale: false,
            token_error_code: None,
            token_stale_at: None,
        }
    }

    /// The user's timezone, falling back to UTC when absent or unknown
    pub fn tz(&self) -> Tz {
        self.timezone
            .as_deref()
            .and_then(|zone| zone.parse::<Tz>().ok())
            .unwrap_or(Tz::UTC)
    }

    /// Whether a stored timezone name failed to parse
    pub fn has_unknown_timezone(&self) -> bool {
        self.timezone
            .as_deref()
            .map(|zone| zone.parse::<Tz>().is_err())
            .unwrap_or(false)
    }

    /// The registration token, unless missing, empty or quarantined
    pub fn deliverable_token(&self) -> Option<&str> {
        if self.token_stale {
            return None;
        }
        self.registration_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }

    pub fn prayer(&self, name: PrayerName) -> Option<&PrayerEntry> {
        self.prayers.iter().find(|p| p.name == name)
    }
}

/// Whether a prayer was performed on a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    #[default]
    Unset,
    Completed,
    Excused,
}

impl CompletionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionStatus::Unset => "unset",
            CompletionStatus::Completed => "completed",
            CompletionStatus::Excused => "excused",
        }
    }

    /// Completed or excused: reminders for this prayer are pointless
    pub fn is_settled(&self) -> bool {
        !matches!(self, CompletionStatus::Unset)
    }
}

impl FromStr for CompletionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "unset" => Ok(CompletionStatus::Unset),
            "completed" | "done" => Ok(CompletionStatus::Completed),
            "excused" => Ok(CompletionStatus::Excused),
            other => Err(Error::db(format!("Unknown completion status '{}'", other))),
        }
    }
}

/// Notification opportunities tied to a prayer time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    PreReminder,
    AtTime,
    DelayReminder,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::PreReminder, Stage::AtTime, Stage::DelayReminder];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::PreReminder => "pre_reminder",
            Stage::AtTime => "at_time",
            Stage::DelayReminder => "delay_reminder",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What an idempotency marker guards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    Stage(Stage),
    BlockerActivate,
}

impl MarkerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerKind::Stage(stage) => stage.as_str(),
            MarkerKind::BlockerActivate => "blocker_activate",
        }
    }
}

impl From<Stage> for MarkerKind {
    fn from(stage: Stage) -> Self {
        MarkerKind::Stage(stage)
    }
}

impl FromStr for MarkerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pre_reminder" => Ok(MarkerKind::Stage(Stage::PreReminder)),
            "at_time" => Ok(MarkerKind::Stage(Stage::AtTime)),
            "delay_reminder" => Ok(MarkerKind::Stage(Stage::DelayReminder)),
            "blocker_activate" => Ok(MarkerKind::BlockerActivate),
            other => Err(Error::db(format!("Unknown marker kind '{}'", other))),
        }
    }
}

/// Calendar-day component of marker keys: the invocation's UTC date
pub fn marker_day(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

/// A pending or processed "like" on a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeEvent {
    pub id: i64,
    pub target_id: String,
    pub recipient_id: String,
    pub actor_display_name: String,
    pub created_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    #[serde(default)]
    pub processed: bool,
}
