//! Terminal output formatting

use chrono::{DateTime, Utc};
use colored::Colorize;
use muezzin_engine::{PrayerStatus, UserStatus};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

/// Global flag for JSON output mode
static JSON_MODE: AtomicBool = AtomicBool::new(false);

/// Enable or disable JSON output mode
pub fn set_json_mode(enabled: bool) {
    JSON_MODE.store(enabled, Ordering::SeqCst);
}

/// Check if JSON output mode is enabled
pub fn is_json_mode() -> bool {
    JSON_MODE.load(Ordering::SeqCst)
}

#[derive(Tabled, Debug, PartialEq)]
pub struct ReportRow {
    #[tabled(rename = "metric")]
    pub metric: String,
    #[tabled(rename = "value")]
    pub value: String,
}

/// Flatten a serialized job report into one row per counter
pub fn report_rows<T: Serialize>(report: &T) -> anyhow::Result<Vec<ReportRow>> {
    let value = serde_json::to_value(report)?;
    let rows = match value {
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(key, value)| ReportRow {
                metric: humanize(&key),
                value: match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                },
            })
            .collect(),
        other => vec![ReportRow {
            metric: "result".to_string(),
            value: other.to_string(),
        }],
    };
    Ok(rows)
}

pub fn print_report<T: Serialize>(title: &str, report: &T) -> anyhow::Result<()> {
    if is_json_mode() {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let table = Table::new(report_rows(report)?)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(1)).with(Alignment::right()))
        .to_string();

    println!("{}", title.bold());
    println!("{}", table);
    Ok(())
}

/// "usersScanned" -> "users scanned"
pub fn humanize(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push(' ');
            out.push(c.to_ascii_lowercase());
        } else if c == '_' {
            out.push(' ');
        } else {
            out.push(c);
        }
    }
    out
}

/// Signed minutes relative to the prayer, two decimals
pub fn format_delta(delta: f64) -> String {
    format!("{:+.2}m", delta)
}

#[derive(Tabled)]
pub struct PrayerRow {
    #[tabled(rename = "prayer")]
    pub prayer: String,
    #[tabled(rename = "on")]
    pub enabled: String,
    #[tabled(rename = "setting")]
    pub setting: String,
    #[tabled(rename = "time")]
    pub time: String,
    #[tabled(rename = "delta")]
    pub delta: String,
    #[tabled(rename = "source")]
    pub source: String,
    #[tabled(rename = "completion")]
    pub completion: String,
    #[tabled(rename = "sent")]
    pub sent: String,
}

impl From<&PrayerStatus> for PrayerRow {
    fn from(status: &PrayerStatus) -> Self {
        let (time, delta, source) = match &status.resolution {
            Ok(resolution) => (
                resolution.prayer_clock(),
                format_delta(resolution.delta),
                if resolution.is_degraded() {
                    "wall clock".yellow().to_string()
                } else {
                    "instant".to_string()
                },
            ),
            Err(reason) => (reason.red().to_string(), "-".to_string(), "-".to_string()),
        };

        PrayerRow {
            prayer: status.prayer.display_name().to_string(),
            enabled: if status.enabled { "yes" } else { "no" }.to_string(),
            setting: status.setting.as_str().to_string(),
            time,
            delta,
            source,
            completion: status.completion.as_str().to_string(),
            sent: sent_list(status),
        }
    }
}

fn sent_list(status: &PrayerStatus) -> String {
    if status.sent_today.is_empty() {
        return "-".to_string();
    }
    status
        .sent_today
        .iter()
        .map(|stage| stage.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// JSON representation of one prayer's state
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrayerStatusJson {
    pub prayer: String,
    pub enabled: bool,
    pub setting: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub completion: String,
    pub sent_today: Vec<String>,
}

impl From<&PrayerStatus> for PrayerStatusJson {
    fn from(status: &PrayerStatus) -> Self {
        let (time, delta_minutes, degraded, error) = match &status.resolution {
            Ok(r) => (
                Some(r.prayer_clock()),
                Some(r.delta),
                Some(r.is_degraded()),
                None,
            ),
            Err(reason) => (None, None, None, Some(reason.clone())),
        };

        PrayerStatusJson {
            prayer: status.prayer.as_str().to_string(),
            enabled: status.enabled,
            setting: status.setting.as_str().to_string(),
            time,
            delta_minutes,
            degraded,
            error,
            completion: status.completion.as_str().to_string(),
            sent_today: status
                .sent_today
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerJson {
    pub kind: String,
    pub prayer: String,
    pub day: String,
    pub sent_at: DateTime<Utc>,
}

/// JSON representation of a user's notification state
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusJson {
    pub user_id: String,
    pub at: DateTime<Utc>,
    pub has_token: bool,
    pub token_stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_error_code: Option<String>,
    pub timezone: String,
    pub prayer_blocker_enabled: bool,
    pub prayers: Vec<PrayerStatusJson>,
    pub markers: Vec<MarkerJson>,
}

impl StatusJson {
    pub fn new(status: &UserStatus, now: DateTime<Utc>) -> Self {
        let user = &status.user;
        StatusJson {
            user_id: user.id.clone(),
            at: now,
            has_token: user
                .registration_token
                .as_deref()
                .map(|t| !t.trim().is_empty())
                .unwrap_or(false),
            token_stale: user.token_stale,
            token_error_code: user.token_error_code.clone(),
            timezone: user.tz().name().to_string(),
            prayer_blocker_enabled: user.prayer_blocker_enabled,
            prayers: status.prayers.iter().map(PrayerStatusJson::from).collect(),
            markers: status
                .markers
                .iter()
                .map(|m| MarkerJson {
                    kind: m.kind.as_str().to_string(),
                    prayer: m.prayer.as_str().to_string(),
                    day: m.day.to_string(),
                    sent_at: m.sent_at,
                })
                .collect(),
        }
    }
}

pub fn print_user_status(status: &UserStatus, now: DateTime<Utc>) {
    if is_json_mode() {
        match serde_json::to_string_pretty(&StatusJson::new(status, now)) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing to JSON: {}", e),
        }
        return;
    }

    let user = &status.user;
    let token = if user.token_stale {
        format!(
            "stale ({})",
            user.token_error_code.as_deref().unwrap_or("unknown")
        )
        .red()
        .to_string()
    } else if user.deliverable_token().is_some() {
        "ok".green().to_string()
    } else {
        "missing".yellow().to_string()
    };
    let timezone = if user.has_unknown_timezone() {
        format!(
            "{} (unknown, using UTC)",
            user.timezone.as_deref().unwrap_or_default()
        )
        .yellow()
        .to_string()
    } else {
        user.tz().name().to_string()
    };

    println!("{}", "─".repeat(50));
    println!("  {} │ {}", "User".bold(), user.id);
    println!("  {} │ {}", "At".bold(), now.to_rfc3339());
    println!("  {} │ {}", "Token".bold(), token);
    println!("  {} │ {}", "Timezone".bold(), timezone);
    println!(
        "  {} │ {}",
        "Blocker".bold(),
        if user.prayer_blocker_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!("{}", "─".repeat(50));

    if status.prayers.is_empty() {
        println!("No prayers stored");
    } else {
        let rows: Vec<PrayerRow> = status.prayers.iter().map(PrayerRow::from).collect();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::single(4)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
    }

    if !status.markers.is_empty() {
        println!("{}", "Markers today".bold());
        for marker in &status.markers {
            println!(
                "  {} {} at {}",
                marker.prayer,
                marker.kind.as_str(),
                marker.sent_at.format("%H:%M:%S UTC")
            );
        }
    }
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

/// JSON wrapper for generic responses
#[derive(Serialize)]
pub struct ResponseJson<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Print a success message in JSON format if enabled
pub fn print_success_json<T: Serialize>(message: &str, data: Option<T>) {
    if is_json_mode() {
        let response = ResponseJson {
            success: true,
            message: Some(message.to_string()),
            data,
        };
        if let Ok(json) = serde_json::to_string_pretty(&response) {
            println!("{}", json);
        }
    } else {
        print_success(message);
    }
}
