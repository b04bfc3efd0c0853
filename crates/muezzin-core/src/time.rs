//! Prayer time resolution
//!
//! Converts a stored [`PrayerTime`] and a user's timezone into minutes since
//! local midnight, and the signed distance from "now" to the prayer. All
//! notification windows are expressed on that distance.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{MINUTES_PER_DAY, ROLLOVER_THRESHOLD_MINUTES};
use crate::error::{Error, Result};
use crate::types::PrayerTime;

/// "4:54PM", "4:54", "16:54", "04:54:00 pm" once whitespace and dots are removed
static WALL_CLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2})(?::\d{2})?([AaPp][Mm])?$").expect("Invalid wall clock regex")
});

/// How much the resolved prayer minute can be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// Derived from an absolute instant
    Authoritative,
    /// Derived from a dateless wall-clock string
    Degraded,
}

/// Outcome of resolving one prayer against "now"
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    /// Prayer time as whole minutes since local midnight
    pub prayer_minutes: u32,
    /// Now as fractional minutes since local midnight
    pub current_minutes: f64,
    /// `current_minutes - prayer_minutes`, wrapped across midnight
    pub delta: f64,
    /// True when a day was added to the delta
    pub wrapped: bool,
    pub confidence: Confidence,
    /// Local calendar day on which this prayer occurrence falls
    pub local_date: NaiveDate,
}

impl Resolution {
    pub fn delta_seconds(&self) -> f64 {
        self.delta * 60.0
    }

    pub fn is_degraded(&self) -> bool {
        self.confidence == Confidence::Degraded
    }

    pub fn prayer_hour(&self) -> u32 {
        self.prayer_minutes / 60
    }

    pub fn prayer_minute(&self) -> u32 {
        self.prayer_minutes % 60
    }

    /// Prayer time as "HH:MM"
    pub fn prayer_clock(&self) -> String {
        format!("{:02}:{:02}", self.prayer_hour(), self.prayer_minute())
    }
}

/// Parse a wall-clock string into (hour, minute) on a 24h clock
pub fn parse_wall_clock(text: &str) -> Result<(u32, u32)> {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect();

    let caps = WALL_CLOCK_REGEX
        .captures(&compact)
        .ok_or_else(|| Error::invalid_time(text))?;

    let hour: u32 = caps[1].parse().map_err(|_| Error::invalid_time(text))?;
    let minute: u32 = caps[2].parse().map_err(|_| Error::invalid_time(text))?;
    if minute > 59 {
        return Err(Error::invalid_time(text));
    }

    let hour = match caps.get(3).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(meridiem) => {
            if !(1..=12).contains(&hour) {
                return Err(Error::invalid_time(text));
            }
            match (meridiem.as_str(), hour) {
                ("am", 12) => 0,
                ("am", h) => h,
                ("pm", 12) => 12,
                (_, h) => h + 12,
            }
        }
        None if hour < 24 => hour,
        None => return Err(Error::invalid_time(text)),
    };

    Ok((hour, minute))
}

/// Fractional minutes since midnight for a local time
fn fractional_minutes<T: Timelike>(t: &T) -> f64 {
    let seconds = t.second() as f64 + t.nanosecond().min(999_999_999) as f64 / 1e9;
    (t.hour() * 60 + t.minute()) as f64 + seconds / 60.0
}

/// Resolve a stored prayer time in `tz` against `now`.
///
/// Instants are authoritative. Wall-clock strings are taken as already local
/// and flagged [`Confidence::Degraded`]. `Unset` fails with
/// [`Error::MissingPrayerTime`].
pub fn resolve(time: &PrayerTime, tz: Tz, now: DateTime<Utc>) -> Result<Resolution> {
    let (prayer_minutes, confidence) = match time {
        PrayerTime::Instant(at) => {
            let local = at.with_timezone(&tz);
            (local.hour() * 60 + local.minute(), Confidence::Authoritative)
        }
        PrayerTime::WallClock(text) => {
            let (hour, minute) = parse_wall_clock(text)?;
            (hour * 60 + minute, Confidence::Degraded)
        }
        PrayerTime::Unset => return Err(Error::MissingPrayerTime),
    };

    let local_now = now.with_timezone(&tz);
    let current_minutes = fractional_minutes(&local_now);

    let mut delta = current_minutes - prayer_minutes as f64;
    let wrapped = delta < ROLLOVER_THRESHOLD_MINUTES;
    if wrapped {
        delta += MINUTES_PER_DAY;
    }

    let today = local_now.date_naive();
    let local_date = if wrapped {
        today.pred_opt().unwrap_or(today)
    } else {
        today
    };

    Ok(Resolution {
        prayer_minutes,
        current_minutes,
        delta,
        wrapped,
        confidence,
        local_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::{America, Asia, Australia, Europe};

    #[test]
    fn test_parse_wall_clock_formats() {
        assert_eq!(parse_wall_clock("4:54 PM").unwrap(), (16, 54));
        assert_eq!(parse_wall_clock("4:54PM").unwrap(), (16, 54));
        assert_eq!(parse_wall_clock("4:54\u{202f}pm").unwrap(), (16, 54));
        assert_eq!(parse_wall_clock("12:05 AM").unwrap(), (0, 5));
        assert_eq!(parse_wall_clock("12:30 PM").unwrap(), (12, 30));
        assert_eq!(parse_wall_clock("05:12 a.m.").unwrap(), (5, 12));
        assert_eq!(parse_wall_clock("16:54").unwrap(), (16, 54));
        assert_eq!(parse_wall_clock("16:54:30").unwrap(), (16, 54));
    }

    #[test]
    fn test_parse_wall_clock_rejects_garbage() {
        assert!(parse_wall_clock("").is_err());
        assert!(parse_wall_clock("noon").is_err());
        assert!(parse_wall_clock("13:10 PM").is_err());
        assert!(parse_wall_clock("24:00").is_err());
        assert!(parse_wall_clock("7:75 AM").is_err());
    }

    #[test]
    fn test_instant_matches_independent_conversion() {
        let zones: [Tz; 5] = [
            Tz::UTC,
            America::New_York,
            Europe::London,
            Asia::Kolkata,
            Australia::Adelaide,
        ];
        let instants = [
            Utc.with_ymd_and_hms(2026, 1, 15, 5, 12, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 8, 6, 59, 30).unwrap(),
            Utc.with_ymd_and_hms(2026, 7, 1, 23, 45, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 10, 25, 1, 30, 0).unwrap(),
        ];
        let now = Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap();

        for tz in zones {
            for at in instants {
                let resolution = resolve(&PrayerTime::Instant(at), tz, now).unwrap();
                let local = at.with_timezone(&tz);
                assert_eq!(resolution.prayer_hour(), local.hour(), "{} {}", tz, at);
                assert_eq!(resolution.prayer_minute(), local.minute(), "{} {}", tz, at);
                assert_eq!(resolution.confidence, Confidence::Authoritative);
            }
        }
    }

    #[test]
    fn test_current_minutes_keeps_seconds() {
        // 12:00:30 in New York (EDT, UTC-4)
        let now = Utc.with_ymd_and_hms(2026, 7, 1, 16, 0, 30).unwrap();
        let prayer = Utc.with_ymd_and_hms(2026, 7, 1, 16, 0, 0).unwrap();
        let resolution = resolve(&PrayerTime::Instant(prayer), America::New_York, now).unwrap();

        assert_eq!(resolution.prayer_minutes, 720);
        assert!((resolution.current_minutes - 720.5).abs() < 1e-9);
        assert!((resolution.delta - 0.5).abs() < 1e-9);
        assert!((resolution.delta_seconds() - 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_rollover_after_midnight() {
        // Isha at 23:50 local, now 00:20 local the next day
        let now = Utc.with_ymd_and_hms(2026, 7, 2, 0, 20, 0).unwrap();
        let resolution = resolve(&PrayerTime::WallClock("11:50 PM".into()), Tz::UTC, now).unwrap();

        assert!(resolution.wrapped);
        assert!((resolution.delta - 30.0).abs() < 1e-9);
        assert_eq!(
            resolution.local_date,
            NaiveDate::from_ymd_opt(2026, 7, 1).unwrap()
        );
    }

    #[test]
    fn test_no_rollover_for_upcoming_prayer() {
        // Fajr at 00:05, now 23:55 the previous evening: far in the past, not wrapped
        let now = Utc.with_ymd_and_hms(2026, 7, 1, 23, 55, 0).unwrap();
        let resolution = resolve(&PrayerTime::WallClock("00:05".into()), Tz::UTC, now).unwrap();
        assert!(!resolution.wrapped);
        assert!((resolution.delta - 1430.0).abs() < 1e-9);

        // Maghrib at 19:00, now 13:00: upcoming, negative delta
        let now = Utc.with_ymd_and_hms(2026, 7, 1, 13, 0, 0).unwrap();
        let resolution = resolve(&PrayerTime::WallClock("7:00 PM".into()), Tz::UTC, now).unwrap();
        assert!(!resolution.wrapped);
        assert!((resolution.delta + 360.0).abs() < 1e-9);
    }

    #[test]
    fn test_wall_clock_path_is_degraded() {
        let now = Utc.with_ymd_and_hms(2026, 7, 1, 16, 0, 0).unwrap();
        let resolution = resolve(&PrayerTime::WallClock("4:00 PM".into()), Tz::UTC, now).unwrap();
        assert!(resolution.is_degraded());
        assert_eq!(resolution.prayer_clock(), "16:00");
    }

    #[test]
    fn test_wall_clock_is_not_shifted_by_timezone() {
        // A string is already local: "4:00 PM" stays 16:00 whatever the zone
        let now = Utc.with_ymd_and_hms(2026, 7, 1, 16, 0, 0).unwrap();
        let resolution =
            resolve(&PrayerTime::WallClock("4:00 PM".into()), Asia::Kolkata, now).unwrap();
        assert_eq!(resolution.prayer_minutes, 16 * 60);
    }

    #[test]
    fn test_unset_time_is_missing() {
        let now = Utc::now();
        let err = resolve(&PrayerTime::Unset, Tz::UTC, now).unwrap_err();
        assert!(matches!(err, Error::MissingPrayerTime));
    }

    #[test]
    fn test_invalid_wall_clock_is_reported() {
        let now = Utc::now();
        let err = resolve(&PrayerTime::WallClock("soon".into()), Tz::UTC, now).unwrap_err();
        assert!(matches!(err, Error::InvalidPrayerTime(_)));
    }
}
