#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use muezzin_core::{
    EngineConfig, MarkerKind, NotificationSetting, PrayerEntry, PrayerName, PrayerTime, UserRecord,
};
use muezzin_db::Database;
use muezzin_engine::Engine;
use muezzin_push::mock::MockGateway;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

pub struct Harness {
    pub engine: Engine,
    pub db: Database,
    pub gateway: Arc<MockGateway>,
    // Keeps the database file alive
    _dir: TempDir,
}

pub async fn harness() -> Harness {
    harness_with(MockGateway::new()).await
}

pub async fn harness_with(gateway: MockGateway) -> Harness {
    let dir = tempdir().unwrap();
    let db = Database::new(&dir.path().join("muezzin.db")).await.unwrap();
    let gateway = Arc::new(gateway);
    let engine = Engine::new(db.clone(), gateway.clone(), EngineConfig::default());
    Harness {
        engine,
        db,
        gateway,
        _dir: dir,
    }
}

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

pub fn token_for(id: &str) -> String {
    format!("ExponentPushToken[{}]", id)
}

pub fn user(id: &str, timezone: &str) -> UserRecord {
    let mut user = UserRecord::new(id);
    user.registration_token = Some(token_for(id));
    user.timezone = Some(timezone.to_string());
    user
}

pub fn with_prayer(
    mut user: UserRecord,
    name: PrayerName,
    time: PrayerTime,
    setting: NotificationSetting,
) -> UserRecord {
    user.prayers.push(PrayerEntry::new(name, time));
    user.notification_settings.set(name, setting);
    user
}

/// New York user whose Dhuhr is at 12:00 local (16:00 UTC) on 2026-05-01
pub fn new_york_dhuhr(id: &str, setting: NotificationSetting) -> UserRecord {
    with_prayer(
        user(id, "America/New_York"),
        PrayerName::Dhuhr,
        PrayerTime::Instant(utc(2026, 5, 1, 16, 0, 0)),
        setting,
    )
}

/// Whether a marker with this key is stored for the day
pub async fn has_marker(
    h: &Harness,
    user_id: &str,
    kind: MarkerKind,
    prayer: PrayerName,
    day: NaiveDate,
) -> bool {
    h.db.markers()
        .list_for_day(user_id, day)
        .await
        .unwrap()
        .iter()
        .any(|m| m.kind == kind && m.prayer == prayer)
}
