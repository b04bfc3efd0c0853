//! Users repository - per-user records
//!
//! Supports the four operations the engine relies on: get one, get all, get
//! all filtered by a boolean field, and partial-field update.

use chrono::{DateTime, Utc};
use muezzin_core::{Error, NotificationSettings, PrayerEntry, Result, UserRecord};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};

use crate::{db_err, decode_ts, encode_ts};

const USER_COLUMNS: &str = r#"
    id, registration_token, timezone, prayers, notification_settings,
    daily_night_notification_enabled, prayer_blocker_enabled, token_stale,
    token_error_code, token_stale_at
"#;

/// Boolean fields usable as scan filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFlag {
    PrayerBlockerEnabled,
}

impl UserFlag {
    fn column(&self) -> &'static str {
        match self {
            UserFlag::PrayerBlockerEnabled => "prayer_blocker_enabled",
        }
    }
}

/// A partial update; `None` leaves the field untouched
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub registration_token: Option<Option<String>>,
    pub timezone: Option<Option<String>>,
    pub prayers: Option<Vec<PrayerEntry>>,
    pub notification_settings: Option<NotificationSettings>,
    pub daily_night_notification_enabled: Option<bool>,
    pub prayer_blocker_enabled: Option<bool>,
    pub token_stale: Option<bool>,
    pub token_error_code: Option<Option<String>>,
    pub token_stale_at: Option<Option<DateTime<Utc>>>,
}

impl UserPatch {
    /// Flag the registration token as stale
    pub fn quarantine(error_code: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            token_stale: Some(true),
            token_error_code: Some(Some(error_code.into())),
            token_stale_at: Some(Some(at)),
            ..Default::default()
        }
    }

    /// Store a fresh registration token and lift any quarantine
    pub fn refreshed_token(token: impl Into<String>) -> Self {
        Self {
            registration_token: Some(Some(token.into())),
            token_stale: Some(false),
            token_error_code: Some(None),
            token_stale_at: Some(None),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.registration_token.is_none()
            && self.timezone.is_none()
            && self.prayers.is_none()
            && self.notification_settings.is_none()
            && self.daily_night_notification_enabled.is_none()
            && self.prayer_blocker_enabled.is_none()
            && self.token_stale.is_none()
            && self.token_error_code.is_none()
            && self.token_stale_at.is_none()
    }
}

/// One row of a scan; a row that fails to decode is reported, not fatal
#[derive(Debug)]
pub struct ScannedUser {
    pub id: String,
    pub record: Result<UserRecord>,
}

/// Repository for user records
pub struct UsersRepository {
    pool: SqlitePool,
}

impl UsersRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or fully replace a user record
    pub async fn upsert(&self, user: &UserRecord) -> Result<()> {
        let prayers_json = serde_json::to_string(&user.prayers)?;
        let settings_json = serde_json::to_string(&user.notification_settings)?;

        sqlx::query(
            r#"
            INSERT INTO users (
                id, registration_token, timezone, prayers, notification_settings,
                daily_night_notification_enabled, prayer_blocker_enabled, token_stale,
                token_error_code, token_stale_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                registration_token = excluded.registration_token,
                timezone = excluded.timezone,
                prayers = excluded.prayers,
                notification_settings = excluded.notification_settings,
                daily_night_notification_enabled = excluded.daily_night_notification_enabled,
                prayer_blocker_enabled = excluded.prayer_blocker_enabled,
                token_stale = excluded.token_stale,
                token_error_code = excluded.token_error_code,
                token_stale_at = excluded.token_stale_at,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&user.id)
        .bind(&user.registration_token)
        .bind(&user.timezone)
        .bind(&prayers_json)
        .bind(&settings_json)
        .bind(user.daily_night_notification_enabled)
        .bind(user.prayer_blocker_enabled)
        .bind(user.token_stale)
        .bind(&user.token_error_code)
        .bind(user.token_stale_at.map(encode_ts))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    /// Get a user by ID
    pub async fn get(&self, id: &str) -> Result<Option<UserRecord>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match row {
            Some(row) => Ok(Some(row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    /// Get all users; fails if any record is malformed
    pub async fn get_all(&self) -> Result<Vec<UserRecord>> {
        self.scan(None)
            .await?
            .into_iter()
            .map(|scanned| scanned.record)
            .collect()
    }

    /// Get all users whose boolean field equals `value`
    pub async fn get_all_where(&self, flag: UserFlag, value: bool) -> Result<Vec<UserRecord>> {
        self.scan(Some((flag, value)))
            .await?
            .into_iter()
            .map(|scanned| scanned.record)
            .collect()
    }

    /// Enumerate users, keeping per-row decode failures separate from the
    /// enumeration itself
    pub async fn scan(&self, filter: Option<(UserFlag, bool)>) -> Result<Vec<ScannedUser>> {
        let sql = match filter {
            Some((flag, _)) => format!(
                "SELECT {} FROM users WHERE {} = ? ORDER BY id",
                USER_COLUMNS,
                flag.column()
            ),
            None => format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS),
        };

        let mut query = sqlx::query(&sql);
        if let Some((_, value)) = filter {
            query = query.bind(value);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;

        Ok(rows
            .iter()
            .map(|row| ScannedUser {
                id: row.get("id"),
                record: row_to_user(row),
            })
            .collect())
    }

    /// Apply a partial update. Returns false when the user does not exist.
    pub async fn update(&self, id: &str, patch: &UserPatch) -> Result<bool> {
        if patch.is_empty() {
            return self.exists(id).await;
        }

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("UPDATE users SET updated_at = CURRENT_TIMESTAMP");

        if let Some(token) = &patch.registration_token {
            qb.push(", registration_token = ").push_bind(token.clone());
        }
        if let Some(timezone) = &patch.timezone {
            qb.push(", timezone = ").push_bind(timezone.clone());
        }
        if let Some(prayers) = &patch.prayers {
            qb.push(", prayers = ").push_bind(serde_json::to_string(prayers)?);
        }
        if let Some(settings) = &patch.notification_settings {
            qb.push(", notification_settings = ")
                .push_bind(serde_json::to_string(settings)?);
        }
        if let Some(enabled) = patch.daily_night_notification_enabled {
            qb.push(", daily_night_notification_enabled = ").push_bind(enabled);
        }
        if let Some(enabled) = patch.prayer_blocker_enabled {
            qb.push(", prayer_blocker_enabled = ").push_bind(enabled);
        }
        if let Some(stale) = patch.token_stale {
            qb.push(", token_stale = ").push_bind(stale);
        }
        if let Some(code) = &patch.token_error_code {
            qb.push(", token_error_code = ").push_bind(code.clone());
        }
        if let Some(at) = &patch.token_stale_at {
            qb.push(", token_stale_at = ").push_bind(at.map(encode_ts));
        }
        qb.push(" WHERE id = ").push_bind(id.to_string());

        let result = qb.build().execute(&self.pool).await.map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the registration token, lifting any quarantine
    pub async fn set_token(&self, id: &str, token: &str) -> Result<bool> {
        self.update(id, &UserPatch::refreshed_token(token)).await
    }

    /// Check if a user exists
    pub async fn exists(&self, id: &str) -> Result<bool> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(row.0 > 0)
    }

    /// Number of stored users
    pub async fn count(&self) -> Result<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(row.0 as u64)
    }

    /// Delete a user by ID
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_user(row: &SqliteRow) -> Result<UserRecord> {
    let id: String = row.get("id");
    let registration_token: Option<String> = row.get("registration_token");
    let timezone: Option<String> = row.get("timezone");
    let prayers_json: String = row.get("prayers");
    let settings_json: String = row.get("notification_settings");
    let daily_night: i64 = row.get("daily_night_notification_enabled");
    let blocker: i64 = row.get("prayer_blocker_enabled");
    let token_stale: i64 = row.get("token_stale");
    let token_error_code: Option<String> = row.get("token_error_code");
    let token_stale_at: Option<String> = row.get("token_stale_at");

    let prayers: Vec<PrayerEntry> = serde_json::from_str(&prayers_json)
        .map_err(|e| Error::db(format!("User {} has malformed prayers: {}", id, e)))?;
    let notification_settings: NotificationSettings = serde_json::from_str(&settings_json)
        .map_err(|e| Error::db(format!("User {} has malformed settings: {}", id, e)))?;
    let token_stale_at = token_stale_at.as_deref().map(decode_ts).transpose()?;

    Ok(UserRecord {
        id,
        registration_token,
        timezone,
        prayers,
        notification_settings,
        daily_night_notification_enabled: daily_night != 0,
        prayer_blocker_enabled: blocker != 0,
        token_stale: token_stale != 0,
        token_error_code,
        token_stale_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_db;
    use chrono::TimeZone;
    use muezzin_core::{NotificationSetting, PrayerName, PrayerTime};

    fn sample_user(id: &str) -> UserRecord {
        let mut user = UserRecord::new(id);
        user.registration_token = Some(format!("ExponentPushToken[{}]", id));
        user.timezone = Some("Europe/London".to_string());
        user.prayers = vec![
            PrayerEntry::new(
                PrayerName::Fajr,
                PrayerTime::Instant(Utc.with_ymd_and_hms(2026, 5, 1, 3, 40, 0).unwrap()),
            ),
            PrayerEntry::new(PrayerName::Asr, PrayerTime::WallClock("4:54 PM".to_string())),
        ];
        user.notification_settings
            .set(PrayerName::Fajr, NotificationSetting::Adhan);
        user
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let (db, _dir) = setup_db().await;
        let users = db.users();

        let user = sample_user("amina");
        users.upsert(&user).await.unwrap();

        let loaded = users.get("amina").await.unwrap().unwrap();
        assert_eq!(loaded, user);
        assert!(users.get("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let (db, _dir) = setup_db().await;
        let users = db.users();

        let mut user = sample_user("amina");
        users.upsert(&user).await.unwrap();
        user.timezone = Some("Asia/Jakarta".to_string());
        users.upsert(&user).await.unwrap();

        assert_eq!(users.count().await.unwrap(), 1);
        let loaded = users.get("amina").await.unwrap().unwrap();
        assert_eq!(loaded.timezone.as_deref(), Some("Asia/Jakarta"));
    }

    #[tokio::test]
    async fn test_get_all_where_flag() {
        let (db, _dir) = setup_db().await;
        let users = db.users();

        let mut blocker = sample_user("bilal");
        blocker.prayer_blocker_enabled = true;
        users.upsert(&blocker).await.unwrap();
        users.upsert(&sample_user("amina")).await.unwrap();

        let all = users.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "amina");

        let enabled = users
            .get_all_where(UserFlag::PrayerBlockerEnabled, true)
            .await
            .unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].id, "bilal");
    }

    #[tokio::test]
    async fn test_quarantine_patch() {
        let (db, _dir) = setup_db().await;
        let users = db.users();
        users.upsert(&sample_user("amina")).await.unwrap();

        let at = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let updated = users
            .update("amina", &UserPatch::quarantine("DeviceNotRegistered", at))
            .await
            .unwrap();
        assert!(updated);

        let loaded = users.get("amina").await.unwrap().unwrap();
        assert!(loaded.token_stale);
        assert_eq!(loaded.token_error_code.as_deref(), Some("DeviceNotRegistered"));
        assert_eq!(loaded.token_stale_at, Some(at));
        // Untouched fields survive
        assert_eq!(loaded.prayers.len(), 2);
        assert!(loaded.registration_token.is_some());
    }

    #[tokio::test]
    async fn test_refreshed_token_lifts_quarantine() {
        let (db, _dir) = setup_db().await;
        let users = db.users();
        users.upsert(&sample_user("amina")).await.unwrap();
        users
            .update("amina", &UserPatch::quarantine("InvalidCredentials", Utc::now()))
            .await
            .unwrap();

        assert!(users
            .set_token("amina", "ExponentPushToken[new]")
            .await
            .unwrap());

        let loaded = users.get("amina").await.unwrap().unwrap();
        assert!(!loaded.token_stale);
        assert!(loaded.token_error_code.is_none());
        assert_eq!(loaded.deliverable_token(), Some("ExponentPushToken[new]"));
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let (db, _dir) = setup_db().await;
        let updated = db
            .users()
            .update("ghost", &UserPatch::quarantine("DeviceNotRegistered", Utc::now()))
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_scan_reports_malformed_rows() {
        let (db, _dir) = setup_db().await;
        let users = db.users();
        users.upsert(&sample_user("amina")).await.unwrap();

        sqlx::query("INSERT INTO users (id, prayers) VALUES ('broken', 'not json')")
            .execute(db.pool())
            .await
            .unwrap();

        let scanned = users.scan(None).await.unwrap();
        assert_eq!(scanned.len(), 2);
        let broken = scanned.iter().find(|s| s.id == "broken").unwrap();
        assert!(broken.record.is_err());
        let good = scanned.iter().find(|s| s.id == "amina").unwrap();
        assert!(good.record.is_ok());

        assert!(users.get_all().await.is_err());
    }
}
