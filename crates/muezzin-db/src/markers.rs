//! Dispatch markers repository - idempotency records
//!
//! A marker keyed (user, kind, prayer, day) means that dispatch is claimed or
//! done. Claiming is an `INSERT OR IGNORE`, so two concurrent runs can never
//! both win the same key.

use chrono::{DateTime, NaiveDate, Utc};
use muezzin_core::stage::SentStages;
use muezzin_core::{MarkerKind, PrayerName, Result};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use crate::{db_err, decode_ts, encode_ts};

/// A stored marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerRecord {
    pub user_id: String,
    pub kind: MarkerKind,
    pub prayer: PrayerName,
    pub day: NaiveDate,
    pub sent_at: DateTime<Utc>,
}

/// Repository for dispatch markers
pub struct MarkersRepository {
    pool: SqlitePool,
}

impl MarkersRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Claim a marker. Returns false if someone already holds it.
    pub async fn claim(
        &self,
        user_id: &str,
        kind: MarkerKind,
        prayer: PrayerName,
        day: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO dispatch_markers (user_id, kind, prayer, day, sent_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(prayer.as_str())
        .bind(day.to_string())
        .bind(encode_ts(at))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(result.rows_affected() == 1)
    }

    /// Drop a claim so a later run may retry
    pub async fn release(
        &self,
        user_id: &str,
        kind: MarkerKind,
        prayer: PrayerName,
        day: NaiveDate,
    ) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM dispatch_markers WHERE user_id = ? AND kind = ? AND prayer = ? AND day = ?",
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(prayer.as_str())
        .bind(day.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(result.rows_affected() > 0)
    }

    /// Stages already marked for a user's prayer on a day
    pub async fn sent_stages(
        &self,
        user_id: &str,
        prayer: PrayerName,
        day: NaiveDate,
    ) -> Result<SentStages> {
        let rows = sqlx::query(
            "SELECT kind FROM dispatch_markers WHERE user_id = ? AND prayer = ? AND day = ?",
        )
        .bind(user_id)
        .bind(prayer.as_str())
        .bind(day.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut sent = SentStages::new();
        for row in rows {
            let kind: String = row.get("kind");
            if let Ok(MarkerKind::Stage(stage)) = kind.parse::<MarkerKind>() {
                sent.insert(stage);
            }
        }
        Ok(sent)
    }

    /// All markers for a user on a day, oldest first
    pub async fn list_for_day(&self, user_id: &str, day: NaiveDate) -> Result<Vec<MarkerRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, kind, prayer, day, sent_at FROM dispatch_markers
            WHERE user_id = ? AND day = ?
            ORDER BY sent_at ASC, prayer ASC
            "#,
        )
        .bind(user_id)
        .bind(day.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|row| {
                let kind: String = row.get("kind");
                let prayer: String = row.get("prayer");
                let day: String = row.get("day");
                let sent_at: String = row.get("sent_at");
                Ok(MarkerRecord {
                    user_id: row.get("user_id"),
                    kind: kind.parse()?,
                    prayer: prayer.parse()?,
                    day: day
                        .parse()
                        .map_err(|e| muezzin_core::Error::db(format!("Bad day '{}': {}", day, e)))?,
                    sent_at: decode_ts(&sent_at)?,
                })
            })
            .collect()
    }

    /// Delete markers for days before `day`
    pub async fn prune_before(&self, day: NaiveDate) -> Result<u64> {
        let result = sqlx::query("DELETE FROM dispatch_markers WHERE day < ?")
            .bind(day.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_db;
    use chrono::TimeZone;
    use muezzin_core::Stage;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 16, 0, 30).unwrap()
    }

    #[tokio::test]
    async fn test_claim_is_exclusive() {
        let (db, _dir) = setup_db().await;
        let markers = db.markers();
        let kind = MarkerKind::Stage(Stage::AtTime);

        assert!(markers.claim("amina", kind, PrayerName::Asr, day(), at()).await.unwrap());
        assert!(!markers.claim("amina", kind, PrayerName::Asr, day(), at()).await.unwrap());
        let held = markers.list_for_day("amina", day()).await.unwrap();
        assert_eq!(held.len(), 1);
        assert_eq!((held[0].kind, held[0].prayer), (kind, PrayerName::Asr));

        // Different key components are independent
        assert!(markers
            .claim("amina", MarkerKind::BlockerActivate, PrayerName::Asr, day(), at())
            .await
            .unwrap());
        assert!(markers
            .claim("amina", kind, PrayerName::Maghrib, day(), at())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_release_allows_retry() {
        let (db, _dir) = setup_db().await;
        let markers = db.markers();
        let kind = MarkerKind::Stage(Stage::PreReminder);

        assert!(markers.claim("amina", kind, PrayerName::Isha, day(), at()).await.unwrap());
        assert!(markers.release("amina", kind, PrayerName::Isha, day()).await.unwrap());
        assert!(markers.list_for_day("amina", day()).await.unwrap().is_empty());
        assert!(markers.claim("amina", kind, PrayerName::Isha, day(), at()).await.unwrap());
    }

    #[tokio::test]
    async fn test_sent_stages_ignores_blocker_markers() {
        let (db, _dir) = setup_db().await;
        let markers = db.markers();

        markers
            .claim("amina", Stage::PreReminder.into(), PrayerName::Asr, day(), at())
            .await
            .unwrap();
        markers
            .claim("amina", MarkerKind::BlockerActivate, PrayerName::Asr, day(), at())
            .await
            .unwrap();

        let sent = markers.sent_stages("amina", PrayerName::Asr, day()).await.unwrap();
        assert!(sent.contains(Stage::PreReminder));
        assert!(!sent.contains(Stage::AtTime));
        assert_eq!(sent.iter().count(), 1);
    }

    #[tokio::test]
    async fn test_list_and_prune() {
        let (db, _dir) = setup_db().await;
        let markers = db.markers();
        let yesterday = day().pred_opt().unwrap();

        markers
            .claim("amina", Stage::AtTime.into(), PrayerName::Fajr, yesterday, at())
            .await
            .unwrap();
        markers
            .claim("amina", Stage::AtTime.into(), PrayerName::Fajr, day(), at())
            .await
            .unwrap();

        let listed = markers.list_for_day("amina", day()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].kind, MarkerKind::Stage(Stage::AtTime));
        assert_eq!(listed[0].sent_at, at());

        assert_eq!(markers.prune_before(day()).await.unwrap(), 1);
        assert!(markers.list_for_day("amina", yesterday).await.unwrap().is_empty());
    }
}
