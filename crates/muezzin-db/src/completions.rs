//! Completions repository - per-user, per-day prayer status

use chrono::NaiveDate;
use muezzin_core::{CompletionStatus, PrayerName, Result};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use crate::db_err;

/// Repository for completion records
pub struct CompletionsRepository {
    pool: SqlitePool,
}

impl CompletionsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a status; `Unset` removes the record
    pub async fn set(
        &self,
        user_id: &str,
        day: NaiveDate,
        prayer: PrayerName,
        status: CompletionStatus,
    ) -> Result<()> {
        if status == CompletionStatus::Unset {
            sqlx::query("DELETE FROM completions WHERE user_id = ? AND day = ? AND prayer = ?")
                .bind(user_id)
                .bind(day.to_string())
                .bind(prayer.as_str())
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO completions (user_id, day, prayer, status) VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id, day, prayer) DO UPDATE SET status = excluded.status
            "#,
        )
        .bind(user_id)
        .bind(day.to_string())
        .bind(prayer.as_str())
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    /// Status of one prayer on one day; a missing record reads as `Unset`
    pub async fn get(
        &self,
        user_id: &str,
        day: NaiveDate,
        prayer: PrayerName,
    ) -> Result<CompletionStatus> {
        let row = sqlx::query(
            "SELECT status FROM completions WHERE user_id = ? AND day = ? AND prayer = ?",
        )
        .bind(user_id)
        .bind(day.to_string())
        .bind(prayer.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => row.get::<String, _>("status").parse(),
            None => Ok(CompletionStatus::Unset),
        }
    }
}
