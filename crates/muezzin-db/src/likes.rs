//! Like events repository - the deferred like queue

use chrono::{DateTime, Duration, Utc};
use muezzin_core::{LikeEvent, Result};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};

use crate::{db_err, decode_ts, encode_ts};

/// Repository for like events
pub struct LikesRepository {
    pool: SqlitePool,
}

impl LikesRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Queue a like; it becomes due `deferral` after `created_at`
    pub async fn enqueue(
        &self,
        target_id: &str,
        recipient_id: &str,
        actor_display_name: &str,
        created_at: DateTime<Utc>,
        deferral: Duration,
    ) -> Result<i64> {
        let due_at = created_at + deferral;

        let result = sqlx::query(
            r#"
            INSERT INTO like_events (target_id, recipient_id, actor_display_name, created_at, due_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(target_id)
        .bind(recipient_id)
        .bind(actor_display_name)
        .bind(encode_ts(created_at))
        .bind(encode_ts(due_at))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(result.last_insert_rowid())
    }

    /// Unprocessed events with `due_at <= now`, oldest first
    pub async fn pending(&self, now: DateTime<Utc>) -> Result<Vec<LikeEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM like_events
            WHERE processed = 0 AND due_at <= ?
            ORDER BY due_at ASC, id ASC
            "#,
        )
        .bind(encode_ts(now))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_event).collect()
    }

    /// Flag events as processed in one statement
    pub async fn mark_processed(&self, ids: &[i64], at: DateTime<Utc>) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE like_events SET processed = 1, processed_at = ");
        qb.push_bind(encode_ts(at));
        qb.push(" WHERE id IN (");
        {
            let mut separated = qb.separated(", ");
            for id in ids {
                separated.push_bind(*id);
            }
        }
        qb.push(")");

        let result = qb.build().execute(&self.pool).await.map_err(db_err)?;
        Ok(result.rows_affected())
    }

    pub async fn get(&self, id: i64) -> Result<Option<LikeEvent>> {
        let row = sqlx::query("SELECT * FROM like_events WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(row_to_event).transpose()
    }

    /// Number of events not yet processed, due or not
    pub async fn count_unprocessed(&self) -> Result<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM like_events WHERE processed = 0")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(row.0 as u64)
    }
}

fn row_to_event(row: &SqliteRow) -> Result<LikeEvent> {
    let created_at: String = row.get("created_at");
    let due_at: String = row.get("due_at");
    let processed: i64 = row.get("processed");

    Ok(LikeEvent {
        id: row.get("id"),
        target_id: row.get("target_id"),
        recipient_id: row.get("recipient_id"),
        actor_display_name: row.get("actor_display_name"),
        created_at: decode_ts(&created_at)?,
        due_at: decode_ts(&due_at)?,
        processed: processed != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_db;
    use chrono::TimeZone;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_enqueue_defers() {
        let (db, _dir) = setup_db().await;
        let likes = db.likes();

        let id = likes
            .enqueue("post-1", "amina", "Bilal", base(), Duration::minutes(30))
            .await
            .unwrap();

        let event = likes.get(id).await.unwrap().unwrap();
        assert_eq!(event.due_at, base() + Duration::minutes(30));
        assert!(!event.processed);

        // Not yet due
        let pending = likes.pending(base() + Duration::minutes(29)).await.unwrap();
        assert!(pending.is_empty());

        let pending = likes.pending(base() + Duration::minutes(30)).await.unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn test_pending_is_ordered() {
        let (db, _dir) = setup_db().await;
        let likes = db.likes();

        likes
            .enqueue("post-1", "amina", "Late", base() + Duration::minutes(5), Duration::zero())
            .await
            .unwrap();
        likes
            .enqueue("post-1", "amina", "Early", base(), Duration::zero())
            .await
            .unwrap();

        let pending = likes.pending(base() + Duration::hours(1)).await.unwrap();
        let names: Vec<_> = pending.iter().map(|e| e.actor_display_name.as_str()).collect();
        assert_eq!(names, vec!["Early", "Late"]);
    }

    #[tokio::test]
    async fn test_mark_processed() {
        let (db, _dir) = setup_db().await;
        let likes = db.likes();

        let a = likes.enqueue("p", "amina", "A", base(), Duration::zero()).await.unwrap();
        let b = likes.enqueue("p", "amina", "B", base(), Duration::zero()).await.unwrap();
        let c = likes.enqueue("p", "amina", "C", base(), Duration::zero()).await.unwrap();

        let marked = likes.mark_processed(&[a, c], base()).await.unwrap();
        assert_eq!(marked, 2);
        assert_eq!(likes.mark_processed(&[], base()).await.unwrap(), 0);

        let pending = likes.pending(base()).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, b);
        assert_eq!(likes.count_unprocessed().await.unwrap(), 1);
        assert!(likes.get(a).await.unwrap().unwrap().processed);
    }
}
