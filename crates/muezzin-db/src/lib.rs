//! Muezzin Database - SQLite record store
//!
//! Holds the per-user records, completion records, idempotency markers and the
//! like-event queue. Each repository is a thin handle over the shared pool.

pub mod completions;
pub mod likes;
pub mod markers;
pub mod schema;
pub mod users;

use chrono::{DateTime, SecondsFormat, Utc};
use muezzin_core::{Error, Result};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::info;

pub use completions::CompletionsRepository;
pub use likes::LikesRepository;
pub use markers::{MarkerRecord, MarkersRepository};
pub use users::{ScannedUser, UserFlag, UserPatch, UsersRepository};

/// Database connection and operations
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    pub async fn new(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::DbError(e.to_string()))?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.display());
        info!("Connecting to database: {}", url);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .map_err(|e| Error::DbError(e.to_string()))?;

        // Registration tokens live here
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)) {
                tracing::warn!("Failed to set database file permissions: {}", e);
            }
        }

        sqlx::query(schema::SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| Error::DbError(e.to_string()))?;

        info!("Database initialized");
        Ok(Self { pool })
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get users repository
    pub fn users(&self) -> UsersRepository {
        UsersRepository::new(self.pool.clone())
    }

    /// Get completions repository
    pub fn completions(&self) -> CompletionsRepository {
        CompletionsRepository::new(self.pool.clone())
    }

    /// Get dispatch markers repository
    pub fn markers(&self) -> MarkersRepository {
        MarkersRepository::new(self.pool.clone())
    }

    /// Get like events repository
    pub fn likes(&self) -> LikesRepository {
        LikesRepository::new(self.pool.clone())
    }

    /// Close the database connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Fixed-width UTC timestamp, so stored values order lexicographically
pub(crate) fn encode_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_ts(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::db(format!("Bad timestamp '{}': {}", value, e)))
}

pub(crate) fn db_err(e: sqlx::Error) -> Error {
    Error::DbError(e.to_string())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Database;
    use tempfile::{tempdir, TempDir};

    // Return TempDir to keep it alive during test
    pub async fn setup_db() -> (Database, TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::new(&db_path).await.unwrap();
        (db, dir)
    }
}
