//! Stale token quarantine

use chrono::{DateTime, Utc};
use muezzin_core::Result;
use muezzin_db::{Database, UserPatch};
use tracing::warn;

/// Flag a user's registration token as stale so no job delivers to it again
/// until the client registers a fresh one
pub(crate) async fn quarantine(
    db: &Database,
    user_id: &str,
    error_code: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    warn!(user = %user_id, code = %error_code, "Quarantining stale registration token");
    db.users()
        .update(user_id, &UserPatch::quarantine(error_code, now))
        .await?;
    Ok(())
}
