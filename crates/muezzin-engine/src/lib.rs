//! Muezzin Engine - the dispatch jobs
//!
//! Three stateless jobs share one [`Engine`]:
//! - the prayer loop (per-minute reminders and at-time notifications)
//! - silent activation for the prayer blocker
//! - the like digest
//!
//! Every job takes `now` explicitly and keeps no state between runs; all
//! deduplication goes through persisted markers.

pub mod blocker;
mod error;
mod guard;
pub mod likes;
pub mod prayer_loop;
mod quarantine;

pub use blocker::BlockerReport;
pub use error::{EngineError, Result};
pub use likes::LikeDigestReport;
pub use prayer_loop::PrayerLoopReport;

use chrono::{DateTime, Duration, Utc};
use muezzin_core::stage::SentStages;
use muezzin_core::time::{resolve, Resolution};
use muezzin_core::{
    marker_day, CompletionStatus, EngineConfig, NotificationSetting, PrayerName, UserRecord,
};
use muezzin_db::{Database, MarkerRecord};
use muezzin_push::{DeliveryOutcome, ExpoGateway, PushGateway, PushMessage};
use std::sync::Arc;
use tracing::info;

/// Title of the operator test notification
pub const TEST_TITLE: &str = "Test notification";

/// Shared handle used by every job
#[derive(Clone)]
pub struct Engine {
    pub(crate) db: Database,
    pub(crate) gateway: Arc<dyn PushGateway>,
    pub(crate) config: EngineConfig,
}

/// How one prayer looks for a user right now
#[derive(Debug, Clone)]
pub struct PrayerStatus {
    pub prayer: PrayerName,
    pub enabled: bool,
    pub setting: NotificationSetting,
    /// Why the time could not be resolved, or the resolution itself
    pub resolution: std::result::Result<Resolution, String>,
    pub completion: CompletionStatus,
    pub sent_today: SentStages,
}

/// Everything an operator needs to debug one user's notifications
#[derive(Debug, Clone)]
pub struct UserStatus {
    pub user: UserRecord,
    pub prayers: Vec<PrayerStatus>,
    pub markers: Vec<MarkerRecord>,
}

impl Engine {
    pub fn new(db: Database, gateway: Arc<dyn PushGateway>, config: EngineConfig) -> Self {
        Self {
            db,
            gateway,
            config,
        }
    }

    /// Open the configured database and HTTP gateway
    pub async fn from_config(config: EngineConfig) -> Result<Self> {
        let db_path = config.database.resolved_path();
        let db = Database::new(&db_path).await?;
        info!("Database opened at {}", db_path.display());

        let gateway = ExpoGateway::new(&config.gateway)?;
        Ok(Self::new(db, Arc::new(gateway), config))
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Send a test message straight through the gateway, bypassing scheduling
    pub async fn send_test(&self, user_id: &str, now: DateTime<Utc>) -> Result<DeliveryOutcome> {
        let user = self
            .db
            .users()
            .get(user_id)
            .await?
            .ok_or_else(|| EngineError::UserNotFound(user_id.to_string()))?;
        let token = user
            .deliverable_token()
            .ok_or_else(|| EngineError::NoDeliverableToken(user_id.to_string()))?;

        let message = PushMessage::notification(
            token,
            TEST_TITLE,
            "If you can read this, prayer notifications will reach this device.",
        )
        .with_data("type", "TEST")
        .with_data("timestamp", now.to_rfc3339());

        let outcome = self.gateway.send(&message).await;
        if let DeliveryOutcome::StaleRegistration { code } = &outcome {
            quarantine::quarantine(&self.db, user_id, code, now).await?;
        }
        Ok(outcome)
    }

    /// Resolve every prayer of a user against `now` without dispatching
    pub async fn status(&self, user_id: &str, now: DateTime<Utc>) -> Result<UserStatus> {
        let user = self
            .db
            .users()
            .get(user_id)
            .await?
            .ok_or_else(|| EngineError::UserNotFound(user_id.to_string()))?;

        let day = marker_day(now);
        let tz = user.tz();
        let markers = self.db.markers();
        let completions = self.db.completions();

        let mut prayers = Vec::with_capacity(user.prayers.len());
        for entry in &user.prayers {
            let resolution = resolve(&entry.time, tz, now).map_err(|e| e.to_string());
            let completion_day = match &resolution {
                Ok(r) => r.local_date,
                Err(_) => now.with_timezone(&tz).date_naive(),
            };

            prayers.push(PrayerStatus {
                prayer: entry.name,
                enabled: entry.enabled,
                setting: user.notification_settings.get(entry.name),
                resolution,
                completion: completions.get(&user.id, completion_day, entry.name).await?,
                sent_today: markers.sent_stages(&user.id, entry.name, day).await?,
            });
        }

        let marker_records = markers.list_for_day(&user.id, day).await?;

        Ok(UserStatus {
            user,
            prayers,
            markers: marker_records,
        })
    }

    /// Drop markers older than yesterday (UTC). Returns the number removed.
    pub async fn prune_markers(&self, now: DateTime<Utc>) -> Result<u64> {
        let cutoff = marker_day(now - Duration::days(1));
        let removed = self.db.markers().prune_before(cutoff).await?;
        if removed > 0 {
            info!("Pruned {} dispatch markers before {}", removed, cutoff);
        }
        Ok(removed)
    }
}
