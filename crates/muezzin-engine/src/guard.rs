//! Idempotency guard around one dispatch
//!
//! The marker is claimed before the gateway call and released again unless the
//! message was delivered, so a concurrent run cannot send the same stage twice
//! and a failed send is retried on a later tick.

use chrono::{DateTime, NaiveDate, Utc};
use muezzin_core::{MarkerKind, PrayerName, Result};
use muezzin_db::MarkersRepository;
use muezzin_push::DeliveryOutcome;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MarkerKey {
    pub user_id: String,
    pub kind: MarkerKind,
    pub prayer: PrayerName,
    pub day: NaiveDate,
}

impl MarkerKey {
    pub fn new(user_id: &str, kind: MarkerKind, prayer: PrayerName, day: NaiveDate) -> Self {
        Self {
            user_id: user_id.to_string(),
            kind,
            prayer,
            day,
        }
    }

    /// Returns false when another run already holds this key
    pub async fn claim(&self, markers: &MarkersRepository, now: DateTime<Utc>) -> Result<bool> {
        let claimed = markers
            .claim(&self.user_id, self.kind, self.prayer, self.day, now)
            .await?;
        if !claimed {
            debug!(
                user = %self.user_id,
                prayer = %self.prayer,
                kind = self.kind.as_str(),
                "Marker already held, skipping"
            );
        }
        Ok(claimed)
    }

    /// Give the key back so a later run can claim it
    pub async fn release(&self, markers: &MarkersRepository) -> Result<()> {
        markers
            .release(&self.user_id, self.kind, self.prayer, self.day)
            .await?;
        Ok(())
    }

    /// Keep the claim on delivery, drop it otherwise
    pub async fn settle(&self, markers: &MarkersRepository, outcome: &DeliveryOutcome) -> Result<()> {
        if !outcome.is_delivered() {
            self.release(markers).await?;
        }
        Ok(())
    }
}
