//! Like digest job
//!
//! Collapses due likes into one notification per (post, recipient, window).
//! Windows are marked processed whether or not the send worked, so a broken
//! recipient never blocks the queue.

use chrono::{DateTime, Utc};
use muezzin_core::digest::{build_windows, DigestWindow, DIGEST_TITLE};
use muezzin_push::{DeliveryOutcome, PushMessage};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{EngineError, Result};
use crate::quarantine::quarantine;
use crate::Engine;

/// Counts from one like digest run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeDigestReport {
    pub events_scanned: usize,
    pub windows: usize,
    pub digests_sent: usize,
    pub events_processed: usize,
    pub errors: usize,
}

impl Engine {
    /// Run one like digest invocation at `now`
    pub async fn run_likes(&self, now: DateTime<Utc>) -> Result<LikeDigestReport> {
        let events = self
            .db
            .likes()
            .pending(now)
            .await
            .map_err(|e| EngineError::enumeration("like events", e))?;

        let mut report = LikeDigestReport {
            events_scanned: events.len(),
            ..Default::default()
        };

        for window in build_windows(events, self.config.likes.window()) {
            report.windows += 1;

            match self.deliver_digest(&window, now).await {
                Ok(true) => report.digests_sent += 1,
                Ok(false) => {}
                Err(e) => {
                    error!(
                        recipient = %window.recipient_id,
                        post = %window.target_id,
                        "Like digest failed: {}",
                        e
                    );
                    report.errors += 1;
                }
            }

            match self.db.likes().mark_processed(&window.event_ids(), now).await {
                Ok(count) => report.events_processed += count as usize,
                Err(e) => {
                    error!(post = %window.target_id, "Failed to mark likes processed: {}", e);
                    report.errors += 1;
                }
            }
        }

        info!(
            events = report.events_scanned,
            windows = report.windows,
            sent = report.digests_sent,
            errors = report.errors,
            "Like digest finished"
        );
        Ok(report)
    }

    /// Send one digest. Returns whether it was delivered.
    async fn deliver_digest(&self, window: &DigestWindow, now: DateTime<Utc>) -> Result<bool> {
        let recipient = self.db.users().get(&window.recipient_id).await?;
        let Some(token) = recipient.as_ref().and_then(|u| u.deliverable_token()) else {
            debug!(recipient = %window.recipient_id, "No deliverable token, dropping digest");
            return Ok(false);
        };

        let message = PushMessage::notification(
            token,
            DIGEST_TITLE,
            window.body(self.config.likes.batch_threshold),
        )
        .with_data("type", "PRAYER_LIKES")
        .with_data("postId", window.target_id.as_str())
        .with_data("count", window.len() as u64);

        match self.gateway.send(&message).await {
            DeliveryOutcome::Delivered => {
                debug!(
                    recipient = %window.recipient_id,
                    likes = window.len(),
                    "Like digest delivered"
                );
                Ok(true)
            }
            DeliveryOutcome::StaleRegistration { code } => {
                quarantine(&self.db, &window.recipient_id, &code, now).await?;
                Ok(false)
            }
            DeliveryOutcome::TransientFailure { reason } => {
                warn!(recipient = %window.recipient_id, "Like digest not delivered: {}", reason);
                Ok(false)
            }
        }
    }

    /// Queue a like for the deferred digest
    pub async fn enqueue_like(
        &self,
        target_id: &str,
        recipient_id: &str,
        actor_display_name: &str,
        created_at: DateTime<Utc>,
    ) -> Result<i64> {
        let id = self
            .db
            .likes()
            .enqueue(
                target_id,
                recipient_id,
                actor_display_name,
                created_at,
                self.config.likes.deferral(),
            )
            .await?;
        Ok(id)
    }
}
