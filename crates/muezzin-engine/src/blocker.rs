//! Silent activation job
//!
//! Wakes the prayer-blocker feature on devices right after a prayer time by
//! sending a data-only message. Messages go out in batches.

use chrono::{DateTime, Utc};
use muezzin_core::time::resolve;
use muezzin_core::{marker_day, CompletionStatus, MarkerKind, PrayerEntry, PrayerTime, UserRecord};
use muezzin_db::UserFlag;
use muezzin_push::{DeliveryOutcome, PushMessage};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use crate::error::{EngineError, Result};
use crate::guard::MarkerKey;
use crate::quarantine::quarantine;
use crate::Engine;

/// Type tag the client listens for
pub const BLOCKER_ACTIVATE: &str = "BLOCKER_ACTIVATE";

/// Counts from one silent activation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockerReport {
    pub users_scanned: usize,
    pub activations_sent: usize,
    pub batches: usize,
    pub stale_tokens: usize,
    pub transient_failures: usize,
    pub errors: usize,
}

/// A claimed activation waiting for its batch
struct Activation {
    key: MarkerKey,
    message: PushMessage,
}

impl Engine {
    /// Run one silent activation invocation at `now`
    pub async fn run_blocker(&self, now: DateTime<Utc>) -> Result<BlockerReport> {
        let scanned = self
            .db
            .users()
            .scan(Some((UserFlag::PrayerBlockerEnabled, true)))
            .await
            .map_err(|e| EngineError::enumeration("blocker users", e))?;

        let mut report = BlockerReport::default();
        let mut pending = Vec::new();

        for row in scanned {
            report.users_scanned += 1;

            let user = match row.record {
                Ok(user) => user,
                Err(e) => {
                    error!(user = %row.id, "Skipping unreadable user record: {}", e);
                    report.errors += 1;
                    continue;
                }
            };

            match self.collect_activations(&user, now).await {
                Ok(mut activations) => pending.append(&mut activations),
                Err(e) => {
                    error!(user = %user.id, "Silent activation failed for user: {}", e);
                    report.errors += 1;
                }
            }
        }

        let mut quarantined = HashSet::new();
        for batch in pending.chunks(self.config.blocker.batch_size.max(1)) {
            let messages: Vec<PushMessage> = batch.iter().map(|a| a.message.clone()).collect();
            let outcomes = self.gateway.send_batch(&messages).await;
            report.batches += 1;

            for (activation, outcome) in batch.iter().zip(outcomes) {
                if let Err(e) = self
                    .settle_activation(activation, &outcome, now, &mut quarantined)
                    .await
                {
                    error!(user = %activation.key.user_id, "Failed to settle activation: {}", e);
                    report.errors += 1;
                }

                match outcome {
                    DeliveryOutcome::Delivered => report.activations_sent += 1,
                    DeliveryOutcome::StaleRegistration { .. } => report.stale_tokens += 1,
                    DeliveryOutcome::TransientFailure { reason } => {
                        warn!(
                            user = %activation.key.user_id,
                            prayer = %activation.key.prayer,
                            "Transient activation failure: {}",
                            reason
                        );
                        report.transient_failures += 1;
                    }
                }
            }
        }

        info!(
            users = report.users_scanned,
            sent = report.activations_sent,
            batches = report.batches,
            errors = report.errors,
            "Silent activation finished"
        );
        Ok(report)
    }

    /// Claim and build activations for prayers that just started.
    ///
    /// On failure every key claimed for this user is released again, so the
    /// prayers already collected are retried on the next tick.
    async fn collect_activations(
        &self,
        user: &UserRecord,
        now: DateTime<Utc>,
    ) -> Result<Vec<Activation>> {
        let Some(token) = user.deliverable_token() else {
            debug!(user = %user.id, "No deliverable token");
            return Ok(Vec::new());
        };

        let mut activations = Vec::new();
        if let Err(e) = self
            .claim_activations(user, token, now, &mut activations)
            .await
        {
            let markers = self.db.markers();
            for activation in &activations {
                if let Err(release_err) = activation.key.release(&markers).await {
                    error!(
                        user = %user.id,
                        prayer = %activation.key.prayer,
                        "Failed to release activation marker: {}",
                        release_err
                    );
                }
            }
            return Err(e);
        }
        Ok(activations)
    }

    async fn claim_activations(
        &self,
        user: &UserRecord,
        token: &str,
        now: DateTime<Utc>,
        activations: &mut Vec<Activation>,
    ) -> Result<()> {
        let window_secs = self.config.blocker.window_secs as f64;
        let day = marker_day(now);
        let markers = self.db.markers();

        for entry in user.prayers.iter().filter(|p| p.enabled && p.name.is_obligatory()) {
            let resolution = match resolve(&entry.time, user.tz(), now) {
                Ok(resolution) => resolution,
                Err(e) if e.is_skippable_time() => continue,
                Err(e) => return Err(e.into()),
            };

            let elapsed = resolution.delta_seconds();
            if !(0.0..=window_secs).contains(&elapsed) {
                continue;
            }

            let completion = self
                .db
                .completions()
                .get(&user.id, resolution.local_date, entry.name)
                .await?;
            if completion != CompletionStatus::Unset {
                continue;
            }

            let key = MarkerKey::new(&user.id, MarkerKind::BlockerActivate, entry.name, day);
            if !key.claim(&markers, now).await? {
                continue;
            }

            debug!(user = %user.id, prayer = %entry.name, elapsed, "Queueing silent activation");
            activations.push(Activation {
                key,
                message: activation_message(token, entry, &resolution.prayer_clock()),
            });
        }

        Ok(())
    }

    async fn settle_activation(
        &self,
        activation: &Activation,
        outcome: &DeliveryOutcome,
        now: DateTime<Utc>,
        quarantined: &mut HashSet<String>,
    ) -> Result<()> {
        activation.key.settle(&self.db.markers(), outcome).await?;

        if let DeliveryOutcome::StaleRegistration { code } = outcome {
            if quarantined.insert(activation.key.user_id.clone()) {
                quarantine(&self.db, &activation.key.user_id, code, now).await?;
            }
        }
        Ok(())
    }
}

fn activation_message(token: &str, entry: &PrayerEntry, clock: &str) -> PushMessage {
    let prayer_time = match &entry.time {
        PrayerTime::Instant(at) => at.to_rfc3339(),
        PrayerTime::WallClock(text) => text.clone(),
        PrayerTime::Unset => clock.to_string(),
    };

    PushMessage::data_only(token)
        .with_data("type", BLOCKER_ACTIVATE)
        .with_data("prayerId", entry.name.as_str())
        .with_data("prayerTime", prayer_time)
}
