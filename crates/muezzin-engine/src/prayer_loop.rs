//! Prayer-loop job
//!
//! Runs once a minute. For every user and every enabled prayer it resolves the
//! distance to the prayer time, picks the stage whose window contains it and
//! dispatches that stage at most once per day.

use chrono::{DateTime, Utc};
use muezzin_core::stage::{evaluate, PrayerMessage, StageInput};
use muezzin_core::time::{resolve, Resolution};
use muezzin_core::{marker_day, MarkerKind, PrayerEntry, UserRecord};
use muezzin_push::{DeliveryOutcome, PushMessage};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{EngineError, Result};
use crate::guard::MarkerKey;
use crate::quarantine::quarantine;
use crate::Engine;

/// Counts from one prayer-loop run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrayerLoopReport {
    pub users_scanned: usize,
    pub notifications_sent: usize,
    pub stale_tokens: usize,
    pub transient_failures: usize,
    pub errors: usize,
}

enum Dispatch {
    Sent,
    Stale,
    Transient,
    AlreadyClaimed,
}

impl Engine {
    /// Run one prayer-loop invocation at `now`
    pub async fn run_prayer_loop(&self, now: DateTime<Utc>) -> Result<PrayerLoopReport> {
        let scanned = self
            .db
            .users()
            .scan(None)
            .await
            .map_err(|e| EngineError::enumeration("users", e))?;

        let mut report = PrayerLoopReport::default();

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

            if let Err(e) = self.process_user(&user, now, &mut report).await {
                error!(user = %user.id, "Prayer loop failed for user: {}", e);
                report.errors += 1;
            }
        }

        info!(
            users = report.users_scanned,
            sent = report.notifications_sent,
            stale = report.stale_tokens,
            transient = report.transient_failures,
            errors = report.errors,
            "Prayer loop finished"
        );
        Ok(report)
    }

    async fn process_user(
        &self,
        user: &UserRecord,
        now: DateTime<Utc>,
        report: &mut PrayerLoopReport,
    ) -> Result<()> {
        let Some(token) = user.deliverable_token() else {
            debug!(user = %user.id, "No deliverable token");
            return Ok(());
        };
        if !user.notification_settings.any_enabled() {
            return Ok(());
        }
        if user.has_unknown_timezone() {
            warn!(
                user = %user.id,
                timezone = user.timezone.as_deref().unwrap_or_default(),
                "Unknown timezone, using UTC"
            );
        }

        for entry in user.prayers.iter().filter(|p| p.enabled) {
            let Some(resolution) = self.resolve_entry(user, entry, now)? else {
                continue;
            };

            match self.dispatch_if_due(user, token, entry, &resolution, now).await? {
                Some(Dispatch::Sent) => report.notifications_sent += 1,
                Some(Dispatch::Transient) => report.transient_failures += 1,
                Some(Dispatch::Stale) => {
                    report.stale_tokens += 1;
                    // Nothing else can reach this device
                    break;
                }
                Some(Dispatch::AlreadyClaimed) | None => {}
            }
        }

        Ok(())
    }

    /// Resolve one prayer, or `None` if it has no usable time
    fn resolve_entry(
        &self,
        user: &UserRecord,
        entry: &PrayerEntry,
        now: DateTime<Utc>,
    ) -> Result<Option<Resolution>> {
        if user.notification_settings.get(entry.name).is_off() {
            return Ok(None);
        }

        match resolve(&entry.time, user.tz(), now) {
            Ok(resolution) => {
                if resolution.is_degraded() {
                    debug!(
                        user = %user.id,
                        prayer = %entry.name,
                        "Using wall-clock prayer time (degraded)"
                    );
                }
                Ok(Some(resolution))
            }
            Err(e) if e.is_skippable_time() => {
                debug!(user = %user.id, prayer = %entry.name, "Skipping prayer: {}", e);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn dispatch_if_due(
        &self,
        user: &UserRecord,
        token: &str,
        entry: &PrayerEntry,
        resolution: &Resolution,
        now: DateTime<Utc>,
    ) -> Result<Option<Dispatch>> {
        let windows = &self.config.windows;

        // Cheap check before touching the store
        if windows.stage_for(resolution.delta).is_none() {
            return Ok(None);
        }

        let day = marker_day(now);
        let markers = self.db.markers();
        let sent_today = markers.sent_stages(&user.id, entry.name, day).await?;
        let completion = self
            .db
            .completions()
            .get(&user.id, resolution.local_date, entry.name)
            .await?;

        let input = StageInput {
            prayer: entry.name,
            setting: user.notification_settings.get(entry.name),
            delta: resolution.delta,
            completion,
            sent_today: &sent_today,
        };
        let Some(due) = evaluate(windows, &input).due() else {
            return Ok(None);
        };

        let key = MarkerKey::new(&user.id, MarkerKind::Stage(due.stage), entry.name, day);
        if !key.claim(&markers, now).await? {
            return Ok(Some(Dispatch::AlreadyClaimed));
        }

        let text = PrayerMessage::for_stage(due.stage, entry.name, windows);
        let message = PushMessage::notification(token, text.title, text.body)
            .with_adhan(due.adhan)
            .with_data("stage", due.stage.as_str())
            .with_data("prayer", entry.name.as_str())
            .with_data("adhan", due.adhan)
            .with_data("timestamp", now.to_rfc3339());

        let outcome = self.gateway.send(&message).await;
        key.settle(&markers, &outcome).await?;

        let dispatch = match outcome {
            DeliveryOutcome::Delivered => {
                info!(
                    user = %user.id,
                    prayer = %entry.name,
                    stage = %due.stage,
                    adhan = due.adhan,
                    degraded = resolution.is_degraded(),
                    "Notification delivered"
                );
                Dispatch::Sent
            }
            DeliveryOutcome::StaleRegistration { code } => {
                quarantine(&self.db, &user.id, &code, now).await?;
                Dispatch::Stale
            }
            DeliveryOutcome::TransientFailure { reason } => {
                warn!(
                    user = %user.id,
                    prayer = %entry.name,
                    stage = %due.stage,
                    "Transient delivery failure: {}",
                    reason
                );
                Dispatch::Transient
            }
        };
        Ok(Some(dispatch))
    }
}
