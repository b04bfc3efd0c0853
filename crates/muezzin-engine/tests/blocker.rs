mod common;

use chrono::NaiveDate;
use common::*;
use muezzin_core::{
    CompletionStatus, MarkerKind, NotificationSetting, PrayerName, PrayerTime, UserRecord,
};
use muezzin_push::mock::MockGateway;
use muezzin_push::DeliveryOutcome;

fn may_first() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()
}

fn blocker_user(id: &str) -> UserRecord {
    // Blocker activation does not depend on notification settings
    let mut user = with_prayer(
        user(id, "UTC"),
        PrayerName::Dhuhr,
        PrayerTime::Instant(utc(2026, 5, 1, 12, 0, 0)),
        NotificationSetting::Off,
    );
    user.prayer_blocker_enabled = true;
    user
}

#[tokio::test]
async fn test_activations_are_batched_by_one_hundred() {
    let h = harness().await;
    for i in 0..150 {
        h.db.users()
            .upsert(&blocker_user(&format!("user-{:03}", i)))
            .await
            .unwrap();
    }

    let report = h.engine.run_blocker(utc(2026, 5, 1, 12, 1, 0)).await.unwrap();
    assert_eq!(report.users_scanned, 150);
    assert_eq!(report.activations_sent, 150);
    assert_eq!(report.batches, 2);
    assert_eq!(h.gateway.call_count(), 2);

    let messages = h.gateway.messages().await;
    assert_eq!(messages.len(), 150);
    assert!(messages.iter().all(|m| m.is_silent() && m.content_available));
    assert_eq!(messages[0].data["type"], "BLOCKER_ACTIVATE");
    assert_eq!(messages[0].data["prayerId"], "dhuhr");
}

#[tokio::test]
async fn test_activation_fires_once_per_prayer() {
    let h = harness().await;
    h.db.users().upsert(&blocker_user("amina")).await.unwrap();

    let first = h.engine.run_blocker(utc(2026, 5, 1, 12, 0, 5)).await.unwrap();
    let second = h.engine.run_blocker(utc(2026, 5, 1, 12, 1, 5)).await.unwrap();

    assert_eq!(first.activations_sent, 1);
    assert_eq!(second.activations_sent, 0);
    assert_eq!(second.batches, 0);
    assert_eq!(h.gateway.call_count(), 1);

    assert!(has_marker(&h, "amina", MarkerKind::BlockerActivate, PrayerName::Dhuhr, may_first()).await);
}

#[tokio::test]
async fn test_activation_window_bounds() {
    let h = harness().await;
    h.db.users().upsert(&blocker_user("amina")).await.unwrap();

    // Before the prayer and past the two-minute window
    for now in [utc(2026, 5, 1, 11, 59, 30), utc(2026, 5, 1, 12, 2, 30)] {
        let report = h.engine.run_blocker(now).await.unwrap();
        assert_eq!(report.activations_sent, 0, "unexpected activation at {}", now);
    }

    let report = h.engine.run_blocker(utc(2026, 5, 1, 12, 2, 0)).await.unwrap();
    assert_eq!(report.activations_sent, 1);
}

#[tokio::test]
async fn test_skips_completed_sunrise_and_disabled_users() {
    let h = harness().await;

    h.db.users().upsert(&blocker_user("done")).await.unwrap();
    h.db.completions()
        .set(
            "done",
            NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            PrayerName::Dhuhr,
            CompletionStatus::Completed,
        )
        .await
        .unwrap();

    let mut sunrise = with_prayer(
        user("sunrise", "UTC"),
        PrayerName::Sunrise,
        PrayerTime::Instant(utc(2026, 5, 1, 12, 0, 0)),
        NotificationSetting::Notification,
    );
    sunrise.prayer_blocker_enabled = true;
    h.db.users().upsert(&sunrise).await.unwrap();

    let mut opted_out = blocker_user("opted-out");
    opted_out.prayer_blocker_enabled = false;
    h.db.users().upsert(&opted_out).await.unwrap();

    let mut stale = blocker_user("stale");
    stale.token_stale = true;
    h.db.users().upsert(&stale).await.unwrap();

    let report = h.engine.run_blocker(utc(2026, 5, 1, 12, 0, 30)).await.unwrap();
    assert_eq!(report.users_scanned, 3);
    assert_eq!(report.activations_sent, 0);
    assert_eq!(h.gateway.call_count(), 0);
}

#[tokio::test]
async fn test_stale_activation_quarantines_and_releases() {
    let gateway = MockGateway::new()
        .with_token_outcome(token_for("dead"), DeliveryOutcome::stale("DeviceNotRegistered"));
    let h = harness_with(gateway).await;
    h.db.users().upsert(&blocker_user("dead")).await.unwrap();
    h.db.users().upsert(&blocker_user("alive")).await.unwrap();

    let report = h.engine.run_blocker(utc(2026, 5, 1, 12, 0, 30)).await.unwrap();
    assert_eq!(report.activations_sent, 1);
    assert_eq!(report.stale_tokens, 1);
    assert_eq!(report.batches, 1);

    let dead = h.db.users().get("dead").await.unwrap().unwrap();
    assert!(dead.token_stale);

    assert!(!has_marker(&h, "dead", MarkerKind::BlockerActivate, PrayerName::Dhuhr, may_first()).await);
}

#[tokio::test]
async fn test_transient_activation_is_retried_within_window() {
    let h = harness().await;
    h.gateway.push_outcome(DeliveryOutcome::transient("blip")).await;
    h.db.users().upsert(&blocker_user("amina")).await.unwrap();

    let first = h.engine.run_blocker(utc(2026, 5, 1, 12, 0, 10)).await.unwrap();
    assert_eq!(first.transient_failures, 1);

    let second = h.engine.run_blocker(utc(2026, 5, 1, 12, 1, 10)).await.unwrap();
    assert_eq!(second.activations_sent, 1);
}

#[tokio::test]
async fn test_failed_user_releases_claimed_activations() {
    let h = harness().await;
    let record = with_prayer(
        blocker_user("amina"),
        PrayerName::Asr,
        PrayerTime::Instant(utc(2026, 5, 1, 12, 0, 0)),
        NotificationSetting::Off,
    );
    h.db.users().upsert(&record).await.unwrap();

    // Dhuhr is claimed first, then the unreadable Asr completion fails the user
    sqlx::query(
        "INSERT INTO completions (user_id, day, prayer, status) VALUES ('amina', '2026-05-01', 'asr', 'bogus')",
    )
    .execute(h.db.pool())
    .await
    .unwrap();

    let first = h.engine.run_blocker(utc(2026, 5, 1, 12, 0, 10)).await.unwrap();
    assert_eq!(first.errors, 1);
    assert_eq!(first.activations_sent, 0);
    assert_eq!(h.gateway.call_count(), 0);
    assert!(!has_marker(&h, "amina", MarkerKind::BlockerActivate, PrayerName::Dhuhr, may_first()).await);

    sqlx::query("DELETE FROM completions")
        .execute(h.db.pool())
        .await
        .unwrap();

    let second = h.engine.run_blocker(utc(2026, 5, 1, 12, 1, 10)).await.unwrap();
    assert_eq!(second.errors, 0);
    assert_eq!(second.activations_sent, 2);

    let messages = h.gateway.messages().await;
    assert!(messages.iter().any(|m| m.data["prayerId"] == "dhuhr"));
    assert!(messages.iter().any(|m| m.data["prayerId"] == "asr"));
}
