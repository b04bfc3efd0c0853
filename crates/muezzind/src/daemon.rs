//! Job scheduling for the daemon
//!
//! Each job gets its own interval. A tick that overruns its period drops the
//! ticks it missed instead of firing them in a burst.

use anyhow::Result;
use chrono::Utc;
use muezzin_core::{EngineConfig, ScheduleConfig};
use muezzin_engine::Engine;
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{error, info, warn};

/// How often old dispatch markers are pruned
const PRUNE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Main daemon struct
pub struct Daemon {
    engine: Engine,
    schedule: ScheduleConfig,
}

fn job_interval(period: Duration) -> Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

impl Daemon {
    /// Create a new daemon instance
    pub async fn new(config: EngineConfig) -> Result<Self> {
        let schedule = config.schedule.clone();
        let engine = Engine::from_config(config).await?;
        Ok(Self { engine, schedule })
    }

    /// Run the job loop until cancelled
    pub async fn run(&self) -> Result<()> {
        let mut prayer = job_interval(Duration::from_secs(self.schedule.prayer_interval_secs));
        let mut blocker = job_interval(Duration::from_secs(self.schedule.blocker_interval_secs));
        let mut likes = job_interval(Duration::from_secs(self.schedule.like_interval_secs));
        let mut prune = job_interval(PRUNE_INTERVAL);

        info!(
            prayer_secs = self.schedule.prayer_interval_secs,
            blocker_secs = self.schedule.blocker_interval_secs,
            like_secs = self.schedule.like_interval_secs,
            "Daemon running"
        );

        loop {
            tokio::select! {
                _ = prayer.tick() => self.prayer_tick().await,
                _ = blocker.tick() => self.blocker_tick().await,
                _ = likes.tick() => self.likes_tick().await,
                _ = prune.tick() => self.prune_tick().await,
            }
        }
    }

    async fn prayer_tick(&self) {
        match self.engine.run_prayer_loop(Utc::now()).await {
            Ok(report) if report.errors > 0 => {
                warn!("Prayer loop finished with {} per-user errors", report.errors)
            }
            Ok(_) => {}
            Err(e) => error!("Prayer loop aborted: {}", e),
        }
    }

    async fn blocker_tick(&self) {
        match self.engine.run_blocker(Utc::now()).await {
            Ok(report) if report.errors > 0 => {
                warn!("Silent activation finished with {} per-user errors", report.errors)
            }
            Ok(_) => {}
            Err(e) => error!("Silent activation aborted: {}", e),
        }
    }

    async fn likes_tick(&self) {
        match self.engine.run_likes(Utc::now()).await {
            Ok(report) if report.errors > 0 => {
                warn!("Like digest finished with {} errors", report.errors)
            }
            Ok(_) => {}
            Err(e) => error!("Like digest aborted: {}", e),
        }
    }

    async fn prune_tick(&self) {
        if let Err(e) = self.engine.prune_markers(Utc::now()).await {
            error!("Failed to prune dispatch markers: {}", e);
        }
    }

    /// Close the database pool
    pub async fn shutdown(&self) {
        self.engine.db().close().await;
    }
}
