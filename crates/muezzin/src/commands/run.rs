//! Run command implementation

use anyhow::Result;
use chrono::Utc;
use std::path::Path;

use crate::cli::{Job, RunArgs};
use crate::output::print_report;

pub async fn execute(config_path: Option<&Path>, args: RunArgs) -> Result<()> {
    let engine = super::open_engine(config_path).await?;
    let now = args.at.unwrap_or_else(Utc::now);

    let result = match args.job {
        Job::PrayerLoop => {
            let report = engine.run_prayer_loop(now).await?;
            print_report("Prayer loop", &report)
        }
        Job::Blocker => {
            let report = engine.run_blocker(now).await?;
            print_report("Silent activation", &report)
        }
        Job::Likes => {
            let report = engine.run_likes(now).await?;
            print_report("Like digest", &report)
        }
    };

    engine.db().close().await;
    result
}
