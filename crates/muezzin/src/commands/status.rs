//! Status command implementation

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::Path;

use crate::output::print_user_status;

pub async fn execute(
    config_path: Option<&Path>,
    user_id: &str,
    at: Option<DateTime<Utc>>,
) -> Result<()> {
    let engine = super::open_engine(config_path).await?;
    let now = at.unwrap_or_else(Utc::now);

    let status = engine.status(user_id, now).await;
    engine.db().close().await;

    print_user_status(&status?, now);
    Ok(())
}
