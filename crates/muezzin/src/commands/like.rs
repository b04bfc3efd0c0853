//! Like command implementation

use anyhow::Result;
use chrono::Utc;
use std::path::Path;

use crate::cli::LikeArgs;
use crate::output::print_success_json;

pub async fn execute(config_path: Option<&Path>, args: LikeArgs) -> Result<()> {
    let engine = super::open_engine(config_path).await?;
    let created_at = args.at.unwrap_or_else(Utc::now);

    let id = engine
        .enqueue_like(&args.post, &args.recipient, &args.actor, created_at)
        .await;
    engine.db().close().await;
    let id = id?;

    let due_at = created_at + engine.config().likes.deferral();
    print_success_json(
        &format!(
            "Queued like {} from {} on {} (due {})",
            id,
            args.actor,
            args.post,
            due_at.to_rfc3339()
        ),
        Some(id),
    );
    Ok(())
}
