//! Import command implementation

use anyhow::{anyhow, bail, Context, Result};
use muezzin_core::{ConfigFormat, UserRecord};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::output::{print_info, print_success_json};

/// Accepted document shapes: `{ users = [...] }` or a bare list
#[derive(Deserialize)]
#[serde(untagged)]
enum ImportDoc {
    Wrapped { users: Vec<UserRecord> },
    Bare(Vec<UserRecord>),
}

/// Read and check user records from a JSON, YAML or TOML file
pub fn read_users(path: &Path) -> Result<Vec<UserRecord>> {
    let format = ConfigFormat::from_path(path).ok_or_else(|| {
        anyhow!(
            "Unsupported file extension: {}. Expected .toml, .yaml, .yml, or .json",
            path.display()
        )
    })?;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let users = match format.parse::<ImportDoc>(&content)? {
        ImportDoc::Wrapped { users } | ImportDoc::Bare(users) => users,
    };

    let mut seen = HashSet::new();
    for user in &users {
        if user.id.trim().is_empty() {
            bail!("User record with an empty id");
        }
        if !seen.insert(user.id.as_str()) {
            bail!("Duplicate user id: {}", user.id);
        }
    }

    Ok(users)
}

pub async fn execute(config_path: Option<&Path>, file: &Path) -> Result<()> {
    let users = read_users(file)?;
    let engine = super::open_engine(config_path).await?;
    let repo = engine.db().users();

    let mut imported = 0usize;
    for user in &users {
        if user.has_unknown_timezone() {
            print_info(&format!(
                "{}: unknown timezone '{}', UTC will be used",
                user.id,
                user.timezone.as_deref().unwrap_or_default()
            ));
        }
        if let Err(e) = repo.upsert(user).await {
            engine.db().close().await;
            return Err(e).with_context(|| format!("Failed to import user {}", user.id));
        }
        imported += 1;
    }

    engine.db().close().await;
    print_success_json(
        &format!("Imported {} users from {}", imported, file.display()),
        Some(imported),
    );
    Ok(())
}
