use std::path::Path;

use anyhow::Context;
use tracing::{info, warn};

use crate::users::{
    dto::{CreateUserRequest, ListQuery},
    services::UserService,
};

pub fn parse_seed(json: &str) -> anyhow::Result<Vec<CreateUserRequest>> {
    serde_json::from_str(json).context("parse seed users")
}

/// Inserts `users` through the create path when the table is empty. Returns how many were inserted.
pub async fn seed_if_empty(
    service: &UserService,
    users: Vec<CreateUserRequest>,
) -> anyhow::Result<usize> {
    let existing = service
        .list(ListQuery::default())
        .await
        .context("count existing users")?
        .count;
    if existing > 0 {
        info!(existing, "users table already populated");
        return Ok(0);
    }

    let mut inserted = 0;
    for user in users {
        let email = user.email.clone();
        match service.create(user).await {
            Ok(_) => inserted += 1,
            Err(e) => warn!(error = %e, %email, "seed user skipped"),
        }
    }
    info!(inserted, "users table populated");
    Ok(inserted)
}

pub async fn seed_from_file(service: &UserService, path: &Path) -> anyhow::Result<usize> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    seed_if_empty(service, parse_seed(&raw)?).await
}
