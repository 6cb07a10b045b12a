use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub host: String,
    pub port: u16,
    /// JSON array of users inserted when the table is empty.
    pub seed_users_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source; `from_env` passes the process environment.
    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = match get("DATABASE_URL") {
            Some(url) => url,
            None => {
                let host = get("DB_HOST").unwrap_or_else(|| "localhost".into());
                let port = get("DB_PORT").unwrap_or_else(|| "5432".into());
                let user = get("DB_USER").context("DATABASE_URL or DB_USER must be set")?;
                let password = get("DB_PASSWORD").unwrap_or_default();
                let name = get("DB_NAME").context("DATABASE_URL or DB_NAME must be set")?;
                format!("postgres://{}:{}@{}:{}/{}", user, password, host, port, name)
            }
        };

        let database = DatabaseConfig {
            url,
            max_connections: get("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(10),
        };

        let port = match get("APP_PORT") {
            Some(v) => v.parse::<u16>().with_context(|| format!("invalid APP_PORT {v:?}"))?,
            None => 3000,
        };

        Ok(Self {
            database,
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            seed_users_path: get("SEED_USERS_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}
