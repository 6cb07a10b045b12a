use anyhow::Context;
use sqlx::{migrate::MigrateDatabase, postgres::PgPoolOptions, PgPool, Postgres};
use tracing::info;

use crate::config::DatabaseConfig;

/// Creates the database named in the URL when the server does not have it yet.
pub async fn ensure_database(url: &str) -> anyhow::Result<()> {
    if !Postgres::database_exists(url)
        .await
        .context("check database exists")?
    {
        Postgres::create_database(url)
            .await
            .context("create database")?;
        info!("database created");
    }
    Ok(())
}

pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<PgPool> {
    ensure_database(&cfg.url).await?;
    let db = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .connect(&cfg.url)
        .await
        .context("connect to database")?;
    info!(max_connections = cfg.max_connections, "database connected");
    Ok(db)
}

/// Creates the `users` table if missing.
pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    Ok(())
}
