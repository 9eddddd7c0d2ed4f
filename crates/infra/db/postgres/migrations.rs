use std::sync::Arc;

use anyhow::{Result, anyhow};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tokio::task;
use tracing::info;

use super::postgres_connection::PgPoolSquad;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Applies pending migrations and returns how many ran.
pub async fn run_migrations(db_pool: Arc<PgPoolSquad>) -> Result<usize> {
    task::spawn_blocking(move || -> Result<usize> {
        let mut conn = db_pool.get()?;

        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|err| anyhow!("failed to apply migrations: {err}"))?;

        for version in &applied {
            info!(%version, "migrations: applied");
        }

        Ok(applied.len())
    })
    .await?
}
