pub mod axum_http;
pub mod config;
pub mod usecases;

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use crates::infra::db::postgres::{
    migrations,
    postgres_connection::{self, PoolSettings},
};
use tracing::info;

pub async fn run() -> Result<()> {
    let dotenvy_env = config::config_loader::load()?;
    crates::observability::init_observability("backend", &dotenvy_env.log.level)?;
    info!("ENV has been loaded");

    let pool_settings = PoolSettings {
        max_connections: dotenvy_env.database.max_connections,
        connection_timeout: Duration::from_secs(dotenvy_env.database.connection_timeout),
    };
    let postgres_pool = Arc::new(postgres_connection::establish_connection(
        &dotenvy_env.database.url,
        &pool_settings,
    )?);
    info!("Postgres connection has been established");

    let applied = migrations::run_migrations(Arc::clone(&postgres_pool)).await?;
    info!(applied, "Database migrations are up to date");

    axum_http::http_serve::start(Arc::new(dotenvy_env), postgres_pool).await?;

    info!("Backend has shut down");
    Ok(())
}
