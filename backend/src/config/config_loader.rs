use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use crates::observability::parse_level;
use url::Url;

use super::config_model::{BackendServer, Database, DotEnvyConfig, Log};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    load_from(|key| std::env::var(key).ok())
}

pub fn load_from<F>(lookup: F) -> Result<DotEnvyConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let backend_server = BackendServer {
        host: lookup("SERVER_HOST")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "0.0.0.0".to_string()),
        port: required(&lookup, "SERVER_PORT")?
            .parse()
            .context("SERVER_PORT is invalid")?,
        body_limit: parse_or(&lookup, "SERVER_BODY_LIMIT", 1)?,
        timeout: parse_or(&lookup, "SERVER_TIMEOUT", 30)?,
    };
    if backend_server.body_limit_bytes().is_none() {
        bail!("SERVER_BODY_LIMIT is too large");
    }

    let database = Database {
        url: database_url(&lookup)?,
        max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
        connection_timeout: parse_or(&lookup, "DATABASE_CONNECTION_TIMEOUT", 5)?,
    };
    if database.max_connections == 0 {
        bail!("DATABASE_MAX_CONNECTIONS must be greater than zero");
    }

    let level = lookup("LOG_LEVEL")
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "info".to_string());
    if parse_level(&level).is_none() {
        bail!("LOG_LEVEL is invalid: {level}");
    }

    Ok(DotEnvyConfig {
        backend_server,
        database,
        log: Log { level },
    })
}

/// `DATABASE_URL` wins; otherwise the DSN is assembled from the `POSTGRES_*`
/// parts.
fn database_url<F>(lookup: &F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()) {
        return Ok(url);
    }

    let host = required(lookup, "POSTGRES_HOST")
        .context("either DATABASE_URL or POSTGRES_HOST must be set")?;
    let port: u16 = parse_or(lookup, "POSTGRES_PORT", 5432)?;
    let name = required(lookup, "POSTGRES_DB")?;
    let user = required(lookup, "POSTGRES_USER")?;
    let password = lookup("POSTGRES_PASSWORD")
        .or_else(|| lookup("DB_PASSWORD"))
        .unwrap_or_default();
    let ssl_mode = lookup("POSTGRES_SSL_MODE")
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "disable".to_string());

    let mut url = Url::parse(&format!("postgres://{host}:{port}"))
        .context("POSTGRES_HOST is invalid")?;
    // Url percent-encodes userinfo and path, so reserved characters survive.
    url.set_username(&user)
        .map_err(|_| anyhow!("POSTGRES_USER is invalid"))?;
    if !password.is_empty() {
        url.set_password(Some(&password))
            .map_err(|_| anyhow!("POSTGRES_PASSWORD is invalid"))?;
    }
    url.set_path(&name);
    url.query_pairs_mut().append_pair("sslmode", &ssl_mode);

    Ok(url.into())
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("{key} is invalid"))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} is invalid")),
        None => Ok(default),
    }
}
