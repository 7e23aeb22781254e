//! Pools for the users store, and the one-shot setup behind `db-init`.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, PgConnection, PgPool};
use tracing::info;

use crate::config::DbConfig;
use crate::models::SubscriptionTier;
use crate::queries::users;

/// Migrations embedded at compile time from `crates/turfquote-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
}

/// Connect now. CLI user commands fail fast on a bad URL or a down server.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    pool_options()
        .connect(&config.database_url)
        .await
        .with_context(|| format!("failed to connect to database at {}", config.database_url))
}

/// Connect on first use, so `serve` can answer pricing routes while the
/// database is unreachable.
pub fn create_lazy_pool(config: &DbConfig) -> Result<PgPool> {
    pool_options()
        .connect_lazy(&config.database_url)
        .with_context(|| format!("invalid database URL {}", config.database_url))
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to run database migrations")?;
    info!(migrations = MIGRATOR.iter().count(), "schema up to date");
    Ok(())
}

/// Outcome of [`prepare_database`], printed by `db-init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupReport {
    pub database: String,
    /// The database did not exist and was created.
    pub created: bool,
    /// Embedded migrations known to this build.
    pub migrations: usize,
    pub users_by_tier: Vec<(SubscriptionTier, i64)>,
}

/// Create the database if needed, migrate it, and count users per tier.
pub async fn prepare_database(config: &DbConfig) -> Result<SetupReport> {
    let name = checked_database_name(config)?;
    let created = create_database_if_missing(config, name).await?;

    let pool = create_pool(config).await?;
    let result = async {
        run_migrations(&pool).await?;
        users::count_by_tier(&pool).await
    }
    .await;
    pool.close().await;

    Ok(SetupReport {
        database: name.to_owned(),
        created,
        migrations: MIGRATOR.iter().count(),
        users_by_tier: result?,
    })
}

/// The target database name, limited to characters safe to splice into
/// `CREATE DATABASE`, which takes no bind parameters.
fn checked_database_name(config: &DbConfig) -> Result<&str> {
    let name = config
        .database_name()
        .context("could not determine database name from URL")?;
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("database name {name:?} contains invalid characters");
    }
    Ok(name)
}

async fn create_database_if_missing(config: &DbConfig, name: &str) -> Result<bool> {
    let maintenance_url = config.maintenance_url();
    let mut conn = PgConnection::connect(&maintenance_url)
        .await
        .with_context(|| format!("failed to connect to maintenance database at {maintenance_url}"))?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(name)
            .fetch_one(&mut conn)
            .await
            .context("failed to query pg_database")?;

    if !exists {
        sqlx::raw_sql(&format!("CREATE DATABASE {name}"))
            .execute(&mut conn)
            .await
            .with_context(|| format!("failed to create database {name}"))?;
        info!(db = name, "database created");
    }

    conn.close().await.context("failed to close maintenance connection")?;
    Ok(!exists)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_name_accepts_plain_identifiers() {
        let cfg = DbConfig::new("postgresql://localhost:5432/turf_quote2?sslmode=require");
        assert_eq!(checked_database_name(&cfg).unwrap(), "turf_quote2");
    }

    #[test]
    fn checked_name_rejects_injection() {
        let cfg = DbConfig::new("postgresql://localhost:5432/lawns;DROP");
        let err = checked_database_name(&cfg).unwrap_err();
        assert!(err.to_string().contains("invalid characters"));
    }

    #[test]
    fn checked_name_requires_a_path() {
        let cfg = DbConfig::new("postgresql://localhost:5432/");
        assert!(checked_database_name(&cfg).is_err());
    }
}
