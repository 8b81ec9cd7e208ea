//! # Database Persistence Layer
//!
//! Postgres persistence via SQLx.
//!
//! The database is **optional**. When `DATABASE_URL` is set, requests and
//! inventory are stored in Postgres through [`PgStore`]. When absent, the
//! service runs on the in-memory store and state does not survive a
//! restart.
//!
//! - [`inventory`]: the `inventory` table, one row per (bank, blood group).
//! - [`requests`]: the `blood_requests` table.
//!
//! Integrity rules live in both places: the engine validates before it
//! writes, and the schema's CHECK constraints refuse what slips past.

pub mod inventory;
pub mod requests;
mod store;

pub use store::PgStore;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::AppConfig;

/// Initialize the connection pool and run migrations.
///
/// Returns `None` if no database URL is configured (in-memory mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool(config: &AppConfig) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!(
            "DATABASE_URL not set; running in-memory only. State will not survive restarts."
        );
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(config.storage_timeout)
        .connect(url)
        .await?;

    tracing::info!(
        max_connections = config.database_max_connections,
        "connected to PostgreSQL"
    );

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    Ok(Some(pool))
}

/// Round-trip a trivial query. Used by the readiness probe.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
