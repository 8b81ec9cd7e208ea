//! # bloodbank-cli: Operator CLI for the Blood Bank Stack
//!
//! Provides the `bloodbank` command-line interface.
//!
//! ## Subcommands
//!
//! - `bloodbank seed`: apply a YAML fixture of donations and requests.
//! - `bloodbank inventory`: print current stock.
//!
//! ```bash
//! bloodbank seed fixtures/dev.yaml --dry-run
//! bloodbank inventory --group O- --json
//! ```
//!
//! Both subcommands talk to the same storage the service uses: Postgres
//! when `DATABASE_URL` is set, otherwise a throwaway in-memory store.

pub mod inventory;
pub mod seed;

use std::sync::Arc;

use anyhow::{Context, Result};

use bloodbank_api::config::AppConfig;
use bloodbank_api::state::AppState;
use bloodbank_engine::LifecycleController;

/// Build a controller over the configured backend.
///
/// `in_memory` forces the in-memory store even when a database is
/// configured.
pub async fn controller_for(config: &AppConfig, in_memory: bool) -> Result<Arc<LifecycleController>> {
    if in_memory || config.database_url.is_none() {
        tracing::info!("using in-memory store; nothing will be persisted");
        return Ok(AppState::new().controller);
    }
    let pool = bloodbank_api::db::init_pool(config)
        .await
        .context("failed to connect to the database")?;
    Ok(AppState::from_config(config, pool).controller)
}
