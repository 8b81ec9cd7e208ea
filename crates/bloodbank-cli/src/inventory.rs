//! # Inventory Subcommand
//!
//! Prints stock per (bank, blood group) as a table or JSON.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use clap::Args;

use bloodbank_api::config::AppConfig;
use bloodbank_core::{BankId, BloodGroup};
use bloodbank_engine::{InventoryFilter, InventoryView};

/// Arguments for the `bloodbank inventory` subcommand.
#[derive(Args, Debug)]
pub struct InventoryArgs {
    /// Only show this bank.
    #[arg(long, value_name = "UUID")]
    pub bank: Option<BankId>,

    /// Only show this blood group (e.g. O-).
    #[arg(long, value_name = "GROUP")]
    pub group: Option<BloodGroup>,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Execute the inventory subcommand.
///
/// Returns exit code 0 on success.
pub async fn run_inventory(args: &InventoryArgs, config: &AppConfig) -> Result<u8> {
    if config.database_url.is_none() {
        tracing::warn!("DATABASE_URL not set; the in-memory store is always empty");
    }
    let controller = crate::controller_for(config, false).await?;
    let view = controller
        .ledger()
        .query(InventoryFilter {
            bank_id: args.bank,
            blood_group: args.group,
        })
        .await
        .context("failed to read inventory")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view.to_vec())?);
    } else {
        print!("{}", render_table(&view));
    }
    Ok(0)
}

/// Render a view as a fixed-width table with a total line.
pub fn render_table(view: &InventoryView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<36}  {:<5}  {:>10}  UPDATED", "BANK", "GROUP", "UNITS");
    for entry in view {
        let _ = writeln!(
            out,
            "{:<36}  {:<5}  {:>10}  {}",
            entry.bank_id.to_string(),
            entry.blood_group.as_str(),
            entry.units,
            entry.updated_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    let _ = writeln!(out, "{:<36}  {:<5}  {:>10}", "TOTAL", "", view.total_units());
    out
}
