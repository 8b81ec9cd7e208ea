//! # bloodbank CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bloodbank_api::config::AppConfig;
use bloodbank_cli::inventory::{run_inventory, InventoryArgs};
use bloodbank_cli::seed::{run_seed, SeedArgs};

/// Blood bank operator CLI.
///
/// Seeds inventory and requests from fixtures and inspects stock. Storage
/// is selected from the same environment variables as the service.
#[derive(Parser, Debug)]
#[command(name = "bloodbank", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply a YAML fixture of donations and request submissions.
    Seed(SeedArgs),

    /// Print current inventory.
    Inventory(InventoryArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::from(2);
        }
    };

    let result = match cli.command {
        Commands::Seed(args) => run_seed(&args, &config).await,
        Commands::Inventory(args) => run_inventory(&args, &config).await,
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
