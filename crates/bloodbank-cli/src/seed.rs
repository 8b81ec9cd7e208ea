//! # Seed Subcommand
//!
//! Applies a YAML fixture of donations and request submissions through the
//! lifecycle controller, so every domain rule applies to fixture data
//! exactly as it does to API traffic.
//!
//! ```yaml
//! inventory:
//!   - bank_id: 7d3c1f4e-0a6b-4a43-9b55-1f8f2b0c9e11
//!     blood_group: O-
//!     units: 12
//! requests:
//!   - recipient_id: 2b1e9d5a-6c4f-4f8e-8d7a-3c2b1a0f9e8d
//!     bank_id: 7d3c1f4e-0a6b-4a43-9b55-1f8f2b0c9e11
//!     blood_group: O-
//!     units: 2
//!     required_by: 2031-01-15
//!     purpose: trauma bay stock
//! ```
//!
//! Fixture values are test data, not defaults the service relies on.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Deserialize;

use bloodbank_api::config::AppConfig;
use bloodbank_core::{BankId, BloodGroup, RequestId};
use bloodbank_engine::{InventoryFilter, InventoryView, LifecycleController};
use bloodbank_state::RequestDraft;

/// Arguments for the `bloodbank seed` subcommand.
#[derive(Args, Debug)]
pub struct SeedArgs {
    /// Path to the fixture YAML file.
    #[arg(value_name = "FIXTURE_YAML")]
    pub fixture: PathBuf,

    /// Apply to a throwaway in-memory store and print the result.
    #[arg(long)]
    pub dry_run: bool,
}

/// A donation credit in a fixture.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DonationSeed {
    pub bank_id: BankId,
    pub blood_group: String,
    pub units: i64,
}

/// Parsed fixture file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFixture {
    /// Credits applied first, in file order.
    #[serde(default)]
    pub inventory: Vec<DonationSeed>,
    /// Submissions applied after the credits, in file order.
    #[serde(default)]
    pub requests: Vec<RequestDraft>,
}

/// What a seed run did.
#[derive(Debug)]
pub struct SeedReport {
    /// Donation entries credited.
    pub credited: usize,
    /// Ids of the submitted requests, in file order.
    pub submitted: Vec<RequestId>,
    /// Inventory after the run.
    pub inventory: InventoryView,
}

/// Read and parse a fixture file.
pub fn load_fixture(path: &Path) -> Result<SeedFixture> {
    if !path.exists() {
        bail!("fixture file not found: {}", path.display());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read fixture: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse fixture YAML: {}", path.display()))
}

/// Apply `fixture` through `controller`.
///
/// Stops at the first entry the domain rejects; entries before it stay
/// applied.
pub async fn apply_fixture(controller: &LifecycleController, fixture: SeedFixture) -> Result<SeedReport> {
    for (i, donation) in fixture.inventory.iter().enumerate() {
        let group: BloodGroup = donation
            .blood_group
            .parse()
            .with_context(|| format!("inventory[{i}]: invalid blood group"))?;
        controller
            .record_donation(donation.bank_id, group, donation.units)
            .await
            .with_context(|| format!("inventory[{i}]: donation rejected"))?;
    }

    let mut submitted = Vec::with_capacity(fixture.requests.len());
    for (i, draft) in fixture.requests.into_iter().enumerate() {
        let request = controller
            .submit_request(draft)
            .await
            .with_context(|| format!("requests[{i}]: submission rejected"))?;
        submitted.push(request.id);
    }

    let inventory = controller
        .ledger()
        .query(InventoryFilter::default())
        .await
        .context("failed to read back inventory")?;

    Ok(SeedReport {
        credited: fixture.inventory.len(),
        submitted,
        inventory,
    })
}

/// Execute the seed subcommand.
///
/// Returns exit code 0 on success. Invalid fixtures are errors.
pub async fn run_seed(args: &SeedArgs, config: &AppConfig) -> Result<u8> {
    let fixture = load_fixture(&args.fixture)?;
    let controller = crate::controller_for(config, args.dry_run).await?;
    let report = apply_fixture(&controller, fixture).await?;

    tracing::info!(
        credited = report.credited,
        submitted = report.submitted.len(),
        dry_run = args.dry_run,
        "fixture applied"
    );
    println!(
        "credited {} inventory entr{}, submitted {} request{}",
        report.credited,
        if report.credited == 1 { "y" } else { "ies" },
        report.submitted.len(),
        if report.submitted.len() == 1 { "" } else { "s" },
    );
    if args.dry_run || config.database_url.is_none() {
        print!("{}", crate::inventory::render_table(&report.inventory));
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloodbank_api::state::AppState;
    use bloodbank_core::InventoryKey;
    use std::io::Write;

    const BANK: &str = "7d3c1f4e-0a6b-4a43-9b55-1f8f2b0c9e11";

    fn fixture_file(yaml: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file
    }

    fn valid_yaml() -> String {
        format!(
            "inventory:
  - bank_id: {BANK}
    blood_group: O-
    units: 12
  - bank_id: {BANK}
    blood_group: a+
    units: 3
requests:
  - recipient_id: 2b1e9d5a-6c4f-4f8e-8d7a-3c2b1a0f9e8d
    bank_id: {BANK}
    blood_group: O-
    units: 2
    required_by: 2099-01-15
    purpose: trauma bay stock
"
        )
    }

    #[tokio::test]
    async fn applies_credits_then_requests() {
        let file = fixture_file(&valid_yaml());
        let fixture = load_fixture(file.path()).unwrap();
        let controller = AppState::new().controller;

        let report = apply_fixture(&controller, fixture).await.unwrap();
        assert_eq!(report.credited, 2);
        assert_eq!(report.submitted.len(), 1);
        assert_eq!(report.inventory.total_units(), 15);

        let bank: BankId = BANK.parse().unwrap();
        assert_eq!(
            controller
                .ledger()
                .balance(InventoryKey::new(bank, BloodGroup::APos))
                .await
                .unwrap(),
            3
        );
        // Seeding submits; it never approves, so stock is untouched.
        let request = controller.get_request(report.submitted[0]).await.unwrap();
        assert_eq!(request.status.as_str(), "pending");
    }

    #[tokio::test]
    async fn invalid_entry_names_its_position() {
        let yaml = format!(
            "inventory:
  - bank_id: {BANK}
    blood_group: O-
    units: 1
  - bank_id: {BANK}
    blood_group: O-
    units: 0
"
        );
        let file = fixture_file(&yaml);
        let fixture = load_fixture(file.path()).unwrap();
        let err = apply_fixture(&AppState::new().controller, fixture)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("inventory[1]"));
    }

    #[tokio::test]
    async fn past_required_by_is_rejected() {
        let yaml = valid_yaml().replace("2099-01-15", "2001-01-15");
        let file = fixture_file(&yaml);
        let fixture = load_fixture(file.path()).unwrap();
        let err = apply_fixture(&AppState::new().controller, fixture)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("requests[0]"));
    }

    #[test]
    fn unknown_fields_fail_to_parse() {
        let file = fixture_file("inventory: []\nbanks: []\n");
        assert!(load_fixture(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_fixture(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn empty_fixture_is_valid() {
        let file = fixture_file("{}\n");
        let fixture = load_fixture(file.path()).unwrap();
        assert!(fixture.inventory.is_empty());
        assert!(fixture.requests.is_empty());
    }

    #[tokio::test]
    async fn dry_run_succeeds() {
        let file = fixture_file(&valid_yaml());
        let args = SeedArgs {
            fixture: file.path().to_path_buf(),
            dry_run: true,
        };
        let code = run_seed(&args, &AppConfig::default()).await.unwrap();
        assert_eq!(code, 0);
    }
}
