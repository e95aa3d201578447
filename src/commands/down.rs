//! Migration DOWN (rollback)

use anyhow::{Result, bail};
use colored::*;

use crate::ledger::LedgerStore;
use crate::service::MigrationService;

/// Revert the current migration.
pub async fn migrate_down<L: LedgerStore>(service: &MigrationService<L>) -> Result<()> {
    let before = service.status().await?;
    println!(
        "{} {}",
        "Rolling back:".cyan().bold(),
        before.current_display().yellow()
    );

    let outcome = service.downgrade_one_step().await;
    if !outcome.is_success() {
        bail!(outcome.message);
    }

    let after = service.status().await?;
    println!("{}", format!("✓ {}", outcome.message).green().bold());
    println!("  Current revision: {}", after.current_display().cyan());
    Ok(())
}
