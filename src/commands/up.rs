//! Migration UP

use anyhow::{Result, bail};
use colored::*;

use crate::ledger::LedgerStore;
use crate::service::MigrationService;

/// Apply all pending migrations.
pub async fn migrate_up<L: LedgerStore>(service: &MigrationService<L>) -> Result<()> {
    let before = service.status().await?;
    if before.is_up_to_date {
        println!("{}", "No migrations to apply.".green());
        return Ok(());
    }

    println!(
        "{} {} migration(s) to apply",
        "Found:".cyan(),
        before.pending
    );

    let outcome = service.upgrade_to_head().await;
    if !outcome.is_success() {
        bail!(outcome.message);
    }

    let after = service.status().await?;
    println!("{}", format!("✓ {}", outcome.message).green().bold());
    println!("  Current revision: {}", after.current_display().cyan());
    Ok(())
}
