//! Migration status

use anyhow::Result;
use colored::*;

use crate::ledger::LedgerStore;
use crate::service::MigrationService;

/// Print the status summary.
pub async fn migrate_status<L: LedgerStore>(service: &MigrationService<L>) -> Result<()> {
    println!("{}", "📋 Migration Status".cyan().bold());
    println!();

    let status = service.status().await?;

    let current = if status.current.is_some() {
        status.current_display().green()
    } else {
        status.current_display().dimmed()
    };
    println!("  Current revision: {}", current);
    println!("  Total:            {}", status.total);
    println!("  Pending:          {}", status.pending.to_string().yellow());
    println!();

    if status.is_up_to_date {
        println!("  {} Database is up to date", "✓".green());
    } else {
        println!(
            "  {} {} migration(s) pending. Run {} to apply",
            "○".yellow(),
            status.pending,
            "pgdash upgrade".cyan()
        );
    }
    Ok(())
}
