//! Migration history

use anyhow::Result;
use colored::*;

use crate::ledger::LedgerStore;
use crate::service::MigrationService;

/// Print every migration, oldest first.
pub async fn migrate_list<L: LedgerStore>(service: &MigrationService<L>) -> Result<()> {
    let entries = service.list_migrations().await?;

    if entries.is_empty() {
        println!("{}", "No migrations defined.".dimmed());
        return Ok(());
    }

    println!("{}", "📜 Migration History".cyan().bold());
    println!();
    for entry in &entries {
        let marker = if entry.is_current {
            "●".green()
        } else if entry.is_pending {
            "○".yellow()
        } else {
            "✓".dimmed()
        };
        let parent = entry.parent_revision.as_deref().unwrap_or("<base>");
        let created = entry
            .created_at
            .map(|c| c.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();

        print!(
            "  {} {} {} {}",
            marker,
            entry.revision.bold(),
            format!("← {}", parent).dimmed(),
            entry.description
        );
        if entry.is_current {
            print!(" {}", "(current)".green());
        }
        if !created.is_empty() {
            print!("  {}", created.dimmed());
        }
        println!();
    }
    Ok(())
}
