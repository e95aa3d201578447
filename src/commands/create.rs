//! Migration creation

use anyhow::Result;
use colored::*;

use crate::migrate::MigrationDir;

/// Create a new migration file revising the current head.
pub fn migrate_create(dir: &MigrationDir, message: &str) -> Result<()> {
    println!("{}", "📝 Creating Migration".cyan().bold());
    println!();

    let (path, node) = dir.create(message)?;

    println!("  {} {}", "✓ Created:".green(), path.display());
    println!();
    println!("  Revision: {}", node.revision.cyan());
    println!(
        "  Revises:  {}",
        node.parent_revision.as_deref().unwrap_or("<base>").yellow()
    );
    println!();
    println!("  Edit the file to add your schema changes, then run:");
    println!("    {}", "pgdash upgrade".cyan());
    Ok(())
}
