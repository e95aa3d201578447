//! Command implementations for the pgdash CLI.
//!
//! Submodules:
//! - `list`: migration history
//! - `status`: status summary
//! - `up`: apply all pending migrations
//! - `down`: revert one migration
//! - `create`: author a new migration file
//! - `serve`: run the HTTP admin API

mod create;
mod down;
mod list;
mod serve;
mod status;
mod up;

pub use create::migrate_create;
pub use down::migrate_down;
pub use list::migrate_list;
pub use serve::serve;
pub use status::migrate_status;
pub use up::migrate_up;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::ledger::PgLedger;
use crate::migrate::MigrationDir;
use crate::service::MigrationService;

/// Service over the configured PostgreSQL database and migrations directory.
pub fn pg_service(config: &Config) -> Result<MigrationService<PgLedger>> {
    let ledger = PgLedger::connect_lazy(
        &config.database_url,
        MigrationDir::new(&config.migrations_dir),
        &config.version_table,
    )
    .context("Failed to configure database pool")?;
    Ok(MigrationService::new(ledger).strict_current_revision(config.strict_current_revision))
}

/// Strip the password from a connection URL for display.
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((userinfo, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match userinfo.split_once(':') {
        Some((user, _)) => format!("{}://{}:***@{}", scheme, user, host),
        None => url.to_string(),
    }
}
