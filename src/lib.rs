//! # pgdash
//!
//! Administrative backend for schema migrations on PostgreSQL.
//!
//! Migration definitions live in a directory of `.sql` files, each naming its
//! revision and the revision it builds on. The resolver rebuilds the linear
//! history from those parent links and classifies every node against the
//! database's applied marker:
//!
//! ```
//! use pgdash::migrate::{MigrationNode, resolve};
//!
//! let nodes = vec![
//!     MigrationNode::new("002", Some("001"), "create posts table"),
//!     MigrationNode::new("001", None, "create users table"),
//! ];
//! let resolution = resolve(nodes, Some("001")).unwrap();
//! let status = resolution.status();
//! assert_eq!(status.total, 2);
//! assert_eq!(status.pending, 1);
//! assert!(!status.is_up_to_date);
//! ```
//!
//! The [`service::MigrationService`] wraps any [`ledger::LedgerStore`] and is
//! exposed over HTTP by [`server::AdminRouter`] and on the command line by
//! the `pgdash` binary.

pub mod commands;
pub mod config;
pub mod error;
pub mod ledger;
pub mod migrate;
pub mod server;
pub mod service;

pub use config::Config;
pub use error::{ChainDefect, LedgerError, LedgerResult};

/// Common imports.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{ChainDefect, LedgerError, LedgerResult};
    pub use crate::ledger::{LedgerStore, MemoryLedger, PgLedger};
    pub use crate::migrate::{
        MigrationDir, MigrationEntry, MigrationNode, MigrationStatus, Resolution, resolve,
    };
    pub use crate::service::{MigrationService, OperationOutcome};
}
