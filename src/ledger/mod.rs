//! Ledger stores: migration definitions plus the applied-revision marker.

mod memory;
mod postgres;

pub use memory::{LedgerEvent, MemoryLedger};
pub use postgres::{PgLedger, is_valid_identifier};

use std::future::Future;

use crate::error::{LedgerError, LedgerResult};
use crate::migrate::{Anomaly, MigrationNode, Resolution, resolve};

/// Backing store for migration definitions and the applied marker.
///
/// Reads are pure. `apply_next` and `rollback_one` mutate persistent state
/// and expect a single caller at a time.
pub trait LedgerStore: Send + Sync {
    /// All known nodes, newest-defined first.
    fn load_nodes(&self) -> impl Future<Output = LedgerResult<Vec<MigrationNode>>> + Send;

    /// The applied marker. `None` on a fresh database.
    fn read_current_revision(&self) -> impl Future<Output = LedgerResult<Option<String>>> + Send;

    /// Apply the oldest pending node. Returns the applied revision, or `None`
    /// when the chain is exhausted.
    fn apply_next(&self) -> impl Future<Output = LedgerResult<Option<String>>> + Send;

    /// Revert the current node. Returns the reverted revision.
    fn rollback_one(&self) -> impl Future<Output = LedgerResult<String>> + Send;

    /// Load and resolve the chain against the stored marker.
    fn resolve(&self) -> impl Future<Output = LedgerResult<Resolution>> + Send {
        async move {
            let nodes = self.load_nodes().await?;
            let current = self.read_current_revision().await?;
            resolve(nodes, current.as_deref())
        }
    }
}

/// The node `apply_next` should run, refusing to guess when the marker is unknown.
pub(crate) fn next_step(resolution: &Resolution) -> LedgerResult<Option<&MigrationNode>> {
    if let Some(Anomaly::UnknownCurrentRevision(rev)) = resolution.anomaly() {
        return Err(LedgerError::UnknownRevision(rev));
    }
    Ok(resolution.next_pending())
}

/// The node `rollback_one` should revert.
pub(crate) fn rollback_step(resolution: &Resolution) -> LedgerResult<&MigrationNode> {
    if resolution.current_revision().is_none() {
        return Err(LedgerError::NoOp("No migrations to roll back".to_string()));
    }
    if let Some(Anomaly::UnknownCurrentRevision(rev)) = resolution.anomaly() {
        return Err(LedgerError::UnknownRevision(rev));
    }
    resolution
        .current_node()
        .ok_or_else(|| LedgerError::NoOp("No migrations to roll back".to_string()))
}

/// The revert statements of `node`, failing when it has none.
pub(crate) fn down_sql(node: &MigrationNode) -> LedgerResult<&str> {
    node.down_sql.as_deref().ok_or_else(|| {
        LedgerError::execution(&node.revision, "migration has no '-- +down' section")
    })
}
