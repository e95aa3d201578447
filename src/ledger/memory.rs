//! In-memory ledger.

use std::collections::HashSet;

use tokio::sync::Mutex;
use tracing::info;

use super::{LedgerStore, next_step, rollback_step};
use crate::error::{LedgerError, LedgerResult};
use crate::migrate::{MigrationNode, resolve};

/// Something that happened to the marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    Applied(String),
    Reverted(String),
}

#[derive(Debug, Default)]
struct State {
    current: Option<String>,
    history: Vec<LedgerEvent>,
    failing: HashSet<String>,
}

/// Ledger holding nodes and marker in memory. Nothing is executed.
#[derive(Debug)]
pub struct MemoryLedger {
    nodes: Vec<MigrationNode>,
    state: Mutex<State>,
}

impl MemoryLedger {
    pub fn new(nodes: Vec<MigrationNode>) -> Self {
        Self {
            nodes,
            state: Mutex::new(State::default()),
        }
    }

    /// Start with `revision` already applied.
    pub fn at(mut self, revision: impl Into<String>) -> Self {
        self.state.get_mut().current = Some(revision.into());
        self
    }

    /// Make applying or reverting `revision` fail.
    pub fn fail_on(mut self, revision: impl Into<String>) -> Self {
        self.state.get_mut().failing.insert(revision.into());
        self
    }

    pub async fn current(&self) -> Option<String> {
        self.state.lock().await.current.clone()
    }

    pub async fn history(&self) -> Vec<LedgerEvent> {
        self.state.lock().await.history.clone()
    }
}

impl LedgerStore for MemoryLedger {
    async fn load_nodes(&self) -> LedgerResult<Vec<MigrationNode>> {
        Ok(self.nodes.clone())
    }

    async fn read_current_revision(&self) -> LedgerResult<Option<String>> {
        Ok(self.current().await)
    }

    async fn apply_next(&self) -> LedgerResult<Option<String>> {
        let mut state = self.state.lock().await;
        let resolution = resolve(self.nodes.clone(), state.current.as_deref())?;
        let Some(node) = next_step(&resolution)? else {
            return Ok(None);
        };
        if state.failing.contains(&node.revision) {
            return Err(LedgerError::execution(&node.revision, "simulated failure"));
        }

        let revision = node.revision.clone();
        info!(%revision, "applied migration");
        state.current = Some(revision.clone());
        state.history.push(LedgerEvent::Applied(revision.clone()));
        Ok(Some(revision))
    }

    async fn rollback_one(&self) -> LedgerResult<String> {
        let mut state = self.state.lock().await;
        let resolution = resolve(self.nodes.clone(), state.current.as_deref())?;
        let node = rollback_step(&resolution)?;
        if state.failing.contains(&node.revision) {
            return Err(LedgerError::execution(&node.revision, "simulated failure"));
        }

        let revision = node.revision.clone();
        info!(%revision, parent = ?node.parent_revision, "reverted migration");
        state.current = node.parent_revision.clone();
        state.history.push(LedgerEvent::Reverted(revision.clone()));
        Ok(revision)
    }
}
