//! Service boundary over a ledger store.
//!
//! Queries re-read and re-resolve the ledger every time. Mutations are
//! serialized by a process-wide lock and report failures as an
//! [`OperationOutcome`] instead of an error.

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::LedgerStore;
use crate::migrate::{MigrationEntry, MigrationStatus, Resolution};

pub const UPGRADE_SUCCESS: &str = "Successfully upgraded to head revision";
pub const DOWNGRADE_SUCCESS: &str = "Successfully downgraded one revision";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Error,
}

/// Result of an apply/rollback request, ready to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationOutcome {
    pub status: OutcomeStatus,
    pub message: String,
}

impl OperationOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Error,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Migration operations exposed to the HTTP layer and the CLI.
pub struct MigrationService<L> {
    ledger: L,
    write_lock: Mutex<()>,
    strict_current_revision: bool,
}

impl<L: LedgerStore> MigrationService<L> {
    pub fn new(ledger: L) -> Self {
        Self {
            ledger,
            write_lock: Mutex::new(()),
            strict_current_revision: false,
        }
    }

    /// Treat a marker naming an undefined revision as an error instead of
    /// resolving every node as pending.
    pub fn strict_current_revision(mut self, strict: bool) -> Self {
        self.strict_current_revision = strict;
        self
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    async fn resolution(&self) -> LedgerResult<Resolution> {
        let resolution = self.ledger.resolve().await?;
        if let Some(anomaly) = resolution.anomaly() {
            if self.strict_current_revision {
                return Err(LedgerError::UnknownRevision(
                    resolution.current_revision().unwrap_or_default().to_string(),
                ));
            }
            warn!(%anomaly, "migration ledger is inconsistent");
        }
        Ok(resolution)
    }

    /// Full history, oldest first.
    pub async fn list_migrations(&self) -> LedgerResult<Vec<MigrationEntry>> {
        Ok(self.resolution().await?.entries())
    }

    pub async fn status(&self) -> LedgerResult<MigrationStatus> {
        Ok(self.resolution().await?.status())
    }

    /// Apply every pending migration.
    pub async fn upgrade_to_head(&self) -> OperationOutcome {
        let _guard = self.write_lock.lock().await;
        let mut applied = 0usize;
        loop {
            match self.ledger.apply_next().await {
                Ok(Some(_)) => applied += 1,
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, applied, "upgrade failed");
                    return OperationOutcome::error(format!("Failed to upgrade: {}", e));
                }
            }
        }
        info!(applied, "upgraded to head");
        OperationOutcome::success(UPGRADE_SUCCESS)
    }

    /// Revert the current migration.
    pub async fn downgrade_one_step(&self) -> OperationOutcome {
        let _guard = self.write_lock.lock().await;
        match self.ledger.rollback_one().await {
            Ok(revision) => {
                info!(%revision, "downgraded one revision");
                OperationOutcome::success(DOWNGRADE_SUCCESS)
            }
            Err(e @ LedgerError::NoOp(_)) => {
                warn!("downgrade requested with nothing applied");
                OperationOutcome::error(format!("Failed to downgrade: {}", e))
            }
            Err(e) => {
                error!(error = %e, "downgrade failed");
                OperationOutcome::error(format!("Failed to downgrade: {}", e))
            }
        }
    }
}
