//! Shared application state.

use std::sync::Arc;

use crate::service::MigrationService;

/// What `/health` reports about the deployment.
#[derive(Debug, Clone, Default)]
pub struct HealthInfo {
    pub database_configured: bool,
    pub migrations_dir_configured: bool,
}

/// Cloned into every handler.
pub struct AppState<L> {
    pub service: Arc<MigrationService<L>>,
    pub health: HealthInfo,
}

// Manual impl: `L` itself does not need to be `Clone`.
impl<L> Clone for AppState<L> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            health: self.health.clone(),
        }
    }
}
