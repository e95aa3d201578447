//! Request handlers.

use axum::{Json, extract::State};
use serde_json::{Value, json};

use super::error::{ServerError, ServerResult};
use super::state::AppState;
use crate::ledger::LedgerStore;
use crate::migrate::{MigrationEntry, MigrationStatus};
use crate::service::OperationOutcome;

const NAME: &str = "pgdash";
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn configured(flag: bool) -> &'static str {
    if flag { "configured" } else { "not configured" }
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "name": NAME,
        "version": VERSION,
        "status": "running",
        "features": [
            "Migration history",
            "Migration status",
            "Upgrade to head",
            "Downgrade one revision",
        ],
    }))
}

pub async fn health<L>(State(state): State<AppState<L>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "database": configured(state.health.database_configured),
        "migrations_dir": configured(state.health.migrations_dir_configured),
    }))
}

pub async fn service_health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "Migration Service",
        "version": VERSION,
    }))
}

pub async fn list_migrations<L: LedgerStore>(
    State(state): State<AppState<L>>,
) -> ServerResult<Json<Vec<MigrationEntry>>> {
    state
        .service
        .list_migrations()
        .await
        .map(Json)
        .map_err(|e| ServerError::from_ledger("Failed to get migrations", e))
}

pub async fn status<L: LedgerStore>(
    State(state): State<AppState<L>>,
) -> ServerResult<Json<MigrationStatus>> {
    state
        .service
        .status()
        .await
        .map(Json)
        .map_err(|e| ServerError::from_ledger("Failed to get status", e))
}

pub async fn upgrade<L: LedgerStore>(
    State(state): State<AppState<L>>,
) -> ServerResult<Json<OperationOutcome>> {
    outcome(state.service.upgrade_to_head().await)
}

pub async fn downgrade<L: LedgerStore>(
    State(state): State<AppState<L>>,
) -> ServerResult<Json<OperationOutcome>> {
    outcome(state.service.downgrade_one_step().await)
}

fn outcome(outcome: OperationOutcome) -> ServerResult<Json<OperationOutcome>> {
    if outcome.is_success() {
        Ok(Json(outcome))
    } else {
        Err(ServerError::Internal(outcome.message))
    }
}
