//! HTTP error mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::LedgerError;

/// Errors returned by the admin API.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Migration definitions could not be found or read.
    #[error("{0}")]
    NotFound(String),

    /// Anything else, including failed apply/rollback outcomes.
    #[error("{0}")]
    Internal(String),
}

impl ServerError {
    /// Map a ledger error, prefixing non-configuration failures with `context`.
    pub fn from_ledger(context: &str, err: LedgerError) -> Self {
        if err.is_not_found() {
            ServerError::NotFound(err.to_string())
        } else {
            ServerError::Internal(format!("{}: {}", context, err))
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChainDefect;

    #[test]
    fn test_configuration_maps_to_404() {
        let err = ServerError::from_ledger(
            "Failed to get migrations",
            LedgerError::Configuration("Migrations directory not found: migrations".into()),
        );
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Migrations directory not found: migrations");
    }

    #[test]
    fn test_malformed_chain_maps_to_500_with_context() {
        let err = ServerError::from_ledger(
            "Failed to get status",
            ChainDefect::Cycle("001".into()).into(),
        );
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().starts_with("Failed to get status: Malformed migration chain"));
    }

    #[test]
    fn test_into_response_status() {
        let response = ServerError::Internal("boom".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
