//! HTTP admin API.
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/` | API information |
//! | GET | `/health` | deployment health |
//! | GET | `/api/migrations` | history, oldest first |
//! | GET | `/api/migrations/status` | status summary |
//! | POST | `/api/migrations/upgrade` | apply all pending |
//! | POST | `/api/migrations/downgrade` | revert one revision |
//! | GET | `/api/migrations/health` | service health |

pub mod error;
mod handlers;
pub mod state;

pub use error::{ServerError, ServerResult};
pub use state::{AppState, HealthInfo};

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::ledger::LedgerStore;
use crate::service::MigrationService;

/// Builder for the admin router.
///
/// ```rust,no_run
/// use pgdash::ledger::MemoryLedger;
/// use pgdash::server::AdminRouter;
/// use pgdash::service::MigrationService;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let app = AdminRouter::new(MigrationService::new(MemoryLedger::new(Vec::new())))
///     .cors_origins(["http://localhost:5173"])
///     .build();
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub struct AdminRouter<L> {
    service: Arc<MigrationService<L>>,
    health: HealthInfo,
    cors_origins: Vec<String>,
}

impl<L: LedgerStore + 'static> AdminRouter<L> {
    pub fn new(service: MigrationService<L>) -> Self {
        Self::from_arc(Arc::new(service))
    }

    pub fn from_arc(service: Arc<MigrationService<L>>) -> Self {
        Self {
            service,
            health: HealthInfo::default(),
            cors_origins: Vec::new(),
        }
    }

    pub fn health(mut self, health: HealthInfo) -> Self {
        self.health = health;
        self
    }

    /// Origins allowed by CORS. Without any, no CORS headers are sent.
    pub fn cors_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cors_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Router {
        let state = AppState {
            service: self.service,
            health: self.health,
        };

        let router = Router::new()
            .route("/", get(handlers::root))
            .route("/health", get(handlers::health::<L>))
            .route("/api/migrations", get(handlers::list_migrations::<L>))
            .route("/api/migrations/status", get(handlers::status::<L>))
            .route("/api/migrations/upgrade", post(handlers::upgrade::<L>))
            .route("/api/migrations/downgrade", post(handlers::downgrade::<L>))
            .route("/api/migrations/health", get(handlers::service_health))
            .with_state(state)
            .layer(TraceLayer::new_for_http());

        match cors_layer(&self.cors_origins) {
            Some(cors) => router.layer(cors),
            None => router,
        }
    }
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if allowed.is_empty() {
        return None;
    }
    info!(origins = ?origins, "CORS enabled");
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any),
    )
}
