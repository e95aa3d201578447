//! HTTP admin server

use anyhow::{Context, Result};
use colored::*;
use tracing::info;

use super::{pg_service, redact_url};
use crate::config::Config;
use crate::server::{AdminRouter, HealthInfo};

/// Serve the admin API until Ctrl+C.
pub async fn serve(config: &Config) -> Result<()> {
    let service = pg_service(config)?;
    let health = HealthInfo {
        database_configured: !config.database_url.is_empty(),
        migrations_dir_configured: service.ledger().source().exists(),
    };

    let app = AdminRouter::new(service)
        .health(health)
        .cors_origins(config.cors_origins_list())
        .build();

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    println!("{} {}", "🚀 pgdash listening on".cyan().bold(), addr.yellow());
    println!("   Database:   {}", redact_url(&config.database_url).dimmed());
    println!(
        "   Migrations: {}",
        config.migrations_dir.display().to_string().dimmed()
    );
    println!("   Press {} to stop\n", "Ctrl+C".red());
    info!(%addr, "server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .context("Server error")?;
    Ok(())
}
