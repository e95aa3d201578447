//! PostgreSQL ledger backed by a migrations directory.
//!
//! The marker lives in a one-row tracking table:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS pgdash_version (
//!     version_num VARCHAR(64) NOT NULL PRIMARY KEY
//! )
//! ```

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, instrument};

use super::{LedgerStore, down_sql, next_step, rollback_step};
use crate::error::{LedgerError, LedgerResult};
use crate::migrate::{MigrationDir, MigrationNode};

/// Plain, unquoted SQL identifier (`[A-Za-z_][A-Za-z0-9_]*`, max 63 bytes).
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Ledger executing migration SQL against PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgLedger {
    pool: PgPool,
    source: MigrationDir,
    table: String,
}

impl PgLedger {
    pub fn new(pool: PgPool, source: MigrationDir, table: &str) -> LedgerResult<Self> {
        if !is_valid_identifier(table) {
            return Err(LedgerError::Configuration(format!(
                "Invalid version table name: {}",
                table
            )));
        }
        Ok(Self {
            pool,
            source,
            table: table.to_string(),
        })
    }

    /// Build a lazily-connecting pool; nothing touches the network until first use.
    pub fn connect_lazy(url: &str, source: MigrationDir, table: &str) -> LedgerResult<Self> {
        let pool = PgPoolOptions::new().max_connections(5).connect_lazy(url)?;
        Self::new(pool, source, table)
    }

    pub fn source(&self) -> &MigrationDir {
        &self.source
    }

    fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (version_num VARCHAR(64) NOT NULL PRIMARY KEY)",
            self.table
        )
    }

    /// Run `sql` and move the marker to `marker` in one transaction.
    async fn execute_step(
        &self,
        revision: &str,
        sql: &str,
        marker: Option<&str>,
    ) -> LedgerResult<()> {
        let fail = |e: sqlx::Error| LedgerError::execution(revision, e);

        let mut tx = self.pool.begin().await.map_err(fail)?;
        sqlx::query(&self.create_table_sql())
            .execute(&mut *tx)
            .await
            .map_err(fail)?;
        if !sql.trim().is_empty() {
            sqlx::Executor::execute(&mut *tx, sqlx::raw_sql(sql))
                .await
                .map_err(fail)?;
        }
        sqlx::query(&format!("DELETE FROM {}", self.table))
            .execute(&mut *tx)
            .await
            .map_err(fail)?;
        if let Some(marker) = marker {
            sqlx::query(&format!("INSERT INTO {} (version_num) VALUES ($1)", self.table))
                .bind(marker)
                .execute(&mut *tx)
                .await
                .map_err(fail)?;
        }
        tx.commit().await.map_err(fail)
    }
}

impl LedgerStore for PgLedger {
    async fn load_nodes(&self) -> LedgerResult<Vec<MigrationNode>> {
        self.source.load()
    }

    async fn read_current_revision(&self) -> LedgerResult<Option<String>> {
        let exists: bool = sqlx::query_scalar("SELECT to_regclass($1::text) IS NOT NULL")
            .bind(&self.table)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Ok(None);
        }
        let current: Option<String> =
            sqlx::query_scalar(&format!("SELECT version_num FROM {} LIMIT 1", self.table))
                .fetch_optional(&self.pool)
                .await?;
        Ok(current)
    }

    #[instrument(skip(self), fields(table = %self.table))]
    async fn apply_next(&self) -> LedgerResult<Option<String>> {
        let resolution = self.resolve().await?;
        let Some(node) = next_step(&resolution)? else {
            return Ok(None);
        };

        self.execute_step(&node.revision, &node.up_sql, Some(&node.revision))
            .await?;
        info!(revision = %node.revision, message = %node.description, "applied migration");
        Ok(Some(node.revision.clone()))
    }

    #[instrument(skip(self), fields(table = %self.table))]
    async fn rollback_one(&self) -> LedgerResult<String> {
        let resolution = self.resolve().await?;
        let node = rollback_step(&resolution)?;
        let down = down_sql(node)?;

        self.execute_step(&node.revision, down, node.parent_revision.as_deref())
            .await?;
        info!(revision = %node.revision, parent = ?node.parent_revision, "reverted migration");
        Ok(node.revision.clone())
    }
}
