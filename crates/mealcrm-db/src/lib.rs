use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;

pub mod cached_clients;
pub mod manual_clients;
pub mod manual_orders;
pub mod sync_runs;

pub use cached_clients::{
    apply_order_event, get_cached_client, get_cached_client_by_email, list_cached_clients,
    upsert_cached_clients, CachedClientRow, CachedClientUpsert, OrderEvent, OrderEventOutcome,
};
pub use manual_clients::{
    create_manual_client, delete_manual_client, get_manual_client, list_manual_clients,
    update_manual_client, ManualClientRow, ManualClientUpdate, NewManualClient,
};
pub use manual_orders::{
    create_manual_order, delete_manual_order, get_manual_order, list_manual_orders,
    list_manual_orders_for_client, update_manual_order_status, ManualOrderFilters,
    ManualOrderRow, NewManualOrder,
};
pub use sync_runs::{
    complete_sync_run, fail_sync_run, list_recent_sync_runs, start_sync_run, SyncRunRow,
    SyncRunStats,
};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/mealcrm-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &mealcrm_core::AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    #[error("{entity} still has {count} dependent record(s)")]
    HasDependents { entity: &'static str, count: i64 },
    #[error("sync run {id} is not in expected status '{expected_status}'")]
    InvalidSyncRunTransition {
        id: i64,
        expected_status: &'static str,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    /// `true` when Postgres rejected the write with a unique violation (23505).
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        self.has_sqlstate("23505")
    }

    /// `true` when Postgres rejected the write with a foreign key violation (23503).
    #[must_use]
    pub fn is_foreign_key_violation(&self) -> bool {
        self.has_sqlstate("23503")
    }

    fn has_sqlstate(&self, code: &str) -> bool {
        matches!(
            self,
            Self::Sqlx(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some(code)
        )
    }
}

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Run all pending migrations against the pool.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_config_has_sane_defaults() {
        let config = PoolConfig::default();

        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.min_connections, DEFAULT_MIN_CONNECTIONS);
        assert_eq!(config.acquire_timeout_secs, DEFAULT_ACQUIRE_TIMEOUT_SECS);
    }
}
