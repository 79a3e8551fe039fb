use anyhow::{Context, Result};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Transaction, TransactionBehavior};

use crate::config::settings::StoreSettings;
use crate::errors::EngineError;

pub type DbPool = r2d2::Pool<SqliteConnectionManager>;
pub type DbConn = r2d2::PooledConnection<SqliteConnectionManager>;

pub fn create_pool(settings: &StoreSettings) -> Result<DbPool> {
    let manager = build_manager(&settings.database_path, settings.busy_timeout_ms);
    build_pool(manager)
}

fn build_manager(path: &str, busy_timeout_ms: u64) -> SqliteConnectionManager {
    SqliteConnectionManager::file(path).with_init(move |conn| {
        conn.busy_timeout(std::time::Duration::from_millis(busy_timeout_ms))?;
        conn.pragma_update(None, "foreign_keys", true)
    })
}

fn build_pool(manager: SqliteConnectionManager) -> Result<DbPool> {
    r2d2::Pool::builder()
        .build(manager)
        .context("Failed to create database connection pool")
}

pub fn get_connection(pool: &DbPool) -> Result<DbConn> {
    pool.get()
        .context("Failed to get database connection from pool")
}

/// Runs `work` inside a `BEGIN IMMEDIATE` transaction.
///
/// The write lock is held from the first read, so guard reads and the writes
/// they justify cannot interleave with another writer. Commits on `Ok`, rolls
/// back on `Err`.
pub fn with_write_tx<T, F>(conn: &mut DbConn, work: F) -> Result<T, EngineError>
where
    F: FnOnce(&Transaction) -> Result<T, EngineError>,
{
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let value = work(&tx)?;
    tx.commit()?;
    Ok(value)
}
