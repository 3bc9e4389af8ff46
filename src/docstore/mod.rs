/// Document store - the entity-of-record database
///
/// Holds the `users` and `datasets` collections in its own SQLite database,
/// separate from the graph store so the two systems of record fail
/// independently. Owns uniqueness constraints (username, email) and entity
/// validation; relationship facts live in the graph store, never here.

pub mod models;

mod datasets;
mod users;

use crate::config::DocumentStoreConfig;
use crate::error::HiveResult;
use sqlx::sqlite::SqlitePool;
use std::path::Path;

/// Typed access to the document collections
#[derive(Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
}

impl DocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the configured database, creating it if missing
    pub async fn open(config: &DocumentStoreConfig) -> HiveResult<Self> {
        let pool = create_pool(&config.db_path, config.max_connections).await?;
        run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Create a SQLite connection pool with WAL journaling
pub async fn create_pool(path: &Path, max_connections: u32) -> HiveResult<SqlitePool> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| crate::error::HiveError::Internal(format!("Failed to create {:?}: {}", parent, e)))?;
    }

    let pool = sqlx::pool::PoolOptions::new()
        .max_connections(max_connections)
        .connect_with(
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .foreign_keys(true)
                .busy_timeout(std::time::Duration::from_secs(5)),
        )
        .await?;

    Ok(pool)
}

/// Run document-store migrations, embedded at compile time
pub async fn run_migrations(pool: &SqlitePool) -> HiveResult<()> {
    sqlx::migrate!("./migrations/documents")
        .run(pool)
        .await
        .map_err(|e| crate::error::HiveError::Internal(format!("Migration failed: {}", e)))?;

    Ok(())
}
