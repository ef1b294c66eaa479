pub mod postgres;
pub mod sqlite;
pub mod trait_def;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::config::{DatabaseBackend, DatabaseConfig};

pub use postgres::PostgresStorage;
pub use sqlite::SqliteStorage;
pub use trait_def::{LinkStore, StorageError, StorageResult};

/// Connect to the configured backend and make sure the schema exists
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn LinkStore>> {
    let store: Arc<dyn LinkStore> = match config.backend {
        DatabaseBackend::Sqlite => {
            info!("Using SQLite storage: {}", config.url);
            Arc::new(SqliteStorage::new(&config.url, config.max_connections).await?)
        }
        DatabaseBackend::Postgres => {
            info!("Using PostgreSQL storage");
            Arc::new(PostgresStorage::new(&config.url, config.max_connections).await?)
        }
    };

    store.init().await?;
    Ok(store)
}

pub(crate) fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
