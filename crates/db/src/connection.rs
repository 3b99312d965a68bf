use std::time::Duration;

use phonedesk_core::config::DatabaseConfig;
use sqlx::sqlite::SqlitePoolOptions;

use crate::migrations;

pub type DbPool = sqlx::SqlitePool;

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("could not open record database: {0}")]
    Connect(#[from] sqlx::Error),
    #[error("could not apply record database migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(database_url, 5, 30).await
}

pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}

/// Opens the pool described by `config` and brings the schema up to date.
pub async fn open_record_database(config: &DatabaseConfig) -> Result<DbPool, ConnectError> {
    let pool = connect_with_settings(&config.url, config.max_connections, config.timeout_secs)
        .await?;
    migrations::run_pending(&pool).await?;
    Ok(pool)
}
