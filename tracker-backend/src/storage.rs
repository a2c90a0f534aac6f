use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sea_orm::{DatabaseConnection, DbErr, SqlxSqliteConnector};
use sea_orm_migration::MigratorTrait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::ConnectOptions;
use thiserror::Error;
use tracing::{debug, info};

use crate::migration::Migrator;

/// Queries slower than this get logged at WARN.
const SLOW_QUERY_MS: u64 = 500;

#[derive(Debug, Error)]
pub enum DBError {
    #[error("sqlx error: {0}")]
    SqlxError(#[from] sqlx::Error),
    #[error("database error: {0}")]
    DbErr(#[from] DbErr),
}

/// Opens the database at `db_path`, creating it if needed, and runs migrations.
pub async fn new(db_path: &PathBuf) -> Result<DatabaseConnection, DBError> {
    start_db(Some(db_path)).await
}

/// Opens a database, in-memory when no path is given.
pub async fn start_db(db_path: Option<&PathBuf>) -> Result<DatabaseConnection, DBError> {
    let (options, max_connections) = match db_path {
        Some(path) => {
            debug!("Opening Database: {}", path.display());
            (
                SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true),
                8,
            )
        }
        None => {
            debug!("Opening in-memory Database");
            // the in-memory database lives exactly as long as this one connection
            (SqliteConnectOptions::from_str("sqlite::memory:")?, 1)
        }
    };

    let options = options
        .foreign_keys(true)
        .log_statements(log::LevelFilter::Trace)
        .log_slow_statements(
            log::LevelFilter::Warn,
            Duration::from_millis(SLOW_QUERY_MS),
        );

    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(max_connections)
        .idle_timeout(None::<Duration>)
        .max_lifetime(None::<Duration>)
        .connect_with(options)
        .await?;

    let conn = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool);

    Migrator::up(&conn, None).await?;
    info!("Database migrations complete");

    Ok(conn)
}
