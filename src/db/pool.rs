//! Database connection handling.
//!
//! A session talks to one database at a time through a small database-specific
//! pool (MySqlPool, PgPool, SqlitePool) to keep full type support.

use crate::error::{InsightError, InsightResult};
use crate::models::{ConnectionSettings, DatabaseType};
use sqlx::{
    MySqlPool, PgPool, SqlitePool,
    mysql::{MySqlConnectOptions, MySqlPoolOptions},
    postgres::{PgConnectOptions, PgPoolOptions},
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Turns are processed one at a time, so one connection is all a session needs.
const MAX_CONNECTIONS: u32 = 1;
const ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Database-specific connection pool (avoids AnyPool limitations).
#[derive(Debug, Clone)]
pub enum DbPool {
    MySql(MySqlPool),
    Postgres(PgPool),
    SQLite(SqlitePool),
}

impl DbPool {
    /// Close the connection pool.
    pub async fn close(&self) {
        match self {
            DbPool::MySql(pool) => pool.close().await,
            DbPool::Postgres(pool) => pool.close().await,
            DbPool::SQLite(pool) => pool.close().await,
        }
    }

    /// Get the database type for this pool.
    pub fn db_type(&self) -> DatabaseType {
        match self {
            DbPool::MySql(_) => DatabaseType::MySQL,
            DbPool::Postgres(_) => DatabaseType::PostgreSQL,
            DbPool::SQLite(_) => DatabaseType::SQLite,
        }
    }
}

/// An open database handle plus what was learned while opening it.
#[derive(Debug)]
pub struct Connection {
    pool: DbPool,
    target: String,
    server_version: Option<String>,
}

impl Connection {
    /// Open a connection from the given settings.
    ///
    /// Fails with [`InsightError::Connection`] when the server is unreachable or
    /// rejects the credentials. SQLite files are never created implicitly.
    pub async fn connect(settings: &ConnectionSettings) -> InsightResult<Self> {
        let target = settings.masked_uri();
        info!(target = %target, db_type = %settings.db_type, "Connecting to database");

        let pool = create_pool(settings).await?;
        let server_version = get_server_version(&pool).await;

        info!(
            target = %target,
            server_version = ?server_version,
            "Connected successfully"
        );

        Ok(Self {
            pool,
            target,
            server_version,
        })
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn db_type(&self) -> DatabaseType {
        self.pool.db_type()
    }

    /// Connection URI with the password masked.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn server_version(&self) -> Option<&str> {
        self.server_version.as_deref()
    }

    pub async fn close(&self) {
        debug!(target = %self.target, "Closing connection");
        self.pool.close().await;
    }
}

async fn create_pool(settings: &ConnectionSettings) -> InsightResult<DbPool> {
    let acquire_timeout = Duration::from_secs(ACQUIRE_TIMEOUT_SECS);
    let connect_error = |e: sqlx::Error| {
        InsightError::connection(
            format!("Failed to connect: {}", e),
            connection_suggestion(settings.db_type, &e),
        )
    };

    let uri = settings.connection_uri();
    let invalid_uri = |e: sqlx::Error| {
        InsightError::connection(
            format!("Invalid {} connection string: {}", settings.db_type, e),
            "User and password must not contain '@', '/', ':' or '#'",
        )
    };

    match settings.db_type {
        DatabaseType::MySQL => {
            let options = MySqlConnectOptions::from_str(&uri)
                .map_err(invalid_uri)?
                .charset("utf8mb4");

            let pool = MySqlPoolOptions::new()
                .max_connections(MAX_CONNECTIONS)
                .acquire_timeout(acquire_timeout)
                .connect_with(options)
                .await
                .map_err(connect_error)?;
            Ok(DbPool::MySql(pool))
        }
        DatabaseType::PostgreSQL => {
            let options = PgConnectOptions::from_str(&uri).map_err(invalid_uri)?;

            let pool = PgPoolOptions::new()
                .max_connections(MAX_CONNECTIONS)
                .acquire_timeout(acquire_timeout)
                .connect_with(options)
                .await
                .map_err(connect_error)?;
            Ok(DbPool::Postgres(pool))
        }
        DatabaseType::SQLite => {
            if settings.database.trim().is_empty() {
                return Err(InsightError::connection(
                    "SQLite database path is empty",
                    "Set it with /set database path/to/db.sqlite",
                ));
            }
            let options = SqliteConnectOptions::from_str(&uri)
                .map_err(invalid_uri)?
                .create_if_missing(false);

            let pool = SqlitePoolOptions::new()
                .max_connections(MAX_CONNECTIONS)
                .acquire_timeout(acquire_timeout)
                .connect_with(options)
                .await
                .map_err(connect_error)?;
            Ok(DbPool::SQLite(pool))
        }
    }
}

/// Get the server version from the connected database.
async fn get_server_version(pool: &DbPool) -> Option<String> {
    let result = match pool {
        DbPool::MySql(pool) => {
            sqlx::query_scalar::<_, String>("SELECT version()")
                .fetch_one(pool)
                .await
        }
        DbPool::Postgres(pool) => {
            sqlx::query_scalar::<_, String>("SELECT version()")
                .fetch_one(pool)
                .await
        }
        DbPool::SQLite(pool) => {
            sqlx::query_scalar::<_, String>("SELECT sqlite_version()")
                .fetch_one(pool)
                .await
        }
    };

    match result {
        Ok(version) => {
            debug!(version = %version, "Got server version");
            Some(version)
        }
        Err(e) => {
            warn!(error = %e, "Failed to get server version");
            None
        }
    }
}

/// Generate a helpful suggestion for connection errors.
fn connection_suggestion(db_type: DatabaseType, error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return format!(
            "Check that the {} server is running and accessible",
            db_type
        );
    }

    if error_str.contains("authentication")
        || error_str.contains("password")
        || error_str.contains("access denied")
    {
        return "Verify the user and password with /settings".to_string();
    }

    if error_str.contains("does not exist")
        || error_str.contains("unknown database")
        || error_str.contains("unable to open database file")
    {
        return "Check that the database name exists".to_string();
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check TLS/SSL configuration or try disabling it".to_string();
    }

    match db_type {
        DatabaseType::PostgreSQL => {
            "Verify host, port and database with /settings (default port 5432)".to_string()
        }
        DatabaseType::MySQL => {
            "Verify host, port and database with /settings (default port 3306)".to_string()
        }
        DatabaseType::SQLite => {
            "Verify the file path exists and is accessible: /set database path/to/db.sqlite"
                .to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_settings(path: &str) -> ConnectionSettings {
        ConnectionSettings::sqlite(path)
    }

    #[tokio::test]
    async fn test_connect_sqlite_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();

        let conn = Connection::connect(&sqlite_settings(path)).await.unwrap();
        assert_eq!(conn.db_type(), DatabaseType::SQLite);
        assert!(conn.server_version().is_some());
        conn.close().await;
    }

    #[tokio::test]
    async fn test_missing_sqlite_file_is_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");

        let err = Connection::connect(&sqlite_settings(path.to_str().unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, InsightError::Connection { .. }));
        assert!(err.suggestion().is_some());
        // Nothing is created on failure
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_empty_sqlite_path_rejected() {
        let err = Connection::connect(&sqlite_settings("  ")).await.unwrap_err();
        assert!(matches!(err, InsightError::Connection { .. }));
    }

    #[test]
    fn test_connection_suggestion_fallback() {
        let err = sqlx::Error::PoolTimedOut;
        let suggestion = connection_suggestion(DatabaseType::MySQL, &err);
        assert!(suggestion.contains("3306"));
    }
}
