//! Store adapter: one fresh database connection per use.
//!
//! No pooling: every call to [`Store::open`] makes a new
//! connection attempt bounded by the configured timeout, and [`Store::scoped`]
//! guarantees the connection is closed again on every exit path.
//!
//! Two backends are supported behind [`DbConnection`]: a MariaDB/MySQL server
//! and a SQLite database file.

pub mod audit;
pub mod schema;

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::Serialize;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};

use crate::config::{Backend, DatabaseConfig};

/// Errors surfaced by the store adapter.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database could not be reached or refused the credentials.
    #[error("{0}")]
    Connect(String),

    /// A statement was rejected after the connection was established.
    #[error(transparent)]
    Query(#[from] sqlx::Error),
}

/// Endpoint identifiers echoed back in healthy responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub host: String,
    pub database: String,
}

/// An open connection to one of the supported backends.
pub enum DbConnection {
    MySql(MySqlConnection),
    Sqlite(SqliteConnection),
}

impl DbConnection {
    pub fn backend(&self) -> Backend {
        match self {
            DbConnection::MySql(_) => Backend::MySql,
            DbConnection::Sqlite(_) => Backend::Sqlite,
        }
    }

    /// Run the liveness probe. Returns whether it produced a row.
    pub async fn probe(&mut self, sql: &str) -> Result<bool, sqlx::Error> {
        let row_present = match self {
            DbConnection::MySql(conn) => sqlx::query(sql).fetch_optional(&mut *conn).await?.is_some(),
            DbConnection::Sqlite(conn) => sqlx::query(sql).fetch_optional(&mut *conn).await?.is_some(),
        };
        Ok(row_present)
    }

    /// Gracefully terminate the connection.
    pub async fn close(self) -> Result<(), sqlx::Error> {
        match self {
            DbConnection::MySql(conn) => conn.close().await,
            DbConnection::Sqlite(conn) => conn.close().await,
        }
    }
}

/// Connection factory for the configured database. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Store {
    config: Arc<DatabaseConfig>,
}

impl Store {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            host: self.config.display_host().to_string(),
            database: self.config.display_database().to_string(),
        }
    }

    /// Make a single connection attempt.
    ///
    /// Driver failures and timeouts both come back as [`StoreError::Connect`]
    /// carrying a readable description; nothing here panics.
    pub async fn open(&self) -> Result<DbConnection, StoreError> {
        let timeout = Duration::from_secs(self.config.connect_timeout_secs);

        let attempt = async {
            match self.config.backend {
                Backend::MySql => {
                    let mut options = MySqlConnectOptions::new()
                        .host(&self.config.host)
                        .port(self.config.port)
                        .username(&self.config.username)
                        .password(&self.config.password);
                    if let Some(name) = self.config.name.as_deref() {
                        options = options.database(name);
                    }
                    options.connect().await.map(DbConnection::MySql)
                }
                Backend::Sqlite => {
                    SqliteConnectOptions::new()
                        .filename(self.config.path.as_deref().unwrap_or_default())
                        .create_if_missing(true)
                        .busy_timeout(timeout)
                        .connect()
                        .await
                        .map(DbConnection::Sqlite)
                }
            }
        };

        match tokio::time::timeout(timeout, attempt).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => {
                tracing::error!(error = %e, backend = ?self.config.backend, "Database connection error");
                Err(StoreError::Connect(e.to_string()))
            }
            Err(_) => {
                tracing::error!(
                    timeout_secs = self.config.connect_timeout_secs,
                    backend = ?self.config.backend,
                    "Database connection attempt timed out"
                );
                Err(StoreError::Connect(format!(
                    "Connection attempt timed out after {} seconds",
                    self.config.connect_timeout_secs
                )))
            }
        }
    }

    /// Open a connection, hand it to `f`, and close it whatever `f` returns.
    ///
    /// The closure returns a boxed future borrowing the connection, the same
    /// shape `sqlx::Connection::transaction` uses. Anything else the future
    /// needs must be moved in by value.
    pub async fn scoped<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c mut DbConnection) -> BoxFuture<'c, Result<T, E>>,
        E: From<StoreError>,
    {
        let mut conn = self.open().await?;
        let result = f(&mut conn).await;

        if let Err(e) = conn.close().await {
            tracing::warn!(error = %e, "Failed to close database connection cleanly");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_endpoint_for_mysql() {
        let store = Store::new(DatabaseConfig {
            host: "db.internal".to_string(),
            name: Some("inventory".to_string()),
            ..DatabaseConfig::default()
        });
        assert_eq!(
            store.endpoint(),
            Endpoint {
                host: "db.internal".to_string(),
                database: "inventory".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_open_sqlite_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.db");
        let store = Store::new(DatabaseConfig::sqlite(&path));

        let mut conn = store.open().await.unwrap();
        assert_eq!(conn.backend(), Backend::Sqlite);
        assert!(conn.probe("SELECT 1").await.unwrap());
        conn.close().await.unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_open_unreachable_sqlite_is_connect_error() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(DatabaseConfig::sqlite(dir.path().join("missing/dir/audit.db")));

        match store.open().await {
            Err(StoreError::Connect(details)) => assert!(!details.is_empty()),
            Err(other) => panic!("expected connect error, got {other:?}"),
            Ok(_) => panic!("expected connect error, got a connection"),
        }
    }

    #[tokio::test]
    async fn test_probe_without_rows() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(DatabaseConfig::sqlite(dir.path().join("audit.db")));

        let present = store
            .scoped(|conn| Box::pin(async move { conn.probe("SELECT 1 WHERE 1 = 0").await.map_err(StoreError::from) }))
            .await
            .unwrap();
        assert!(!present);
    }

    #[tokio::test]
    async fn test_scoped_returns_closure_error() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(DatabaseConfig::sqlite(dir.path().join("audit.db")));

        let result: Result<bool, StoreError> = store
            .scoped(|conn| Box::pin(async move { Ok(conn.probe("SELEC nonsense").await?) }))
            .await;
        assert!(matches!(result, Err(StoreError::Query(_))));

        // The store is still usable after the failed scope.
        assert!(store.open().await.is_ok());
    }
}
