//! Audit table creation at startup.

use super::{DbConnection, Store, StoreError};

const CREATE_HEALTH_CHECKS_MYSQL: &str = "\
CREATE TABLE IF NOT EXISTS health_checks (
    id BIGINT AUTO_INCREMENT PRIMARY KEY,
    client_ip VARCHAR(45) NOT NULL,
    checked_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

const CREATE_HEALTH_CHECKS_SQLITE: &str = "\
CREATE TABLE IF NOT EXISTS health_checks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    client_ip VARCHAR(45) NOT NULL,
    checked_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

/// Create `health_checks` on an open connection if it does not exist yet.
pub async fn create_audit_table(conn: &mut DbConnection) -> Result<(), StoreError> {
    match conn {
        DbConnection::MySql(conn) => {
            sqlx::query(CREATE_HEALTH_CHECKS_MYSQL).execute(&mut *conn).await?;
        }
        DbConnection::Sqlite(conn) => {
            sqlx::query(CREATE_HEALTH_CHECKS_SQLITE).execute(&mut *conn).await?;
        }
    }
    Ok(())
}

/// Make sure the audit table exists before traffic is served.
///
/// Never fails: an unreachable database or a rejected statement is logged and
/// startup carries on. Health checks will then report the problem per request.
/// Relies on `IF NOT EXISTS`, so concurrent instances may all run this.
pub async fn ensure_schema(store: &Store) {
    let result = store
        .scoped(|conn| {
            Box::pin(async move {
                tracing::info!(backend = ?conn.backend(), "Initial database connection successful");
                create_audit_table(conn).await
            })
        })
        .await;

    match result {
        Ok(()) => tracing::info!("Audit table health_checks is ready"),
        Err(StoreError::Connect(e)) => {
            tracing::warn!(error = %e, "Could not establish initial database connection; skipping schema setup")
        }
        Err(StoreError::Query(e)) => {
            tracing::warn!(error = %e, "Failed to create audit table; health check logging will fail")
        }
    }
}

/// Whether the connected database has a `health_checks` table.
pub async fn audit_table_exists(conn: &mut DbConnection) -> Result<bool, StoreError> {
    let count: i64 = match conn {
        DbConnection::MySql(conn) => {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_name = 'health_checks'",
            )
            .fetch_one(&mut *conn)
            .await?
        }
        DbConnection::Sqlite(conn) => {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'health_checks'",
            )
            .fetch_one(&mut *conn)
            .await?
        }
    };
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(DatabaseConfig::sqlite(dir.path().join("audit.db")));

        ensure_schema(&store).await;
        ensure_schema(&store).await;

        let mut conn = store.open().await.unwrap();
        assert!(audit_table_exists(&mut conn).await.unwrap());
        conn.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_create_audit_table_twice_on_one_connection() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(DatabaseConfig::sqlite(dir.path().join("audit.db")));

        let mut conn = store.open().await.unwrap();
        create_audit_table(&mut conn).await.unwrap();
        create_audit_table(&mut conn).await.unwrap();
        conn.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_schema_with_unreachable_store_does_not_panic() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(DatabaseConfig::sqlite(dir.path().join("nope/nope/audit.db")));

        ensure_schema(&store).await;
    }
}
