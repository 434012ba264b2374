//! Database liveness check with audit logging.
//!
//! A check is a single pass with no retries:
//!
//! 1. open a fresh connection,
//! 2. run the probe query and require it to return a row,
//! 3. record the caller in `health_checks` on the same connection,
//! 4. close the connection.
//!
//! Every failure is classified into a [`HealthError`] and rendered with the
//! caller's address, so callers always get a JSON body they can trace.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::config::AuditConfig;
use crate::error::HealthError;
use crate::store::{audit, Endpoint, Store};

/// Run one health check on behalf of `client_ip`.
///
/// When `audit_config.required` is false a failed audit insert is logged and the
/// check still succeeds.
pub async fn check_health(
    store: &Store,
    audit_config: &AuditConfig,
    client_ip: &str,
) -> Result<Endpoint, HealthError> {
    let probe_query = store.config().probe_query.clone();
    let audit_required = audit_config.required;
    let client_ip = client_ip.to_owned();

    store
        .scoped(move |conn| {
            Box::pin(async move {
                if !conn.probe(&probe_query).await? {
                    return Err(HealthError::EmptyResult);
                }

                match audit::log_visit(conn, &client_ip).await {
                    Ok(()) => Ok(()),
                    Err(e) if audit_required => Err(e.into()),
                    Err(e) => {
                        tracing::warn!(error = %e, client_ip = %client_ip, "Health check not recorded");
                        Ok(())
                    }
                }
            })
        })
        .await?;

    Ok(store.endpoint())
}

/// `details` is the endpoint on success and the driver text on failure.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum HealthDetails {
    Endpoint(Endpoint),
    Text(String),
}

/// JSON body of `/health`.
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
    pub client_ip: String,
}

impl HealthReport {
    pub fn healthy(endpoint: Endpoint, client_ip: String) -> Self {
        Self {
            status: "healthy",
            message: "Database connection successful",
            details: Some(HealthDetails::Endpoint(endpoint)),
            client_ip,
        }
    }

    pub fn failed(err: &HealthError, client_ip: String) -> Self {
        Self {
            status: err.status(),
            message: err.message(),
            details: err.details().map(|d| HealthDetails::Text(d.to_string())),
            client_ip,
        }
    }

    pub fn from_outcome(outcome: Result<Endpoint, HealthError>, client_ip: String) -> Self {
        match outcome {
            Ok(endpoint) => Self::healthy(endpoint, client_ip),
            Err(err) => {
                tracing::error!(error = %err, client_ip = %client_ip, "Health check failed");
                Self::failed(&err, client_ip)
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        if self.status == "healthy" {
            StatusCode::OK
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for HealthReport {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::store::schema::create_audit_table;
    use serde_json::json;
    use tempfile::TempDir;

    async fn store_with_table(dir: &TempDir) -> Store {
        let store = Store::new(DatabaseConfig::sqlite(dir.path().join("audit.db")));
        let mut conn = store.open().await.unwrap();
        create_audit_table(&mut conn).await.unwrap();
        conn.close().await.unwrap();
        store
    }

    #[test]
    fn test_healthy_report_json() {
        let endpoint = Endpoint {
            host: "localhost".to_string(),
            database: "inventory".to_string(),
        };
        let report = HealthReport::healthy(endpoint, "203.0.113.5".to_string());

        assert_eq!(report.status_code(), StatusCode::OK);
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "status": "healthy",
                "message": "Database connection successful",
                "details": {"host": "localhost", "database": "inventory"},
                "client_ip": "203.0.113.5",
            })
        );
    }

    #[test]
    fn test_critical_report_json() {
        let err = HealthError::Unclassified("task panicked".to_string());
        let report = HealthReport::failed(&err, "10.1.1.1".to_string());

        assert_eq!(report.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "status": "critical",
                "message": "Unexpected database error",
                "details": "task panicked",
                "client_ip": "10.1.1.1",
            })
        );
    }

    #[tokio::test]
    async fn test_check_health_records_visit() {
        let dir = TempDir::new().unwrap();
        let store = store_with_table(&dir).await;

        let endpoint = check_health(&store, &AuditConfig::default(), "192.0.2.1").await.unwrap();
        assert_eq!(endpoint.host, "localhost");

        let mut conn = store.open().await.unwrap();
        let records = audit::recent_logs(&mut conn, 10).await.unwrap();
        conn.close().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].client_ip, "192.0.2.1");
    }

    #[tokio::test]
    async fn test_check_health_empty_probe() {
        let dir = TempDir::new().unwrap();
        let mut config = DatabaseConfig::sqlite(dir.path().join("audit.db"));
        config.probe_query = "SELECT 1 WHERE 1 = 0".to_string();
        let store = Store::new(config);

        let result = check_health(&store, &AuditConfig::default(), "192.0.2.1").await;
        assert!(matches!(result, Err(HealthError::EmptyResult)));
    }

    #[tokio::test]
    async fn test_check_health_missing_table_is_query_failure() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(DatabaseConfig::sqlite(dir.path().join("audit.db")));

        let result = check_health(&store, &AuditConfig::default(), "192.0.2.1").await;
        assert!(matches!(result, Err(HealthError::Query(_))));
    }

    #[tokio::test]
    async fn test_check_health_best_effort_audit() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(DatabaseConfig::sqlite(dir.path().join("audit.db")));
        let audit_config = AuditConfig {
            required: false,
            ..AuditConfig::default()
        };

        assert!(check_health(&store, &audit_config, "192.0.2.1").await.is_ok());
    }

    #[tokio::test]
    async fn test_check_health_unreachable() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(DatabaseConfig::sqlite(dir.path().join("gone/audit.db")));

        let result = check_health(&store, &AuditConfig::default(), "192.0.2.1").await;
        assert!(matches!(result, Err(HealthError::Connection(_))));
    }
}
