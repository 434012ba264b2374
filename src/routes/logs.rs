//! `/health/logs`: most recent audit records, newest first.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::config::AuditConfig;
use crate::error::LogsError;
use crate::state::AppState;
use crate::store::audit::{recent_logs, HealthCheckRecord};

#[derive(Debug, Deserialize)]
pub struct LogsParams {
    /// Kept as text so a bad value falls back to the default instead of a 400
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub status: &'static str,
    pub count: usize,
    pub logs: Vec<HealthCheckRecord>,
}

/// Turn the raw `limit` parameter into a row bound.
///
/// Missing, non-numeric, zero and negative values use the default; large
/// values are clamped to the configured maximum.
pub fn parse_limit(raw: Option<&str>, audit: &AuditConfig) -> u32 {
    match raw.map(str::trim).and_then(|v| v.parse::<u64>().ok()) {
        Some(0) | None => audit.default_log_limit.min(audit.max_log_limit),
        Some(n) => n.min(u64::from(audit.max_log_limit)) as u32,
    }
}

#[instrument(name = "logs::logs", skip(state))]
pub async fn logs(
    State(state): State<AppState>,
    Query(params): Query<LogsParams>,
) -> Result<Json<LogsResponse>, LogsError> {
    let limit = parse_limit(params.limit.as_deref(), &state.config.audit);

    let records = state
        .store
        .scoped(move |conn| Box::pin(async move { recent_logs(conn, limit).await }))
        .await?;

    tracing::debug!(limit, count = records.len(), "Fetched health check logs");

    Ok(Json(LogsResponse {
        status: "ok",
        count: records.len(),
        logs: records,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_limit_numeric() {
        assert_eq!(parse_limit(Some("2"), &AuditConfig::default()), 2);
        assert_eq!(parse_limit(Some(" 7 "), &AuditConfig::default()), 7);
    }

    #[test]
    fn test_parse_limit_defaults() {
        let audit = AuditConfig::default();
        assert_eq!(parse_limit(None, &audit), 50);
        assert_eq!(parse_limit(Some("not-a-number"), &audit), 50);
        assert_eq!(parse_limit(Some(""), &audit), 50);
        assert_eq!(parse_limit(Some("0"), &audit), 50);
        assert_eq!(parse_limit(Some("-3"), &audit), 50);
        assert_eq!(parse_limit(Some("2.5"), &audit), 50);
    }

    #[test]
    fn test_parse_limit_clamped() {
        let audit = AuditConfig {
            max_log_limit: 100,
            ..AuditConfig::default()
        };
        assert_eq!(parse_limit(Some("5000"), &audit), 100);
        assert_eq!(parse_limit(Some("99999999999"), &audit), 100);
    }
}
