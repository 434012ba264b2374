use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::store::StoreError;

/// Ways a health check can fail. Each maps to a 500 response.
#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("Unable to connect to the database: {0}")]
    Connection(String),

    #[error("Database query failed: {0}")]
    Query(String),

    #[error("Unexpected empty result from SELECT 1")]
    EmptyResult,

    #[error("Unexpected database error: {0}")]
    Unclassified(String),
}

impl HealthError {
    /// `"error"` for the expected failure modes, `"critical"` for everything else.
    pub fn status(&self) -> &'static str {
        match self {
            HealthError::Unclassified(_) => "critical",
            _ => "error",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            HealthError::Connection(_) => "Unable to connect to the database",
            HealthError::Query(_) => "Database query failed",
            HealthError::EmptyResult => "Unexpected empty result from SELECT 1",
            HealthError::Unclassified(_) => "Unexpected database error",
        }
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            HealthError::Connection(details)
            | HealthError::Query(details)
            | HealthError::Unclassified(details) => Some(details),
            HealthError::EmptyResult => None,
        }
    }
}

impl From<sqlx::Error> for HealthError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            // Rows came back but could not be turned into values
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::Encode(_)
            | sqlx::Error::TypeNotFound { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. } => HealthError::Unclassified(err.to_string()),
            other => HealthError::Query(other.to_string()),
        }
    }
}

impl From<StoreError> for HealthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Connect(details) => HealthError::Connection(details),
            StoreError::Query(e) => e.into(),
        }
    }
}

/// Failure body for `/health/logs`.
#[derive(Debug, Serialize)]
struct LogsErrorBody {
    status: &'static str,
    message: &'static str,
    details: String,
}

/// The audit log could not be read.
#[derive(Debug, thiserror::Error)]
#[error("Failed to fetch health check logs: {0}")]
pub struct LogsError(#[from] pub StoreError);

impl IntoResponse for LogsError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "Failed to fetch health check logs");

        let message = match &self.0 {
            StoreError::Connect(_) => "Unable to connect to the database",
            StoreError::Query(_) => "Failed to fetch health check logs",
        };
        let body = LogsErrorBody {
            status: "error",
            message,
            details: self.0.to_string(),
        };

        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
