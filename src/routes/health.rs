//! `/health`: database liveness probe for load balancers and orchestrators.
//!
//! Unlike a bare process liveness check, this opens a real database connection,
//! runs the probe query and records the caller in the audit table.

use axum::extract::State;
use tracing::instrument;

use crate::client_ip::ClientIp;
use crate::error::HealthError;
use crate::health::{check_health, HealthReport};
use crate::state::AppState;

/// Health check handler.
///
/// The check runs on its own task so that a panic inside the driver becomes a
/// `critical` response rather than a dropped connection.
#[instrument(name = "health::health", skip_all, fields(client_ip = %client_ip))]
pub async fn health(State(state): State<AppState>, ClientIp(client_ip): ClientIp) -> HealthReport {
    let store = state.store.clone();
    let config = state.config.clone();
    let caller = client_ip.clone();

    let outcome = tokio::spawn(async move { check_health(&store, &config.audit, &caller).await })
        .await
        .unwrap_or_else(|e| Err(HealthError::Unclassified(e.to_string())));

    HealthReport::from_outcome(outcome, client_ip)
}
