//! dbpulse - database liveness endpoint with an audit trail.
//!
//! `/health` opens a fresh database connection, runs a probe query and records
//! the caller in the append-only `health_checks` table. `/health/logs` reads
//! the most recent records back.

pub mod client_ip;
pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod store;

pub use config::AppConfig;
pub use error::{HealthError, LogsError};
pub use routes::create_router;
pub use state::AppState;
pub use store::{DbConnection, Store, StoreError};
