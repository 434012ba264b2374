//! Index route.

/// Plain-text banner confirming the service is up. Does not touch the database.
pub async fn index() -> &'static str {
    "Hello from dbpulse!"
}
