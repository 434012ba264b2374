//! HTTP route handlers.
//!
//! Health endpoints are never cached. Static files, when a directory is
//! configured, get a one hour public Cache-Control; no other route sets one.
//!
//! Request tracing is enabled via middleware that generates a unique request ID
//! for each incoming request, allowing correlation of all logs within a request.

pub mod health;
pub mod home;
pub mod logs;

use axum::{middleware, routing::get, Router};
use http::header::{HeaderValue, CACHE_CONTROL};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::{CACHE_CONTROL_NO_STORE, CACHE_CONTROL_STATIC};
use crate::http::static_files::create_static_service;
use crate::middleware::request_id_layer;
use crate::state::AppState;

/// Creates the Axum router with all routes and cache headers.
pub fn create_router(state: AppState) -> Router {
    // Health check - no caching, always fresh for liveness probes
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/logs", get(logs::logs))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_NO_STORE),
        ));

    let home_routes = Router::new().route("/", get(home::index));

    let mut router = Router::new().merge(health_routes).merge(home_routes);

    // Static files - replaces whatever Cache-Control the file service chose
    if let Some(dir) = state.config.http.static_dir.as_deref() {
        let static_routes = Router::new()
            .nest_service("/static", create_static_service(dir))
            .layer(SetResponseHeaderLayer::overriding(
                CACHE_CONTROL,
                HeaderValue::from_static(CACHE_CONTROL_STATIC),
            ));
        router = router.merge(static_routes);
    }

    router
        .with_state(state)
        // Request ID middleware - creates root span with request_id for correlation
        .layer(middleware::from_fn(request_id_layer))
}
