//! Static file serving.
//!
//! Files under the configured directory are served at `/static`. The
//! Cache-Control header is applied by the router, not here.

use tower_http::services::ServeDir;

/// Create a static file service rooted at `dir`.
pub fn create_static_service(dir: &str) -> ServeDir {
    ServeDir::new(dir)
}
