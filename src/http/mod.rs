//! HTTP server module.
//!
//! Plain HTTP only; TLS is expected to be terminated in front of the service.
//! The server includes:
//! - Peer address capture for client IP resolution
//! - Graceful shutdown on SIGTERM/SIGINT
//! - Static file serving for the optional `/static` directory

mod server;
mod shutdown;
pub mod static_files;

pub use server::{start_server, ServerError};
