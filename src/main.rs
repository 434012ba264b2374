//! dbpulse: database liveness endpoint.
//!
//! This is the application entry point. It loads configuration from a TOML
//! file, initializes tracing, makes sure the audit table exists, sets up the
//! Axum router and starts the HTTP server.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dbpulse::config::{AppConfig, LogFormat, DEFAULT_CONFIG_PATH, DEFAULT_LOG_FILTER};
use dbpulse::http::start_server;
use dbpulse::store::schema::{audit_table_exists, ensure_schema};
use dbpulse::{create_router, AppState};

/// dbpulse: database liveness endpoint with an audit trail
#[derive(Parser, Debug)]
#[command(name = "dbpulse", version, about)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Log level filter (e.g., "dbpulse=debug,tower_http=info")
    #[arg(short, long)]
    log_level: Option<String>,

    /// Create the audit table and exit without serving
    #[arg(long)]
    init_schema_only: bool,
}

fn init_tracing(log_filter: &str, format: LogFormat) {
    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(log_filter));

    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Configuration decides the log format, so it is loaded first
    let config = AppConfig::load(&args.config)?;

    // Initialize tracing with priority: CLI > env > default
    let log_filter = args
        .log_level
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    init_tracing(&log_filter, config.logging.format);

    tracing::info!(
        config = %args.config,
        backend = ?config.database.backend,
        host = %config.database.display_host(),
        database = %config.database.display_database(),
        audit_required = config.audit.required,
        "Loaded configuration"
    );

    let state = AppState::new(config);

    // Non-fatal: health checks report a missing table per request
    ensure_schema(&state.store).await;

    if args.init_schema_only {
        let mut conn = state.store.open().await?;
        let exists = audit_table_exists(&mut conn).await;
        if let Err(e) = conn.close().await {
            tracing::warn!(error = %e, "Failed to close database connection cleanly");
        }
        if !exists? {
            return Err("audit table health_checks is missing after schema setup".into());
        }
        tracing::info!("Schema ready, exiting");
        return Ok(());
    }

    let app = create_router(state.clone());
    start_server(app, &state.config.http).await?;

    Ok(())
}
