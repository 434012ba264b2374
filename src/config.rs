//! Configuration loading and constants.
//!
//! Loads application configuration from a TOML file, applies `DBPULSE_DB_*`
//! environment overrides on top, and defines constants for HTTP cache headers,
//! log-reader limits, logging defaults and default paths. `AppConfig` is the
//! root configuration struct containing all settings.

use const_format::formatcp;
use serde::Deserialize;
use std::path::Path;

// =============================================================================
// HTTP Response Cache Control
// =============================================================================

/// Static assets - one hour, matching what proxies in front of us expect
pub const HTTP_CACHE_STATIC_MAX_AGE: u32 = 3600;

pub const CACHE_CONTROL_STATIC: &str = formatcp!("public, max-age={}", HTTP_CACHE_STATIC_MAX_AGE);

/// Health responses must never be served from a cache
pub const CACHE_CONTROL_NO_STORE: &str = "no-store";

// =============================================================================
// Audit Log Constants
// =============================================================================

/// Rows returned by `/health/logs` when `limit` is missing or invalid
pub const DEFAULT_LOG_LIMIT: u32 = 50;

/// Upper bound on `limit` for `/health/logs`
pub const MAX_LOG_LIMIT: u32 = 1000;

// =============================================================================
// Database Defaults
// =============================================================================

/// Connection attempt timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Liveness probe statement
pub const DEFAULT_PROBE_QUERY: &str = "SELECT 1";

pub const DEFAULT_DB_HOST: &str = "localhost";

pub const DEFAULT_MYSQL_PORT: u16 = 3306;

// =============================================================================
// Default Paths and Strings
// =============================================================================

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Default log filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "dbpulse=debug,tower_http=info,sqlx=warn";

/// Prefix for environment variables that override `[database]` settings
pub const ENV_PREFIX: &str = "DBPULSE_DB_";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub http: HttpServerConfig,
    /// Database endpoint
    pub database: DatabaseConfig,
    /// Audit table behaviour
    #[serde(default)]
    pub audit: AuditConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "HttpServerConfig::default_host")]
    pub host: String,
    #[serde(default = "HttpServerConfig::default_port")]
    pub port: u16,
    /// Directory served under `/static`. Disabled when unset.
    pub static_dir: Option<String>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            static_dir: None,
        }
    }
}

impl HttpServerConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        5000
    }
}

/// Which driver the store adapter uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// MariaDB or MySQL server
    MySql,
    /// SQLite database file
    Sqlite,
}

/// Database endpoint configuration. Read once at startup.
#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "DatabaseConfig::default_backend")]
    pub backend: Backend,
    #[serde(default = "DatabaseConfig::default_host")]
    pub host: String,
    #[serde(default = "DatabaseConfig::default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Database (schema) name on the server
    pub name: Option<String>,
    /// Database file for the sqlite backend
    pub path: Option<String>,
    /// Bound on each connection attempt
    #[serde(default = "DatabaseConfig::default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "DatabaseConfig::default_probe_query")]
    pub probe_query: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: Self::default_backend(),
            host: Self::default_host(),
            port: Self::default_port(),
            username: String::new(),
            password: String::new(),
            name: None,
            path: None,
            connect_timeout_secs: Self::default_connect_timeout(),
            probe_query: Self::default_probe_query(),
        }
    }
}

// Hand-written so the password never reaches the logs.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("probe_query", &self.probe_query)
            .finish()
    }
}

impl DatabaseConfig {
    fn default_backend() -> Backend {
        Backend::MySql
    }

    fn default_host() -> String {
        DEFAULT_DB_HOST.to_string()
    }

    fn default_port() -> u16 {
        DEFAULT_MYSQL_PORT
    }

    fn default_connect_timeout() -> u64 {
        DEFAULT_CONNECT_TIMEOUT_SECS
    }

    fn default_probe_query() -> String {
        DEFAULT_PROBE_QUERY.to_string()
    }

    /// Configuration for a SQLite file store with all other settings defaulted.
    pub fn sqlite<P: AsRef<Path>>(path: P) -> Self {
        Self {
            backend: Backend::Sqlite,
            path: Some(path.as_ref().to_string_lossy().into_owned()),
            ..Self::default()
        }
    }

    /// Host name reported in health responses
    pub fn display_host(&self) -> &str {
        match self.backend {
            Backend::MySql => &self.host,
            Backend::Sqlite => DEFAULT_DB_HOST,
        }
    }

    /// Database name (or file path) reported in health responses
    pub fn display_database(&self) -> &str {
        let name = match self.backend {
            Backend::MySql => self.name.as_deref(),
            Backend::Sqlite => self.path.as_deref(),
        };
        name.unwrap_or_default()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "database.connect_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.probe_query.trim().is_empty() {
            return Err(ConfigError::Validation(
                "database.probe_query must not be empty".to_string(),
            ));
        }
        match self.backend {
            Backend::MySql => {
                if self.host.is_empty() {
                    return Err(ConfigError::Validation(
                        "database.host is required for the mysql backend".to_string(),
                    ));
                }
                if self.name.as_deref().map_or(true, str::is_empty) {
                    return Err(ConfigError::Validation(
                        "database.name is required for the mysql backend".to_string(),
                    ));
                }
            }
            Backend::Sqlite => {
                if self.path.as_deref().map_or(true, str::is_empty) {
                    return Err(ConfigError::Validation(
                        "database.path is required for the sqlite backend".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Audit table configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// When true (default), failing to write the audit row fails the health check
    #[serde(default = "AuditConfig::default_required")]
    pub required: bool,
    #[serde(default = "AuditConfig::default_log_limit")]
    pub default_log_limit: u32,
    #[serde(default = "AuditConfig::default_max_log_limit")]
    pub max_log_limit: u32,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            required: Self::default_required(),
            default_log_limit: Self::default_log_limit(),
            max_log_limit: Self::default_max_log_limit(),
        }
    }
}

impl AuditConfig {
    fn default_required() -> bool {
        true
    }

    fn default_log_limit() -> u32 {
        DEFAULT_LOG_LIMIT
    }

    fn default_max_log_limit() -> u32 {
        MAX_LOG_LIMIT
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_log_limit == 0 || self.max_log_limit == 0 {
            return Err(ConfigError::Validation(
                "audit log limits must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable
    #[default]
    Text,
    /// Structured, one JSON object per line
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

impl AppConfig {
    /// Build a configuration around the given database with every other section defaulted.
    pub fn with_database(database: DatabaseConfig) -> Self {
        Self {
            http: HttpServerConfig::default(),
            database,
            audit: AuditConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: AppConfig = toml::from_str(&contents)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `DBPULSE_DB_*` values onto the `[database]` section.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| lookup(&format!("{ENV_PREFIX}{suffix}"));
        let db = &mut self.database;

        if let Some(host) = var("HOST") {
            db.host = host;
        }
        if let Some(port) = var("PORT") {
            db.port = port.parse().map_err(|_| {
                ConfigError::Validation(format!("{ENV_PREFIX}PORT is not a valid port: {port}"))
            })?;
        }
        if let Some(user) = var("USER") {
            db.username = user;
        }
        if let Some(password) = var("PASSWORD") {
            db.password = password;
        }
        if let Some(name) = var("NAME") {
            db.name = Some(name);
        }
        if let Some(path) = var("PATH") {
            db.path = Some(path);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.audit.validate()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const MYSQL_CONFIG: &str = r#"
        [http]
        port = 8080

        [database]
        backend = "mysql"
        host = "db.internal"
        username = "monitor"
        password = "hunter2"
        name = "inventory"
    "#;

    #[test]
    fn test_parse_mysql_config_with_defaults() {
        let config: AppConfig = toml::from_str(MYSQL_CONFIG).unwrap();
        config.validate().unwrap();

        assert_eq!(config.http.host, "0.0.0.0");
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.database.backend, Backend::MySql);
        assert_eq!(config.database.port, 3306);
        assert_eq!(config.database.connect_timeout_secs, 5);
        assert_eq!(config.database.probe_query, "SELECT 1");
        assert!(config.audit.required);
        assert_eq!(config.audit.default_log_limit, 50);
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_parse_sqlite_config() {
        let config: AppConfig = toml::from_str(
            r#"
            [database]
            backend = "sqlite"
            path = "/var/lib/dbpulse/audit.db"

            [audit]
            required = false

            [logging]
            format = "json"
            "#,
        )
        .unwrap();
        config.validate().unwrap();

        assert_eq!(config.database.display_host(), "localhost");
        assert_eq!(config.database.display_database(), "/var/lib/dbpulse/audit.db");
        assert!(!config.audit.required);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_mysql_requires_database_name() {
        let config: AppConfig = toml::from_str("[database]\nbackend = \"mysql\"\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_sqlite_requires_path() {
        let config: AppConfig = toml::from_str("[database]\nbackend = \"sqlite\"\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = AppConfig::with_database(DatabaseConfig::sqlite("audit.db"));
        config.database.connect_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides_replace_file_values() {
        let mut config: AppConfig = toml::from_str(MYSQL_CONFIG).unwrap();
        let env: HashMap<&str, &str> = [
            ("DBPULSE_DB_HOST", "replica.internal"),
            ("DBPULSE_DB_PORT", "3307"),
            ("DBPULSE_DB_PASSWORD", "s3cret"),
        ]
        .into_iter()
        .collect();

        config
            .apply_env_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.database.host, "replica.internal");
        assert_eq!(config.database.port, 3307);
        assert_eq!(config.database.password, "s3cret");
        assert_eq!(config.database.username, "monitor");
        assert_eq!(config.database.name.as_deref(), Some("inventory"));
    }

    #[test]
    fn test_env_override_bad_port() {
        let mut config: AppConfig = toml::from_str(MYSQL_CONFIG).unwrap();
        let result = config.apply_env_overrides(|key| {
            (key == "DBPULSE_DB_PORT").then(|| "not-a-port".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config: AppConfig = toml::from_str(MYSQL_CONFIG).unwrap();
        let rendered = format!("{:?}", config.database);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_shipped_config_parses() {
        let config: AppConfig = toml::from_str(include_str!("../config/default.toml")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.http.port, 5000);
        assert!(config.http.static_dir.is_none());
    }

    #[test]
    fn test_static_cache_header() {
        assert_eq!(CACHE_CONTROL_STATIC, "public, max-age=3600");
    }
}
