//! Runtime configuration for sqlrest.

use serde::{Deserialize, Serialize};

/// Main application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    // ========================================================================
    // Database Settings
    // ========================================================================
    /// SQLite database file path, or `:memory:` for an in-memory database.
    #[serde(default = "default_db_uri")]
    pub db_uri: String,

    /// Connection pool size. An in-memory database only has one database to
    /// share, so the default is 1; a file-backed database can use several
    /// readers concurrently and defaults higher.
    #[serde(default = "default_pool_size")]
    pub db_pool_size: u32,

    /// Pool acquisition timeout in seconds.
    #[serde(default = "default_pool_timeout")]
    pub db_pool_timeout: u64,

    /// Maximum rows allowed in a response.
    pub db_max_rows: Option<i64>,

    // ========================================================================
    // Server Settings
    // ========================================================================
    /// Server host to bind.
    #[serde(default = "default_host")]
    pub server_host: String,

    /// Server port.
    #[serde(default = "default_port")]
    pub server_port: u16,

    // ========================================================================
    // JWT Settings
    // ========================================================================
    /// JWT secret key.
    pub jwt_secret: Option<String>,

    /// JWT secret given as base64.
    #[serde(default)]
    pub jwt_secret_is_base64: bool,

    /// JWT audience claim to validate.
    pub jwt_aud: Option<String>,

    /// JWT claim that contains the role.
    #[serde(default = "default_jwt_role_claim")]
    pub jwt_role_claim_key: String,

    /// Role assumed for requests with no `Authorization` header. `None`
    /// means unauthenticated requests are rejected with `401`.
    #[serde(default = "default_anon_role")]
    pub anon_role: Option<String>,

    // ========================================================================
    // Logging Settings
    // ========================================================================
    /// Log level: crit, error, warn, info, debug.
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_uri: default_db_uri(),
            db_pool_size: default_pool_size(),
            db_pool_timeout: default_pool_timeout(),
            db_max_rows: None,
            server_host: default_host(),
            server_port: default_port(),
            jwt_secret: None,
            jwt_secret_is_base64: false,
            jwt_aud: None,
            jwt_role_claim_key: default_jwt_role_claim(),
            anon_role: default_anon_role(),
            log_level: LogLevel::Error,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(uri) = std::env::var("SQLREST_DB_URI") {
            config.db_uri = uri;
        }
        if let Ok(uri) = std::env::var("DATABASE_URL") {
            config.db_uri = uri;
        }
        if config.db_uri == ":memory:" {
            config.db_pool_size = 1;
        }
        if let Ok(size) = std::env::var("SQLREST_DB_POOL") {
            if let Ok(n) = size.parse() {
                config.db_pool_size = n;
            }
        }
        if let Ok(max_rows) = std::env::var("SQLREST_DB_MAX_ROWS") {
            if let Ok(n) = max_rows.parse() {
                config.db_max_rows = Some(n);
            }
        }
        if let Ok(secret) = std::env::var("SQLREST_JWT_SECRET") {
            config.jwt_secret = Some(secret);
        }
        if let Ok(aud) = std::env::var("SQLREST_JWT_AUD") {
            config.jwt_aud = Some(aud);
        }
        if let Ok(claim) = std::env::var("SQLREST_JWT_ROLE_CLAIM_KEY") {
            config.jwt_role_claim_key = claim;
        }
        if let Ok(role) = std::env::var("SQLREST_ANON_ROLE") {
            config.anon_role = if role.is_empty() { None } else { Some(role) };
        }
        if let Ok(host) = std::env::var("SQLREST_SERVER_HOST") {
            config.server_host = host;
        }
        if let Ok(port) = std::env::var("SQLREST_SERVER_PORT") {
            if let Ok(p) = port.parse() {
                config.server_port = p;
            }
        }
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(p) = port.parse() {
                config.server_port = p;
            }
        }
        if let Ok(level) = std::env::var("SQLREST_LOG_LEVEL") {
            if let Some(parsed) = LogLevel::from_str(&level) {
                config.log_level = parsed;
            }
        }

        config
    }
}

/// Log levels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Crit,
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub fn to_tracing(&self) -> tracing::Level {
        match self {
            Self::Crit | Self::Error => tracing::Level::ERROR,
            Self::Warn => tracing::Level::WARN,
            Self::Info => tracing::Level::INFO,
            Self::Debug => tracing::Level::DEBUG,
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "crit" => Some(Self::Crit),
            "error" => Some(Self::Error),
            "warn" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            _ => None,
        }
    }
}

fn default_db_uri() -> String {
    ":memory:".to_string()
}

fn default_pool_size() -> u32 {
    5
}

fn default_pool_timeout() -> u64 {
    10
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_jwt_role_claim() -> String {
    "role".to_string()
}

fn default_anon_role() -> Option<String> {
    Some("anon".to_string())
}

fn default_log_level() -> LogLevel {
    LogLevel::Error
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.db_uri, ":memory:");
    }

    #[test]
    fn test_log_level_from_str() {
        assert_eq!(LogLevel::from_str("debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str("bogus"), None);
    }
}
