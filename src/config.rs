//! Configuration system for Stockroom.
//!
//! Configuration is loaded from multiple sources with the following precedence:
//! 1. Environment variables (highest priority)
//! 2. `config.toml` file
//! 3. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `STOCKROOM_SERVER_HOST` - Server bind address
//! - `STOCKROOM_SERVER_PORT` - Server port
//! - `STOCKROOM_DATABASE_URL` - SQLite connection URL
//! - `STOCKROOM_LOGGING_ENABLED` - Emit info-level logs (otherwise warnings only)
//! - `STOCKROOM_LOG_LEVEL` - Log level (trace, debug, info, warn, error)
//! - `STOCKROOM_JWT_SECRET` - JWT secret key for signing/validation
//! - `STOCKROOM_JWT_ISSUER` - JWT issuer claim
//! - `STOCKROOM_JWT_AUDIENCE` - JWT audience claim
//! - `STOCKROOM_TOKEN_EXPIRATION_SECS` - Token lifetime in seconds

use config::Config;
use serde::Deserialize;
use std::env;
use std::sync::OnceLock;

use crate::errors::{StockroomError, StockroomResult};

/// Global configuration singleton.
static CONFIG: OnceLock<StockroomConfig> = OnceLock::new();

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StockroomConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Token authentication configuration
    pub auth: AuthConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection URL (`sqlite://path/to/file.db` or `sqlite::memory:`)
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://stockroom.db".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Enable logging at `level`; when false only warnings and errors are emitted
    pub enabled: bool,
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
        }
    }
}

/// JWT authentication configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// JWT secret key (use `env:VAR_NAME` to read from environment)
    pub jwt_secret: String,
    /// JWT issuer claim (iss)
    pub jwt_issuer: String,
    /// JWT audience claim (aud)
    pub jwt_audience: String,
    /// Token expiration time in seconds (default: 1 hour)
    pub token_expiration_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_issuer: "stockroom".to_string(),
            jwt_audience: "stockroom-api".to_string(),
            token_expiration_secs: 3600,
        }
    }
}

fn config_error(e: config::ConfigError) -> StockroomError {
    StockroomError::ConfigError(e.to_string())
}

impl StockroomConfig {
    /// Load configuration from file and environment.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. `config.toml` file (optional)
    /// 3. Environment variables
    pub fn load() -> StockroomResult<Self> {
        let defaults = Self::default();

        let builder = Config::builder()
            .set_default("server.host", defaults.server.host)
            .map_err(config_error)?
            .set_default("server.port", i64::from(defaults.server.port))
            .map_err(config_error)?
            .set_default("database.url", defaults.database.url)
            .map_err(config_error)?
            .set_default("logging.enabled", defaults.logging.enabled)
            .map_err(config_error)?
            .set_default("logging.level", defaults.logging.level)
            .map_err(config_error)?
            .set_default("auth.jwt_secret", defaults.auth.jwt_secret)
            .map_err(config_error)?
            .set_default("auth.jwt_issuer", defaults.auth.jwt_issuer)
            .map_err(config_error)?
            .set_default("auth.jwt_audience", defaults.auth.jwt_audience)
            .map_err(config_error)?
            .set_default(
                "auth.token_expiration_secs",
                defaults.auth.token_expiration_secs as i64,
            )
            .map_err(config_error)?
            // Load from config.toml (optional)
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables
            .set_override_option("server.host", env::var("STOCKROOM_SERVER_HOST").ok())
            .map_err(config_error)?
            .set_override_option(
                "server.port",
                env::var("STOCKROOM_SERVER_PORT")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok()),
            )
            .map_err(config_error)?
            .set_override_option("database.url", env::var("STOCKROOM_DATABASE_URL").ok())
            .map_err(config_error)?
            .set_override_option(
                "logging.enabled",
                env::var("STOCKROOM_LOGGING_ENABLED")
                    .ok()
                    .and_then(|v| v.parse::<bool>().ok()),
            )
            .map_err(config_error)?
            .set_override_option("logging.level", env::var("STOCKROOM_LOG_LEVEL").ok())
            .map_err(config_error)?
            .set_override_option("auth.jwt_secret", env::var("STOCKROOM_JWT_SECRET").ok())
            .map_err(config_error)?
            .set_override_option("auth.jwt_issuer", env::var("STOCKROOM_JWT_ISSUER").ok())
            .map_err(config_error)?
            .set_override_option(
                "auth.jwt_audience",
                env::var("STOCKROOM_JWT_AUDIENCE").ok(),
            )
            .map_err(config_error)?
            .set_override_option(
                "auth.token_expiration_secs",
                env::var("STOCKROOM_TOKEN_EXPIRATION_SECS")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok()),
            )
            .map_err(config_error)?;

        let settings = builder
            .build()
            .map_err(|e| StockroomError::ConfigError(format!("failed to build config: {e}")))?;

        settings.try_deserialize().map_err(|e| {
            StockroomError::ConfigError(format!("failed to deserialize config: {e}"))
        })
    }

    /// Validate the configuration.
    pub fn validate(&self) -> StockroomResult<()> {
        if self.server.port == 0 {
            return Err(StockroomError::ConfigError(
                "server.port must be greater than 0".to_string(),
            ));
        }

        if !self.database.url.starts_with("sqlite:") {
            return Err(StockroomError::ConfigError(format!(
                "database.url must be a sqlite URL, got '{}'",
                self.database.url
            )));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(StockroomError::ConfigError(format!(
                    "logging.level must be one of: trace, debug, info, warn, error. Got '{other}'"
                )));
            }
        }

        if self.auth.jwt_secret.is_empty() {
            return Err(StockroomError::ConfigError(
                "auth.jwt_secret is required (set STOCKROOM_JWT_SECRET)".to_string(),
            ));
        }

        if self.auth.token_expiration_secs == 0 {
            return Err(StockroomError::ConfigError(
                "auth.token_expiration_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Get the global configuration.
///
/// This loads the configuration on first access and caches it.
/// Returns an error if configuration loading or validation fails.
pub fn get_config() -> StockroomResult<&'static StockroomConfig> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }

    let config = StockroomConfig::load()?;
    config.validate()?;

    // Another thread may have won the race; either value is valid.
    Ok(CONFIG.get_or_init(|| config))
}

/// Initialize configuration explicitly.
///
/// Call this early in your application to catch configuration errors.
pub fn init_config() -> StockroomResult<&'static StockroomConfig> {
    get_config()
}
