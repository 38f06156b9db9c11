use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::services::DEFAULT_REVALIDATION_DELAY;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATABASE_URL: &str = "sqlite://coupons.db?mode=rwc";
const DEFAULT_REVALIDATION_DELAY_MS: u64 = DEFAULT_REVALIDATION_DELAY.as_millis() as u64;
const CONFIG_DIR: &str = "config";

/// Database URL that selects the process-local store instead of a SQL pool
pub const IN_MEMORY_DATABASE_URL: &str = "memory://";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL (`postgres://`, `sqlite:` or `memory://`)
    #[validate(custom = "validate_database_url")]
    pub database_url: String,

    /// Server host
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[validate(length(min = 1))]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Delay before a freshly created coupon is re-validated
    #[serde(default = "default_revalidation_delay_ms")]
    pub revalidation_delay_ms: u64,

    /// Comma separated list of allowed CORS origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB connect timeout (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,

    /// DB idle timeout (seconds)
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,

    /// DB acquire timeout (seconds)
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_DATABASE_URL.to_string(),
            DEFAULT_HOST.to_string(),
            DEFAULT_PORT,
            DEFAULT_ENV.to_string(),
        )
    }
}

impl AppConfig {
    /// Creates a new configuration
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            revalidation_delay_ms: default_revalidation_delay_ms(),
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
        }
    }

    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Whether coupons live in process memory rather than a database
    pub fn uses_in_memory_store(&self) -> bool {
        self.database_url.starts_with(IN_MEMORY_DATABASE_URL)
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    pub fn revalidation_delay(&self) -> Duration {
        Duration::from_millis(self.revalidation_delay_ms)
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        for (field, value) in [
            ("port", u64::from(self.port)),
            ("revalidation_delay_ms", self.revalidation_delay_ms),
            ("db_max_connections", u64::from(self.db_max_connections)),
        ] {
            if value == 0 {
                let mut err = ValidationError::new("range");
                err.message = Some("Must be greater than zero".into());
                errors.add(field, err);
            }
        }

        if self.db_min_connections > self.db_max_connections {
            let mut err = ValidationError::new("db_min_connections");
            err.message = Some("Must not exceed db_max_connections".into());
            errors.add("db_min_connections", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_revalidation_delay_ms() -> u64 {
    DEFAULT_REVALIDATION_DELAY_MS
}

fn default_db_max_connections() -> u32 {
    16
}
fn default_db_min_connections() -> u32 {
    2
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    30
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_database_url(url: &str) -> Result<(), ValidationError> {
    let supported = ["postgres://", "postgresql://", "sqlite:", IN_MEMORY_DATABASE_URL];
    if supported.iter().any(|scheme| url.starts_with(scheme)) {
        Ok(())
    } else {
        let mut err = ValidationError::new("database_url");
        err.message = Some("Must start with postgres://, sqlite: or memory://".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("coupon_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration from `./config`
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(Path::new(CONFIG_DIR))
}

/// Same layering as [`load_config`], reading files from `config_dir`.
pub fn load_config_from(config_dir: &Path) -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let config = Config::builder()
        .set_default("database_url", DEFAULT_DATABASE_URL)?
        .set_default("host", DEFAULT_HOST)?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("revalidation_delay_ms", DEFAULT_REVALIDATION_DELAY_MS as i64)?
        .add_source(File::from(config_dir.join("default")).required(false))
        .add_source(File::from(config_dir.join(&run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config_dir_with(default_content: &str) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("default.toml"), default_content).unwrap();
        temp_dir
    }

    #[test]
    fn defaults_apply_without_files() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nowhere");

        let config = load_config_from(&missing).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.revalidation_delay(), Duration::from_secs(3));
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = config_dir_with(
            r#"
            database_url = "memory://"
            host = "127.0.0.1"
            port = 9090
            environment = "development"
            log_level = "debug"
            revalidation_delay_ms = 250
        "#,
        );

        let config = load_config_from(dir.path()).unwrap();

        assert!(config.uses_in_memory_store());
        assert_eq!(config.port, 9090);
        assert_eq!(config.revalidation_delay(), Duration::from_millis(250));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = config_dir_with(
            r#"
            database_url = "mysql://localhost/coupons"
            host = "127.0.0.1"
            environment = "development"
            log_level = "loud"
        "#,
        );

        match load_config_from(dir.path()) {
            Err(AppConfigError::Validation(errors)) => {
                let fields = errors.field_errors();
                assert!(fields.contains_key("database_url"));
                assert!(fields.contains_key("log_level"));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn zero_revalidation_delay_is_rejected() {
        let dir = config_dir_with(
            r#"
            database_url = "memory://"
            host = "127.0.0.1"
            environment = "development"
            revalidation_delay_ms = 0
        "#,
        );

        match load_config_from(dir.path()) {
            Err(AppConfigError::Validation(errors)) => {
                assert!(errors.field_errors().contains_key("revalidation_delay_ms"));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn unknown_keys_fail_to_load() {
        let dir = config_dir_with(
            r#"
            redis_url = "redis://localhost"
        "#,
        );

        assert!(matches!(
            load_config_from(dir.path()),
            Err(AppConfigError::Load(_))
        ));
    }
}
