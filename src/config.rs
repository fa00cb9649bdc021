use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

const CONFIG_DIR: &str = "config";
const DEFAULT_ENV: &str = "development";
const DEFAULT_DATABASE_URL: &str = "sqlite://quartermaster.db?mode=rwc";

/// Runtime settings for the reservation engine. Embedding applications
/// load one through [`load_config`] or assemble one in code; the test
/// harness does the latter over an in-memory SQLite database.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Connection URL for the backing database.
    pub database_url: String,

    /// Deployment environment name, e.g. `development` or `production`.
    pub environment: String,

    /// Apply pending migrations when the engine starts.
    #[serde(default)]
    pub auto_migrate: bool,

    /// Default tracing level when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Emit log lines as JSON instead of human-readable text.
    #[serde(default)]
    pub log_json: bool,

    /// Connection pool bounds. Submissions serialize on row locks, so the
    /// pool rarely needs to be large; tests pin it to a single connection.
    #[serde(default = "default_pool_max")]
    pub db_max_connections: u32,
    #[serde(default = "default_pool_min")]
    pub db_min_connections: u32,

    /// Pool timeouts, in seconds.
    #[serde(default = "default_connect_timeout")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub db_acquire_timeout_secs: u64,

    /// Buffer size of the in-process event channel.
    #[serde(default = "default_event_capacity")]
    #[validate(custom = "validate_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Permanently reduce physical stock when a returned unit comes back
    /// Broken or Lost. Off by default: most events repair or recover items
    /// after the fact and restock by hand.
    #[serde(default)]
    pub retire_lost_stock: bool,
}

impl AppConfig {
    /// A config with built-in defaults for everything except the
    /// connection URL and environment.
    pub fn new(database_url: String, environment: String) -> Self {
        Self {
            database_url,
            environment,
            auto_migrate: false,
            log_level: default_log_level(),
            log_json: false,
            db_max_connections: default_pool_max(),
            db_min_connections: default_pool_min(),
            db_connect_timeout_secs: default_connect_timeout(),
            db_idle_timeout_secs: default_idle_timeout(),
            db_acquire_timeout_secs: default_acquire_timeout(),
            event_channel_capacity: default_event_capacity(),
            retire_lost_stock: false,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration rejected: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_pool_max() -> u32 {
    16
}
fn default_pool_min() -> u32 {
    2
}
fn default_connect_timeout() -> u64 {
    30
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_acquire_timeout() -> u64 {
    8
}
fn default_event_capacity() -> usize {
    1024
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    match level.to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => {
            let mut err = ValidationError::new("log_level");
            err.message = Some("Expected one of trace, debug, info, warn, error".into());
            Err(err)
        }
    }
}

fn validate_event_channel_capacity(capacity: usize) -> Result<(), ValidationError> {
    if capacity > 0 {
        return Ok(());
    }
    let mut err = ValidationError::new("event_channel_capacity");
    err.message = Some("Event channel needs room for at least one event".into());
    Err(err)
}

/// Installs the global tracing subscriber. `RUST_LOG` wins over the
/// configured level; calling this twice is harmless.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let directive = env::var("RUST_LOG")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| format!("quartermaster_api={}", level));

    if json {
        let _ = fmt().with_env_filter(directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(directive).try_init();
    }
}

/// Loads configuration by layering, from weakest to strongest: built-in
/// defaults, `config/default.toml`, `config/<env>.toml`, then `APP__*`
/// environment variables. The profile comes from `RUN_ENV` or `APP_ENV`.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!(environment = %run_env, "Loading configuration");

    let layered = Config::builder()
        .set_default("database_url", DEFAULT_DATABASE_URL)?
        .set_default("environment", run_env.as_str())?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let cfg: AppConfig = layered.try_deserialize()?;
    cfg.validate().map_err(|e| {
        error!(error = ?e, "Configuration rejected");
        AppConfigError::Validation(e)
    })?;

    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite://quartermaster.db?mode=memory".into(),
            "development".into(),
        )
    }

    #[test]
    fn defaults_pass_validation() {
        let cfg = base_config();
        assert!(cfg.validate().is_ok());
        assert!(!cfg.retire_lost_stock);
        assert!(!cfg.auto_migrate);
    }

    #[test]
    fn bad_log_level_fails_validation() {
        let mut cfg = base_config();
        cfg.log_level = "verbose".into();
        let errors = cfg.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("log_level"));
    }

    #[test]
    fn zero_event_capacity_fails_validation() {
        let mut cfg = base_config();
        cfg.event_channel_capacity = 0;
        let errors = cfg.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("event_channel_capacity"));
    }

    #[test]
    fn environment_helpers() {
        let mut cfg = base_config();
        assert!(cfg.is_development());
        assert!(!cfg.is_production());
        cfg.environment = "Production".into();
        assert!(cfg.is_production());
    }

    #[test]
    fn load_config_falls_back_to_defaults() {
        // No config directory in the test working dir, so only built-in
        // defaults and APP__* variables apply.
        let cfg = load_config().expect("defaults should load");
        assert_eq!(cfg.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(cfg.db_max_connections, default_pool_max());
        assert!(!cfg.log_json);
    }
}
