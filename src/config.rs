use ::config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::info;
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 30;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;
const DEFAULT_CURRENCY: &str = "INR";
const DEFAULT_GATEWAY_BASE_URL: &str = "https://api.razorpay.com";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// JWT secret used to validate bearer identity tokens
    /// (minimum 64 characters for enhanced security)
    #[validate(length(min = 64), custom = "validate_jwt_secret")]
    pub jwt_secret: String,

    /// JWT issuer name
    #[serde(default = "default_auth_issuer")]
    pub auth_issuer: String,

    /// JWT audience/subject
    #[serde(default = "default_auth_audience")]
    pub auth_audience: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Comma-separated list of allowed browser origins. Drives both the
    /// CORS layer and the checkout anti-CSRF origin check.
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback (development only unless forced)
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// CORS: allow credentials
    #[serde(default)]
    pub cors_allow_credentials: bool,

    /// Rate limiting for checkout endpoints: requests per window per user
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests_per_window: u32,

    /// Rate limiting: window size (seconds)
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_seconds: u64,

    /// Payment gateway key id (absent → gateway operations are refused
    /// with a distinguishable unavailability error)
    #[serde(default)]
    pub gateway_key_id: Option<String>,

    /// Payment gateway key secret, shared secret for callback signatures
    #[serde(default)]
    pub gateway_key_secret: Option<String>,

    /// Payment gateway API base URL
    #[serde(default = "default_gateway_base_url")]
    pub gateway_base_url: String,

    /// Currency code used for gateway orders
    #[serde(default = "default_currency")]
    pub default_currency: String,
}

impl AppConfig {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Permissive CORS is acceptable in development or when explicitly
    /// forced; production requires an explicit origin list.
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// The origins allowed to call checkout endpoints from a browser.
    pub fn allowed_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn default_auth_issuer() -> String {
    "storefront-api".to_string()
}
fn default_auth_audience() -> String {
    "storefront".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_rate_limit_requests() -> u32 {
    DEFAULT_RATE_LIMIT_REQUESTS
}
fn default_rate_limit_window_secs() -> u64 {
    DEFAULT_RATE_LIMIT_WINDOW_SECS
}
fn default_gateway_base_url() -> String {
    DEFAULT_GATEWAY_BASE_URL.to_string()
}
fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

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

fn validate_jwt_secret(secret: &str) -> Result<(), ValidationError> {
    let trimmed = secret.trim();

    if trimmed.len() < 64 {
        let mut err = ValidationError::new("jwt_secret");
        err.message =
            Some("JWT secret must be at least 64 characters for adequate security".into());
        return Err(err);
    }

    let lower = trimmed.to_ascii_lowercase();
    let weak_fragments = ["changeme", "password", "default", "12345", "abcdef"];
    if weak_fragments.iter().any(|pattern| lower.contains(pattern)) {
        let mut err = ValidationError::new("jwt_secret");
        err.message = Some(
            "JWT secret appears to be weak; use a cryptographically strong random string".into(),
        );
        return Err(err);
    }

    let unique_chars: std::collections::HashSet<char> = trimmed.chars().collect();
    if unique_chars.len() < 10 {
        let mut err = ValidationError::new("jwt_secret");
        err.message =
            Some("JWT secret must have at least 10 unique characters for adequate entropy".into());
        return Err(err);
    }

    Ok(())
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("storefront_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    // NOTE: jwt_secret has no default - it MUST be provided via environment
    // variable or config file. This prevents accidental use of insecure
    // defaults in production.
    let config = Config::builder()
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("jwt_secret").is_err() {
        return Err(AppConfigError::Validation(
            "jwt_secret must be set via APP__JWT_SECRET or a config file".to_string(),
        ));
    }

    let app_config: AppConfig = config.try_deserialize()?;
    app_config
        .validate()
        .map_err(|e| AppConfigError::Validation(e.to_string()))?;

    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRONG_SECRET: &str =
        "k9fQ2mX7vL4pR8sW1zG5hJ3nB6tY0cE9uI2oA7dK4gM8qV5xS1wZ3rT6yN0bH4jP";

    fn base_config() -> AppConfig {
        AppConfig {
            jwt_secret: STRONG_SECRET.to_string(),
            auth_issuer: default_auth_issuer(),
            auth_audience: default_auth_audience(),
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            cors_allowed_origins: Some("https://shop.example.com, https://admin.example.com".into()),
            cors_allow_any_origin: false,
            cors_allow_credentials: false,
            rate_limit_requests_per_window: default_rate_limit_requests(),
            rate_limit_window_seconds: default_rate_limit_window_secs(),
            gateway_key_id: None,
            gateway_key_secret: None,
            gateway_base_url: default_gateway_base_url(),
            default_currency: default_currency(),
        }
    }

    #[test]
    fn strong_secret_passes_validation() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn weak_jwt_secret_is_rejected() {
        let mut cfg = base_config();
        cfg.jwt_secret = "password".repeat(10);
        assert!(cfg.validate().is_err());

        cfg.jwt_secret = "a".repeat(80);
        assert!(cfg.validate().is_err());

        cfg.jwt_secret = "short".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn invalid_log_level_is_rejected() {
        let mut cfg = base_config();
        cfg.log_level = "verbose".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn allowed_origins_splits_and_trims() {
        let cfg = base_config();
        assert_eq!(
            cfg.allowed_origins(),
            vec![
                "https://shop.example.com".to_string(),
                "https://admin.example.com".to_string()
            ]
        );

        let mut no_origins = base_config();
        no_origins.cors_allowed_origins = None;
        assert!(no_origins.allowed_origins().is_empty());
    }

    #[test]
    fn permissive_cors_only_in_development_or_forced() {
        let mut cfg = base_config();
        assert!(cfg.should_allow_permissive_cors());

        cfg.environment = "production".to_string();
        assert!(!cfg.should_allow_permissive_cors());

        cfg.cors_allow_any_origin = true;
        assert!(cfg.should_allow_permissive_cors());
    }
}
