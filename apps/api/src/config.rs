//! API configuration module.
//!
//! Configuration is layered with the `config` crate:
//!
//! ```text
//! built-in defaults  ──►  aria.toml (optional)  ──►  ARIA_* environment
//!      lowest                                          highest
//! ```
//!
//! e.g. `ARIA_PORT=9000 ARIA_JWT_SECRET=... aria-api`

use serde::{Deserialize, Serialize};

/// API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Interface to bind
    pub host: String,

    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Maximum pooled SQLite connections
    pub database_max_connections: u32,

    /// Secret key for signing tokens (HS256)
    pub jwt_secret: String,

    /// Access token lifetime in seconds
    pub jwt_access_lifetime_secs: i64,

    /// Refresh token lifetime in seconds
    pub jwt_refresh_lifetime_secs: i64,

    /// Redis connection string; the in-process cache is used when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Lifetime of cached storefront responses
    pub cache_ttl_secs: u64,

    /// Absolute base URL used in pagination links
    pub public_base_url: String,

    /// Comma-separated allowed CORS origins; empty allows any origin
    pub cors_origins: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_path: "./aria.db".to_string(),
            database_max_connections: 10,
            jwt_secret: "aria-dev-secret-change-in-production".to_string(),
            jwt_access_lifetime_secs: 3600,
            jwt_refresh_lifetime_secs: 604_800,
            redis_url: None,
            cache_ttl_secs: 300,
            public_base_url: "http://localhost:8000".to_string(),
            cors_origins: String::new(),
        }
    }
}

impl ApiConfig {
    /// Loads defaults, then `aria.toml` if present, then `ARIA_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = ApiConfig::default();

        let settings = config::Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("database_path", defaults.database_path)?
            .set_default(
                "database_max_connections",
                i64::from(defaults.database_max_connections),
            )?
            .set_default("jwt_secret", defaults.jwt_secret)?
            .set_default("jwt_access_lifetime_secs", defaults.jwt_access_lifetime_secs)?
            .set_default("jwt_refresh_lifetime_secs", defaults.jwt_refresh_lifetime_secs)?
            .set_default("cache_ttl_secs", defaults.cache_ttl_secs)?
            .set_default("public_base_url", defaults.public_base_url)?
            .set_default("cors_origins", defaults.cors_origins)?
            .add_source(config::File::with_name("aria").required(false))
            .add_source(config::Environment::with_prefix("ARIA").try_parsing(true))
            .build()?;

        let config: ApiConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt_secret".to_string()));
        }
        if self.jwt_access_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("jwt_access_lifetime_secs".to_string()));
        }
        if self.jwt_refresh_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("jwt_refresh_lifetime_secs".to_string()));
        }
        if self.database_max_connections == 0 {
            return Err(ConfigError::InvalidValue("database_max_connections".to_string()));
        }
        Ok(())
    }

    /// `public_base_url` without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.public_base_url.trim_end_matches('/')
    }

    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}
