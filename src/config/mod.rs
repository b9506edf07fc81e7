//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `ACCESS_RECONCILER` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use access_reconciler::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod access;
mod catalog;
mod commerce;
mod database;
mod error;
mod server;
mod sweeper;

pub use access::AccessConfig;
pub use catalog::CatalogConfig;
pub use commerce::CommerceConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};
pub use sweeper::ExpirationConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Commerce platform API and webhook settings
    #[serde(default)]
    pub commerce: CommerceConfig,

    /// Chat platform API settings
    #[serde(default)]
    pub access: AccessConfig,

    /// Optional PostgreSQL store
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Expiration sweeper schedule
    #[serde(default)]
    pub sweeper: ExpirationConfig,

    /// Product catalog file
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `ACCESS_RECONCILER` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `ACCESS_RECONCILER__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `ACCESS_RECONCILER__ACCESS__GUILD_ID=...` -> `access.guild_id = ...`
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("ACCESS_RECONCILER")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// Production additionally requires a webhook secret and a database.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.commerce.validate(&self.server.environment)?;
        self.access.validate()?;
        self.database.validate()?;
        self.sweeper.validate()?;
        self.catalog.validate()?;
        if self.is_production() && !self.database.is_configured() {
            return Err(ValidationError::MissingRequired("DATABASE__URL"));
        }
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "ACCESS_RECONCILER__COMMERCE__API_TOKEN",
        "ACCESS_RECONCILER__COMMERCE__WEBHOOK_SECRET",
        "ACCESS_RECONCILER__ACCESS__BOT_TOKEN",
        "ACCESS_RECONCILER__ACCESS__GUILD_ID",
        "ACCESS_RECONCILER__DATABASE__URL",
        "ACCESS_RECONCILER__SERVER__PORT",
        "ACCESS_RECONCILER__SERVER__ENVIRONMENT",
        "ACCESS_RECONCILER__SWEEPER__INTERVAL_SECS",
    ];

    fn set_minimal_env() {
        env::set_var("ACCESS_RECONCILER__COMMERCE__API_TOKEN", "podia-token");
        env::set_var("ACCESS_RECONCILER__ACCESS__BOT_TOKEN", "bot-token");
        env::set_var("ACCESS_RECONCILER__ACCESS__GUILD_ID", "998877");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    fn load_with(extra: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        set_minimal_env();
        for (key, value) in extra {
            env::set_var(key, value);
        }
        let result = AppConfig::load();
        clear_env();
        result
    }

    #[test]
    fn test_load_from_environment() {
        let config = load_with(&[]).unwrap();
        assert_eq!(config.access.guild_id, "998877");
        assert!(config.commerce.api_token.is_some());
        assert!(config.commerce.webhook_secret.is_none());
        assert!(config.database.url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = load_with(&[]).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.sweeper.interval_secs, 3600);
        assert_eq!(config.commerce.call_timeout_secs, 5);
    }

    #[test]
    fn test_nested_overrides() {
        let config = load_with(&[
            ("ACCESS_RECONCILER__SERVER__PORT", "3000"),
            ("ACCESS_RECONCILER__SWEEPER__INTERVAL_SECS", "600"),
        ])
        .unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.sweeper.interval_secs, 600);
    }

    #[test]
    fn test_production_requires_secret_and_database() {
        let config =
            load_with(&[("ACCESS_RECONCILER__SERVER__ENVIRONMENT", "production")]).unwrap();
        assert!(config.is_production());
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("COMMERCE__WEBHOOK_SECRET"))
        );

        let config = load_with(&[
            ("ACCESS_RECONCILER__SERVER__ENVIRONMENT", "production"),
            ("ACCESS_RECONCILER__COMMERCE__WEBHOOK_SECRET", "whsec"),
        ])
        .unwrap();
        assert_eq!(config.validate(), Err(ValidationError::MissingRequired("DATABASE__URL")));

        let config = load_with(&[
            ("ACCESS_RECONCILER__SERVER__ENVIRONMENT", "production"),
            ("ACCESS_RECONCILER__COMMERCE__WEBHOOK_SECRET", "whsec"),
            ("ACCESS_RECONCILER__DATABASE__URL", "postgres://app@db/access"),
        ])
        .unwrap();
        assert!(config.validate().is_ok());
    }
}
