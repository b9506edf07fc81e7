//! Configuration errors

use thiserror::Error;

/// Startup failure while reading or checking configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read ACCESS_RECONCILER settings: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Invalid ACCESS_RECONCILER settings: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// A setting that is missing or out of range. Names are the env suffix after
/// `ACCESS_RECONCILER__`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must be set")]
    MissingRequired(&'static str),

    #[error("SERVER__PORT must be non-zero")]
    InvalidPort,

    #[error("Cannot bind to {0}")]
    InvalidBindAddress(String),

    #[error("SERVER__REQUEST_TIMEOUT_SECS must be between 1 and 300")]
    InvalidTimeout,

    #[error("DATABASE__URL must be a postgres:// URL")]
    InvalidDatabaseUrl,

    #[error("DATABASE__MIN_CONNECTIONS exceeds DATABASE__MAX_CONNECTIONS")]
    InvalidPoolSize,

    #[error("DATABASE__MAX_CONNECTIONS is capped at 100")]
    PoolSizeTooLarge,

    #[error("{0} API base URL must be http(s)")]
    InvalidApiBaseUrl(&'static str),

    #[error("{0} call timeout must be between 1 and 60 seconds")]
    InvalidCallTimeout(&'static str),

    #[error("Sweeper interval must be at least 1 second")]
    InvalidSweepInterval,
}
