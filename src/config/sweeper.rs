//! Expiration sweeper configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::handlers::SweeperConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct ExpirationConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    #[serde(default = "default_initial_delay")]
    pub initial_delay_secs: u64,
}

impl ExpirationConfig {
    pub fn sweeper_config(&self) -> SweeperConfig {
        SweeperConfig::default()
            .with_interval(Duration::from_secs(self.interval_secs))
            .with_initial_delay(Duration::from_secs(self.initial_delay_secs))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.enabled && self.interval_secs == 0 {
            return Err(ValidationError::InvalidSweepInterval);
        }
        Ok(())
    }
}

impl Default for ExpirationConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_interval(),
            initial_delay_secs: default_initial_delay(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_interval() -> u64 {
    3600
}

fn default_initial_delay() -> u64 {
    60
}
