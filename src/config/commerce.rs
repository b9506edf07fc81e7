//! Commerce platform configuration (Podia)

use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;

#[derive(Debug, Clone, Deserialize)]
pub struct CommerceConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// API bearer token
    pub api_token: Option<SecretString>,

    /// Shared secret for webhook signatures. Unset disables verification.
    pub webhook_secret: Option<SecretString>,

    /// Per-call deadline in seconds
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
}

impl CommerceConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.api_token.is_none() {
            return Err(ValidationError::MissingRequired("COMMERCE__API_TOKEN"));
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(ValidationError::InvalidApiBaseUrl("Commerce"));
        }
        if !(1..=60).contains(&self.call_timeout_secs) {
            return Err(ValidationError::InvalidCallTimeout("Commerce"));
        }
        if *environment == Environment::Production && self.webhook_secret.is_none() {
            return Err(ValidationError::MissingRequired("COMMERCE__WEBHOOK_SECRET"));
        }
        Ok(())
    }
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_token: None,
            webhook_secret: None,
            call_timeout_secs: default_call_timeout(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.podia.com/v1".to_string()
}

fn default_call_timeout() -> u64 {
    5
}
