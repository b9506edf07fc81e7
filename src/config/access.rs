//! Chat platform configuration (Discord)

use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Bot token
    pub bot_token: Option<SecretString>,

    /// Community (guild) whose roles and channels are managed
    #[serde(default)]
    pub guild_id: String,

    /// Per-call deadline in seconds
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
}

impl AccessConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.bot_token.is_none() {
            return Err(ValidationError::MissingRequired("ACCESS__BOT_TOKEN"));
        }
        if self.guild_id.trim().is_empty() {
            return Err(ValidationError::MissingRequired("ACCESS__GUILD_ID"));
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(ValidationError::InvalidApiBaseUrl("Access"));
        }
        if !(1..=60).contains(&self.call_timeout_secs) {
            return Err(ValidationError::InvalidCallTimeout("Access"));
        }
        Ok(())
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            bot_token: None,
            guild_id: String::new(),
            call_timeout_secs: default_call_timeout(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_call_timeout() -> u64 {
    5
}
