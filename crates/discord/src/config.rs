//! Discord client configuration

use std::time::Duration;

pub const DEFAULT_DISCORD_API_URL: &str = "https://discord.com/api/v10";

const DEFAULT_READY_RETRY_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum DiscordConfigError {
    #[error("DISCORD_TOKEN is not set")]
    MissingToken,
}

/// Discord client configuration
#[derive(Clone)]
pub struct DiscordConfig {
    /// Bot token, sent as `Authorization: Bot <token>`
    pub token: String,
    /// REST API root without trailing slash
    pub api_url: String,
    /// Delay between readiness probes
    pub ready_retry_interval: Duration,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("ready_retry_interval", &self.ready_retry_interval)
            .finish()
    }
}

impl DiscordConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_url: DEFAULT_DISCORD_API_URL.to_string(),
            ready_retry_interval: DEFAULT_READY_RETRY_INTERVAL,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `DISCORD_TOKEN`: Bot token (required)
    /// - `DISCORD_API_URL`: REST API root (default: https://discord.com/api/v10)
    pub fn from_env() -> Result<Self, DiscordConfigError> {
        let token = std::env::var("DISCORD_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(DiscordConfigError::MissingToken)?;

        let mut config = Self::new(token);
        if let Ok(url) = std::env::var("DISCORD_API_URL") {
            if !url.trim().is_empty() {
                config = config.with_api_url(url);
            }
        }
        Ok(config)
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_ready_retry_interval(mut self, interval: Duration) -> Self {
        self.ready_retry_interval = interval;
        self
    }
}
