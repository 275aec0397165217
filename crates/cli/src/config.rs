// Process configuration
//
// `.env` is loaded first (if present) so every `from_env()` below sees it.

use anyhow::{Context, Result};
use ctfnotify_discord::DiscordConfig;
use ctfnotify_storage::DEFAULT_DATABASE_URL;
use ctfnotify_worker::{SchedulerConfig, SweeperConfig};

/// Load `.env` from the working directory, ignoring a missing file
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("warning: could not read .env: {}", e);
        }
    }
}

/// Database location from `DATABASE_URL`
pub fn database_url() -> String {
    std::env::var("DATABASE_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

/// Everything the long-running notifier needs
#[derive(Debug)]
pub struct NotifierConfig {
    pub database_url: String,
    pub discord: DiscordConfig,
    pub scheduler: SchedulerConfig,
    pub sweeper: SweeperConfig,
}

impl NotifierConfig {
    pub fn from_env() -> Result<Self> {
        let discord = DiscordConfig::from_env().context("Discord configuration")?;
        let scheduler = SchedulerConfig::from_env().context("scheduler configuration")?;
        let sweeper = SweeperConfig::from_env().context("sweeper configuration")?;

        scheduler
            .validate()
            .context("invalid scheduler configuration")?;
        sweeper
            .validate(&scheduler)
            .context("invalid sweeper configuration")?;

        Ok(Self {
            database_url: database_url(),
            discord,
            scheduler,
            sweeper,
        })
    }
}
