//! Discord adapter
//!
//! Sends notifications as direct messages through the Discord REST API:
//! - [`DiscordClient`] implements `Delivery` (embeds) and `TargetResolver` (DM channels)
//! - [`DiscordConfig`] reads the bot token and API root from the environment

mod client;
mod config;

pub use client::DiscordClient;
pub use config::{DiscordConfig, DiscordConfigError, DEFAULT_DISCORD_API_URL};
