//! Discord REST client
//!
//! Rate limits follow Discord's guidance: short `Retry-After` waits are
//! honoured inline a few times, longer ones are reported as transient so the
//! caller retries on its next cycle.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use ctfnotify_core::{
    Delivery, DeliveryError, DeliveryTarget, Message, OwnerId, ResolveError, TargetResolver,
};
use parking_lot::RwLock;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::config::DiscordConfig;

/// Maximum number of attempts for rate-limited requests
const MAX_RATE_LIMIT_ATTEMPTS: u32 = 3;

/// Longest `Retry-After` waited out inline
const MAX_INLINE_RETRY_AFTER: Duration = Duration::from_secs(5);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// JSON error code for "Unknown User"
const UNKNOWN_USER_CODE: u64 = 10013;

#[derive(Debug, Deserialize)]
struct ChannelResponse {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<u64>,
    #[serde(default)]
    message: Option<String>,
}

/// Discord REST client
pub struct DiscordClient {
    config: DiscordConfig,
    client: Client,
    dm_channels: RwLock<HashMap<OwnerId, String>>,
}

impl DiscordClient {
    pub fn new(config: DiscordConfig) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("DiscordBot (ctfnotify, ", env!("CARGO_PKG_VERSION"), ")"))
            .build()
            .map_err(|e| DeliveryError::transient(e.to_string()))?;

        Ok(Self {
            config,
            client,
            dm_channels: RwLock::new(HashMap::new()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url, path)
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.config.token)
    }

    /// Cached DM channel for an owner, if resolved before
    pub fn cached_channel(&self, owner_id: OwnerId) -> Option<String> {
        self.dm_channels.read().get(&owner_id).cloned()
    }

    fn evict_channel(&self, owner_id: OwnerId) {
        self.dm_channels.write().remove(&owner_id);
    }

    /// Build the message payload for an embed
    fn build_payload(message: &Message) -> serde_json::Value {
        let fields: Vec<_> = message
            .fields
            .iter()
            .map(|f| json!({"name": f.name, "value": f.value, "inline": f.inline}))
            .collect();

        let mut embed = json!({
            "title": message.title,
            "description": message.description,
            "color": message.color,
        });
        if !fields.is_empty() {
            embed["fields"] = json!(fields);
        }

        json!({ "embeds": [embed] })
    }

    /// POST with rate limit handling
    ///
    /// Returns the final non-429 response, or a transient error once the
    /// attempts are used up or the server asks for a long wait.
    async fn post_with_retry(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<Response, DeliveryError> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            let response = self
                .client
                .post(url)
                .header("Authorization", self.auth_header())
                .json(payload)
                .send()
                .await
                .map_err(|e| DeliveryError::transient(format!("Discord request failed: {}", e)))?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }

            let retry_after = parse_retry_after(&response).unwrap_or(Duration::from_secs(1));
            if attempts >= MAX_RATE_LIMIT_ATTEMPTS || retry_after > MAX_INLINE_RETRY_AFTER {
                warn!(
                    attempts,
                    ?retry_after,
                    "Discord rate limit: giving up until next cycle"
                );
                return Err(DeliveryError::transient(format!(
                    "rate limited, retry after {:?}",
                    retry_after
                )));
            }

            debug!(
                "Discord rate limited (429), waiting {:?} before retry (attempt {}/{})",
                retry_after, attempts, MAX_RATE_LIMIT_ATTEMPTS
            );
            tokio::time::sleep(retry_after).await;
        }
    }
}

/// Parse the Retry-After duration from a 429 response
fn parse_retry_after(response: &Response) -> Option<Duration> {
    ["Retry-After", "X-RateLimit-Reset-After"]
        .iter()
        .filter_map(|name| response.headers().get(*name))
        .filter_map(|value| value.to_str().ok()?.parse::<f64>().ok())
        .find(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

async fn error_body(response: Response) -> ApiErrorBody {
    response.json().await.unwrap_or_default()
}

#[async_trait]
impl Delivery for DiscordClient {
    /// Poll `GET /users/@me` until the token is accepted
    ///
    /// A rejected token is permanent and returned as `Forbidden`; anything else
    /// is retried every `ready_retry_interval`.
    async fn wait_until_ready(&self) -> Result<(), DeliveryError> {
        let url = self.url("/users/@me");

        loop {
            let result = self
                .client
                .get(&url)
                .header("Authorization", self.auth_header())
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    info!("Discord connection ready");
                    return Ok(());
                }
                Ok(response) if response.status() == StatusCode::UNAUTHORIZED => {
                    warn!("Discord rejected the bot token");
                    return Err(DeliveryError::Forbidden);
                }
                Ok(response) => {
                    warn!(status = %response.status(), "Discord not ready, retrying");
                }
                Err(e) => {
                    warn!(error = %e, "Discord unreachable, retrying");
                }
            }

            tokio::time::sleep(self.config.ready_retry_interval).await;
        }
    }

    #[instrument(skip(self, message), fields(owner_id = target.owner_id, title = %message.title))]
    async fn deliver(&self, target: &DeliveryTarget, message: &Message) -> Result<(), DeliveryError> {
        let url = self.url(&format!("/channels/{}/messages", target.channel_id));
        let payload = Self::build_payload(message);

        let response = self.post_with_retry(&url, &payload).await?;
        let status = response.status();

        if status.is_success() {
            debug!("message delivered");
            return Ok(());
        }

        let body = error_body(response).await;
        match status {
            StatusCode::FORBIDDEN => {
                warn!(code = ?body.code, "Discord refused the message");
                Err(DeliveryError::Forbidden)
            }
            StatusCode::NOT_FOUND => {
                warn!("DM channel no longer exists");
                self.evict_channel(target.owner_id);
                Err(DeliveryError::NotFound)
            }
            _ => {
                warn!(%status, message = ?body.message, "Discord message failed");
                Err(DeliveryError::transient(format!(
                    "Discord returned {}: {}",
                    status,
                    body.message.unwrap_or_default()
                )))
            }
        }
    }
}

#[async_trait]
impl TargetResolver for DiscordClient {
    #[instrument(skip(self))]
    async fn resolve(&self, owner_id: OwnerId) -> Result<DeliveryTarget, ResolveError> {
        if let Some(channel_id) = self.cached_channel(owner_id) {
            return Ok(DeliveryTarget {
                owner_id,
                channel_id,
            });
        }

        let url = self.url("/users/@me/channels");
        let payload = json!({ "recipient_id": owner_id.to_string() });

        let response = self
            .post_with_retry(&url, &payload)
            .await
            .map_err(|e| ResolveError::Transient(e.to_string()))?;
        let status = response.status();

        if status.is_success() {
            let channel: ChannelResponse = response
                .json()
                .await
                .map_err(|e| ResolveError::Transient(format!("invalid channel response: {}", e)))?;

            debug!(channel_id = %channel.id, "opened DM channel");
            self.dm_channels
                .write()
                .insert(owner_id, channel.id.clone());

            return Ok(DeliveryTarget {
                owner_id,
                channel_id: channel.id,
            });
        }

        let body = error_body(response).await;
        if status == StatusCode::NOT_FOUND || body.code == Some(UNKNOWN_USER_CODE) {
            return Err(ResolveError::NotFound(owner_id));
        }

        Err(ResolveError::Transient(format!(
            "Discord returned {}: {}",
            status,
            body.message.unwrap_or_default()
        )))
    }
}
