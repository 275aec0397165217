// CTFtime REST client
//
// Implements the EventCatalog trait from ctfnotify-core.

use std::time::Duration;

use async_trait::async_trait;
use ctfnotify_core::{CatalogError, EventCatalog, NewEvent};
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, warn};

use crate::types::CtftimeEvent;

pub const DEFAULT_CTFTIME_API_URL: &str = "https://ctftime.org/api/v1";

const USER_AGENT: &str = concat!("ctfnotify/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// CTFtime event catalog
#[derive(Clone)]
pub struct CtftimeClient {
    client: Client,
    base_url: String,
}

impl CtftimeClient {
    /// Create a client for the public CTFtime API
    pub fn new() -> Result<Self, CatalogError> {
        Self::with_base_url(DEFAULT_CTFTIME_API_URL)
    }

    /// Create a client for a custom API root (mirrors, tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CatalogError::Http(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a client using `CTFTIME_API_URL` when set
    pub fn from_env() -> Result<Self, CatalogError> {
        match std::env::var("CTFTIME_API_URL") {
            Ok(url) if !url.trim().is_empty() => Self::with_base_url(url),
            _ => Self::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl EventCatalog for CtftimeClient {
    #[instrument(skip(self))]
    async fn fetch(&self, event_id: u64) -> Result<NewEvent, CatalogError> {
        let url = format!("{}/events/{}/", self.base_url, event_id);

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!(error = %e, "CTFtime request failed");
            CatalogError::Http(e.to_string())
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(event_id));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "CTFtime returned an error");
            return Err(CatalogError::Http(format!(
                "CTFtime request failed with status {}: {}",
                status, body
            )));
        }

        let raw: CtftimeEvent = response
            .json()
            .await
            .map_err(|e| CatalogError::InvalidData(e.to_string()))?;

        let event = raw.into_new_event()?;
        debug!(name = %event.name, "fetched CTFtime event");
        Ok(event)
    }
}
