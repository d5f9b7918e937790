use crate::pipeline::EventSource;
use crate::types::RawEvent;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Fetches events from any HTTP endpoint that serves a JSON array of
/// events. Both the reference book feed and scraped-book bridges expose
/// this shape, so one client covers either side of a run.
#[derive(Clone)]
pub struct JsonFeedClient {
    client: Client,
    name: String,
    url: String,
}

impl std::fmt::Debug for JsonFeedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonFeedClient")
            .field("name", &self.name)
            .field("url", &self.url)
            .finish()
    }
}

impl JsonFeedClient {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            name: name.into(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl EventSource for JsonFeedClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_events(&self) -> Result<Vec<RawEvent>> {
        debug!(source = %self.name, url = %self.url, "fetching events");
        let events = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.url))?
            .error_for_status()
            .with_context(|| format!("{} returned an error status", self.name))?
            .json::<Vec<RawEvent>>()
            .await
            .with_context(|| format!("{} returned malformed events", self.name))?;
        debug!(source = %self.name, count = events.len(), "fetched events");
        Ok(events)
    }
}
