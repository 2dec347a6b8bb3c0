use reqwest::Client;
use tracing::debug;

use crate::error::FetchError;
use crate::types::{NewBlock, UpstreamBlock};

/// Fetches the latest block summary from the configured upstream endpoint.
/// The client is constructed once and reused across ticks.
pub struct BlockFetcher {
    http_client: Client,
    api_url: String,
}

impl BlockFetcher {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_url: api_url.into(),
        }
    }

    /// One outbound GET, expecting JSON `{hash, height, time}`. The `time`
    /// value is converted to epoch milliseconds; an unrecognizable value
    /// fails the whole fetch so nothing partial reaches storage.
    pub async fn fetch_latest(&self) -> Result<NewBlock, FetchError> {
        debug!("Fetching latest block from {}", self.api_url);

        let response = self.http_client.get(&self.api_url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::BadStatus(response.status()));
        }

        let block: UpstreamBlock = response.json().await?;
        let timestamp = block
            .time
            .to_epoch_millis()
            .ok_or_else(|| FetchError::InvalidTime(block.time.clone()))?;

        Ok(NewBlock {
            hash: block.hash,
            number: block.height,
            timestamp,
        })
    }
}
