use super::{FeedData, FeedFetcher};
use crate::client::GaiaClient;
use anyhow::Result;
use async_trait::async_trait;

pub struct EventsFetcher {
    client: GaiaClient,
}

impl EventsFetcher {
    pub fn new(client: GaiaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeedFetcher for EventsFetcher {
    async fn fetch(&self) -> Result<FeedData> {
        let events = self.client.fetch_events().await?;
        Ok(FeedData::Events(events))
    }
}
