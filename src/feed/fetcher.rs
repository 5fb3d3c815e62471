use std::time::Duration;

use chrono::{DateTime, Utc};
use feed_rs::model::Feed;
use feed_rs::parser;
use futures::stream::{self, StreamExt};
use reqwest::Client;

use crate::config::RssSource;
use crate::error::Result;
use crate::models::{FeedItem, Timestamp};

pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("headline-sentiment/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    pub async fn fetch_feed(&self, source: &RssSource) -> Result<Vec<FeedItem>> {
        let response = self.client.get(&source.url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Failed to fetch feed: HTTP {}", response.status()).into());
        }

        let bytes = response.bytes().await?;
        let feed = parser::parse(&bytes[..])?;

        Ok(items_from_feed(feed, &source.source_country, Utc::now()))
    }

    /// Fetch every feed concurrently; feeds that fail are logged and skipped.
    pub async fn fetch_all(&self, sources: &[RssSource]) -> Vec<FeedItem> {
        let batches: Vec<Vec<FeedItem>> = stream::iter(sources)
            .map(|source| async move {
                match self.fetch_feed(source).await {
                    Ok(items) => {
                        tracing::debug!("Fetched {} headlines from {}", items.len(), source.url);
                        Some(items)
                    }
                    Err(e) => {
                        tracing::warn!("Failed to fetch {}: {}", source.url, e);
                        None
                    }
                }
            })
            .buffer_unordered(5) // Max 5 concurrent fetches
            .filter_map(|r| async { r })
            .collect()
            .await;

        batches.into_iter().flatten().collect()
    }
}

/// Entries without a link or a non-blank title are dropped. Entries with no
/// date take `fetched_at`.
fn items_from_feed(feed: Feed, source_country: &str, fetched_at: DateTime<Utc>) -> Vec<FeedItem> {
    feed.entries
        .into_iter()
        .filter_map(|entry| {
            let url = entry.links.first().map(|l| l.href.trim().to_string())?;
            let headline = entry
                .title
                .map(|t| t.content.split_whitespace().collect::<Vec<_>>().join(" "))
                .filter(|t| !t.is_empty())?;
            if url.is_empty() {
                return None;
            }

            Some(FeedItem {
                url,
                headline,
                source_country: source_country.to_string(),
                published: Timestamp::from_datetime(
                    entry.published.or(entry.updated).unwrap_or(fetched_at),
                ),
            })
        })
        .collect()
}
