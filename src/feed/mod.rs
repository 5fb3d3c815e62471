//! Headline sources.

mod fetcher;
mod gdelt;

pub use fetcher::FeedFetcher;
pub use gdelt::{GdeltClient, GdeltQuery};

use crate::config::{IngestConfig, RssSource};
use crate::models::FeedItem;

/// GDELT plus the configured RSS feeds.
pub struct NewsSources {
    gdelt: Option<(GdeltClient, GdeltQuery)>,
    rss: FeedFetcher,
    rss_feeds: Vec<RssSource>,
}

impl NewsSources {
    pub fn new(gdelt: GdeltClient, rss: FeedFetcher, config: &IngestConfig) -> Self {
        let query = GdeltQuery {
            timespan: config.timespan.clone(),
            max_records: config.num_records,
            countries: config.countries.clone(),
            min_headline_len: config.min_headline_len,
        };

        Self {
            gdelt: config.gdelt_enabled.then_some((gdelt, query)),
            rss,
            rss_feeds: config.rss_feeds.clone(),
        }
    }

    /// Collect headlines from every source.
    ///
    /// Continues past individual source failures, logging warnings.
    /// Returns an empty `Vec` if all sources fail.
    pub async fn collect(&self) -> Vec<FeedItem> {
        let mut items = Vec::new();

        if let Some((client, query)) = &self.gdelt {
            match client.fetch(query).await {
                Ok(gdelt_items) => {
                    tracing::debug!(count = gdelt_items.len(), "collected GDELT headlines");
                    items.extend(gdelt_items);
                }
                Err(e) => {
                    tracing::warn!(source = "gdelt", error = %e, "GDELT fetch failed");
                }
            }
        }

        if !self.rss_feeds.is_empty() {
            let rss_items = self.rss.fetch_all(&self.rss_feeds).await;
            tracing::debug!(
                feeds = self.rss_feeds.len(),
                count = rss_items.len(),
                "collected RSS headlines"
            );
            items.extend(rss_items);
        }

        items
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn gdelt_failure_does_not_hide_rss() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gdelt"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<rss version="2.0"><channel><title>t</title>
                <item><title>Rail strike enters its second week</title>
                <link>https://news.example.com/strike</link></item>
                </channel></rss>"#,
            ))
            .mount(&server)
            .await;

        let config = IngestConfig {
            rss_feeds: vec![RssSource {
                url: format!("{}/feed.xml", server.uri()),
                source_country: "UK".to_string(),
            }],
            ..IngestConfig::default()
        };
        let gdelt = GdeltClient::new(Duration::from_secs(5))
            .unwrap()
            .with_api_url(format!("{}/gdelt", server.uri()));
        let sources = NewsSources::new(gdelt, FeedFetcher::new(Duration::from_secs(5)).unwrap(), &config);

        let items = sources.collect().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://news.example.com/strike");
    }

    #[tokio::test]
    async fn disabled_gdelt_is_not_queried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "articles": [] })))
            .expect(0)
            .mount(&server)
            .await;

        let config = IngestConfig {
            gdelt_enabled: false,
            ..IngestConfig::default()
        };
        let gdelt = GdeltClient::new(Duration::from_secs(5))
            .unwrap()
            .with_api_url(server.uri());
        let sources = NewsSources::new(gdelt, FeedFetcher::new(Duration::from_secs(5)).unwrap(), &config);

        assert!(sources.collect().await.is_empty());
    }
}
