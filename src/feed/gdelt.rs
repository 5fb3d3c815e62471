use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{FeedItem, Timestamp};

const GDELT_DOC_API: &str = "https://api.gdeltproject.org/api/v2/doc/doc";
const MAX_RECORDS: u32 = 250;

#[derive(Debug, Deserialize)]
struct GdeltResponse {
    #[serde(default)]
    articles: Vec<GdeltArticle>,
}

#[derive(Debug, Deserialize)]
struct GdeltArticle {
    url: Option<String>,
    title: Option<String>,
    #[serde(rename = "seendate")]
    seen_date: Option<String>,
    #[serde(rename = "sourcecountry")]
    source_country: Option<String>,
    language: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GdeltQuery {
    pub timespan: String,
    pub max_records: u32,
    pub countries: Vec<String>,
    pub min_headline_len: usize,
}

/// GDELT DOC 2.0 article-list client.
pub struct GdeltClient {
    client: Client,
    api_url: String,
}

impl GdeltClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("headline-sentiment/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            api_url: GDELT_DOC_API.to_string(),
        })
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub async fn fetch(&self, query: &GdeltQuery) -> Result<Vec<FeedItem>> {
        let max_records = query.max_records.clamp(1, MAX_RECORDS).to_string();
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("query", build_query(&query.countries).as_str()),
                ("mode", "ArtList"),
                ("format", "json"),
                ("sort", "DateDesc"),
                ("timespan", query.timespan.as_str()),
                ("maxrecords", max_records.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("GDELT request failed: HTTP {}", response.status()).into());
        }

        let body = response.text().await?;
        parse_articles(&body, query.min_headline_len)
    }
}

/// English-language articles, optionally restricted to source countries.
fn build_query(countries: &[String]) -> String {
    let filters: Vec<String> = countries
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(|c| format!("sourcecountry:{c}"))
        .collect();

    match filters.len() {
        0 => "sourcelang:english".to_string(),
        1 => format!("sourcelang:english {}", filters[0]),
        _ => format!("sourcelang:english ({})", filters.join(" OR ")),
    }
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

fn parse_articles(body: &str, min_headline_len: usize) -> Result<Vec<FeedItem>> {
    // GDELT answers an empty window with an empty body rather than `{}`.
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let response: GdeltResponse = serde_json::from_str(body).map_err(|e| {
        let snippet: String = body.chars().take(120).collect();
        AppError::Other(anyhow::anyhow!("unexpected GDELT response ({e}): {snippet}"))
    })?;

    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for article in response.articles {
        let Some(url) = article.url.filter(|u| url::Url::parse(u).is_ok()) else {
            continue;
        };
        let is_english = article
            .language
            .as_deref()
            .is_some_and(|lang| lang.eq_ignore_ascii_case("english"));
        if !is_english {
            continue;
        }

        let headline = whitespace()
            .replace_all(article.title.as_deref().unwrap_or_default().trim(), " ")
            .into_owned();
        if headline.chars().count() < min_headline_len {
            continue;
        }

        let published = match article.seen_date.as_deref().map(Timestamp::parse) {
            Some(Ok(ts)) => ts,
            other => {
                tracing::debug!(url = %url, seendate = ?other, "skipping GDELT article without usable seendate");
                continue;
            }
        };

        if !seen.insert(url.clone()) {
            continue;
        }

        items.push(FeedItem {
            url,
            headline,
            source_country: article.source_country.unwrap_or_default(),
            published,
        });
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn sample_body() -> String {
        json!({
            "articles": [
                {
                    "url": "https://news.example.com/a",
                    "title": "Central bank  holds\nrates steady amid uncertainty",
                    "seendate": "20250607T200925Z",
                    "sourcecountry": "United States",
                    "language": "English"
                },
                {
                    "url": "https://news.example.com/a",
                    "title": "Central bank holds rates steady amid uncertainty",
                    "seendate": "20250607T200925Z",
                    "sourcecountry": "United States",
                    "language": "English"
                },
                {
                    "url": "https://news.example.com/short",
                    "title": "Too short",
                    "seendate": "20250607T200925Z",
                    "sourcecountry": "United States",
                    "language": "English"
                },
                {
                    "url": "https://news.example.com/es",
                    "title": "El banco central mantiene las tasas",
                    "seendate": "20250607T200925Z",
                    "sourcecountry": "Spain",
                    "language": "Spanish"
                },
                {
                    "url": "https://news.example.com/nodate",
                    "title": "Headline without a usable date field",
                    "seendate": "2025-06-07 20:09",
                    "sourcecountry": "Canada",
                    "language": "English"
                },
                {
                    "url": "not a url",
                    "title": "Headline with a broken url attached",
                    "seendate": "20250607T200925Z",
                    "language": "English"
                }
            ]
        })
        .to_string()
    }

    #[test]
    fn keeps_unique_english_headlines_with_valid_dates() {
        let items = parse_articles(&sample_body(), 15).unwrap();

        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.url, "https://news.example.com/a");
        assert_eq!(item.headline, "Central bank holds rates steady amid uncertainty");
        assert_eq!(item.source_country, "United States");
        assert_eq!(item.published.as_str(), "20250607T200925Z");
    }

    #[test]
    fn empty_body_means_no_articles() {
        assert!(parse_articles("", 15).unwrap().is_empty());
        assert!(parse_articles("{}", 15).unwrap().is_empty());
        assert!(parse_articles("Timespan is too short.", 15).is_err());
    }

    #[test]
    fn query_filters_by_country() {
        assert_eq!(build_query(&[]), "sourcelang:english");
        assert_eq!(
            build_query(&["US".to_string()]),
            "sourcelang:english sourcecountry:US"
        );
        assert_eq!(
            build_query(&["US".to_string(), " ".to_string(), "KS".to_string()]),
            "sourcelang:english (sourcecountry:US OR sourcecountry:KS)"
        );
    }

    #[tokio::test]
    async fn fetch_sends_window_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("mode", "ArtList"))
            .and(query_param("timespan", "3hours"))
            .and(query_param("maxrecords", "250"))
            .respond_with(ResponseTemplate::new(200).set_body_string(sample_body()))
            .mount(&server)
            .await;

        let client = GdeltClient::new(Duration::from_secs(5))
            .unwrap()
            .with_api_url(server.uri());
        let items = client
            .fetch(&GdeltQuery {
                timespan: "3hours".to_string(),
                max_records: 1000,
                countries: Vec::new(),
                min_headline_len: 15,
            })
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
    }

    #[test]
    fn language_filter_runs_before_dedup() {
        let body = json!({
            "articles": [
                {
                    "url": "https://news.example.com/shared",
                    "title": "Le gouvernement annonce un nouveau budget",
                    "seendate": "20250607T200925Z",
                    "sourcecountry": "France",
                    "language": "French"
                },
                {
                    "url": "https://news.example.com/shared",
                    "title": "Government announces a new budget",
                    "seendate": "20250607T201500Z",
                    "sourcecountry": "France",
                    "language": "English"
                }
            ]
        })
        .to_string();

        let items = parse_articles(&body, 15).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].headline, "Government announces a new budget");
    }
}
