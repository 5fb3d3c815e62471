use serde::{Deserialize, Serialize};

use super::{ClassificationResult, Polarity, Timestamp};

/// Persisted sentiment. Both fields are `None` only when scoring failed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: Option<Polarity>,
    pub confidence: Option<f64>,
}

impl Sentiment {
    pub fn unscored() -> Self {
        Self::default()
    }

    pub fn is_scored(&self) -> bool {
        self.label.is_some()
    }
}

impl From<ClassificationResult> for Sentiment {
    fn from(result: ClassificationResult) -> Self {
        Self {
            label: Some(result.label),
            confidence: Some(result.confidence),
        }
    }
}

/// A stored headline. Serializes to the flat export shape
/// `{url, headline, source_country, timestamp, sentiment: {label, confidence}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub url: String,
    pub headline: String,
    pub source_country: String,
    pub timestamp: Timestamp,
    pub sentiment: Sentiment,
}

/// A raw headline as delivered by a source, before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub url: String,
    pub headline: String,
    pub source_country: String,
    pub published: Timestamp,
}

impl FeedItem {
    pub fn into_article(self, sentiment: Sentiment) -> Article {
        Article {
            url: self.url,
            headline: self.headline,
            source_country: self.source_country,
            timestamp: self.published,
            sentiment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_to_export_shape() {
        let article = Article {
            url: "https://example.com/a".to_string(),
            headline: "Markets rally".to_string(),
            source_country: "US".to_string(),
            timestamp: Timestamp::parse("20250607T200925Z").unwrap(),
            sentiment: ClassificationResult::new(Polarity::Positive, 0.64).into(),
        };

        assert_eq!(
            serde_json::to_value(&article).unwrap(),
            json!({
                "url": "https://example.com/a",
                "headline": "Markets rally",
                "source_country": "US",
                "timestamp": "20250607T200925Z",
                "sentiment": {"label": "positive", "confidence": 0.64}
            })
        );
    }

    #[test]
    fn unscored_serializes_nulls() {
        let value = serde_json::to_value(Sentiment::unscored()).unwrap();
        assert_eq!(value, json!({"label": null, "confidence": null}));
    }
}
