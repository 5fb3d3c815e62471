//! Ingestion pipeline orchestration.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::classify::SentimentAnalyzer;
use crate::db::ArticleStore;
use crate::models::{FeedItem, Sentiment};
use crate::services::Translator;

/// Why a headline was dropped without being stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    DedupCheckFailure,
    ClassificationFailure,
    PersistenceFailure,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::DedupCheckFailure => "dedup check failed",
            SkipReason::ClassificationFailure => "classification failed",
            SkipReason::PersistenceFailure => "persistence failed",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Duplicate,
    Stored { scored: bool },
    Skipped(SkipReason),
}

/// Per-run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub received: usize,
    pub duplicates: usize,
    pub stored: usize,
    /// Subset of `stored` persisted with null sentiment.
    pub unscored: usize,
    pub dedup_failures: usize,
    pub classification_failures: usize,
    pub persistence_failures: usize,
}

impl IngestReport {
    fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Duplicate => self.duplicates += 1,
            ItemOutcome::Stored { scored } => {
                self.stored += 1;
                if !scored {
                    self.unscored += 1;
                }
            }
            ItemOutcome::Skipped(SkipReason::DedupCheckFailure) => self.dedup_failures += 1,
            ItemOutcome::Skipped(SkipReason::ClassificationFailure) => {
                self.classification_failures += 1
            }
            ItemOutcome::Skipped(SkipReason::PersistenceFailure) => self.persistence_failures += 1,
        }
    }

    pub fn skipped(&self) -> usize {
        self.dedup_failures + self.classification_failures + self.persistence_failures
    }
}

/// Dedup, classify, optionally translate, and persist a batch of headlines.
pub struct IngestionPipeline {
    store: Arc<ArticleStore>,
    analyzer: Arc<SentimentAnalyzer>,
    translator: Option<Arc<Translator>>,
    concurrency: usize,
    store_unscored: bool,
}

impl IngestionPipeline {
    pub fn new(store: Arc<ArticleStore>, analyzer: Arc<SentimentAnalyzer>) -> Self {
        Self {
            store,
            analyzer,
            translator: None,
            concurrency: 4,
            store_unscored: false,
        }
    }

    pub fn with_translator(mut self, translator: Arc<Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Persist headlines whose classification failed, with null sentiment,
    /// instead of skipping them.
    pub fn store_unscored(mut self, enabled: bool) -> Self {
        self.store_unscored = enabled;
        self
    }

    /// Run one batch.
    ///
    /// 1. Drop repeated URLs within the batch (first occurrence wins).
    /// 2. Skip URLs already in the store without classifying them.
    /// 3. Classify the original headline.
    /// 4. Translate the headline for storage, if a translator is configured.
    /// 5. Upsert.
    ///
    /// Per-item failures are logged and counted; they never abort the batch.
    pub async fn run(&self, items: Vec<FeedItem>) -> IngestReport {
        let mut report = IngestReport {
            received: items.len(),
            ..IngestReport::default()
        };

        let mut seen = HashSet::new();
        let unique: Vec<FeedItem> = items
            .into_iter()
            .filter(|item| seen.insert(item.url.clone()))
            .collect();
        report.duplicates += report.received - unique.len();

        let outcomes: Vec<ItemOutcome> = stream::iter(unique)
            .map(|item| self.process(item))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for outcome in outcomes {
            report.record(outcome);
        }

        tracing::info!(
            received = report.received,
            stored = report.stored,
            unscored = report.unscored,
            duplicates = report.duplicates,
            skipped = report.skipped(),
            "ingestion run finished"
        );
        report
    }

    async fn process(&self, item: FeedItem) -> ItemOutcome {
        match self.store.try_exists(&item.url).await {
            Ok(true) => {
                tracing::debug!(url = %item.url, "already stored, skipping");
                return ItemOutcome::Duplicate;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(url = %item.url, error = %e, "{}", SkipReason::DedupCheckFailure);
                return ItemOutcome::Skipped(SkipReason::DedupCheckFailure);
            }
        }

        let sentiment = match self.analyzer.analyze(&item.headline).await {
            Ok(analysis) => {
                tracing::debug!(
                    url = %item.url,
                    label = %analysis.fused.label,
                    confidence = analysis.fused.confidence,
                    top_emotions = ?analysis.top_emotions,
                    "classified headline"
                );
                Sentiment::from(analysis.fused)
            }
            Err(e) if self.store_unscored => {
                tracing::warn!(url = %item.url, error = %e, "classification failed, storing without sentiment");
                Sentiment::unscored()
            }
            Err(e) => {
                tracing::warn!(url = %item.url, error = %e, "{}", SkipReason::ClassificationFailure);
                return ItemOutcome::Skipped(SkipReason::ClassificationFailure);
            }
        };

        let mut article = item.into_article(sentiment);
        if let Some(translator) = &self.translator {
            article.headline = translator.translate_or_original(&article.headline).await;
        }

        let scored = sentiment.is_scored();
        let url = article.url.clone();
        match self.store.upsert(article).await {
            Ok(()) => ItemOutcome::Stored { scored },
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "{}", SkipReason::PersistenceFailure);
                ItemOutcome::Skipped(SkipReason::PersistenceFailure)
            }
        }
    }
}
