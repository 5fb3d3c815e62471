use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::ai::{HfInferenceClient, ModelBackend};
use crate::classify::{Analysis, SentimentAnalyzer};
use crate::config::Config;
use crate::db::ArticleStore;
use crate::error::Result;
use crate::export;
use crate::feed::{FeedFetcher, GdeltClient, NewsSources};
use crate::pipeline::{IngestReport, IngestionPipeline};
use crate::services::Translator;

/// Wired-up services for one process.
pub struct App {
    config: Config,
    store: Arc<ArticleStore>,
    analyzer: Arc<SentimentAnalyzer>,
    sources: NewsSources,
    pipeline: IngestionPipeline,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let store = ArticleStore::open(&config.db_path)
            .await?
            .with_timeout(Duration::from_secs(config.storage_timeout_secs));
        let store = Arc::new(store);

        let request_timeout = Duration::from_secs(config.model.request_timeout_secs);
        let backend: Arc<dyn ModelBackend> = Arc::new(HfInferenceClient::new(&config.model)?);
        let analyzer = Arc::new(SentimentAnalyzer::new(backend, &config.scoring, request_timeout)?);

        let mut gdelt = GdeltClient::new(request_timeout)?;
        if let Some(api_url) = &config.ingest.gdelt_api_url {
            gdelt = gdelt.with_api_url(api_url.clone());
        }
        let sources = NewsSources::new(
            gdelt,
            FeedFetcher::new(request_timeout)?,
            &config.ingest,
        );

        let mut pipeline = IngestionPipeline::new(Arc::clone(&store), Arc::clone(&analyzer))
            .with_concurrency(config.ingest.concurrency)
            .store_unscored(config.ingest.store_unscored);
        if let Some(translator) = build_translator(config, request_timeout)? {
            tracing::info!(target_language = translator.target_language(), "translating stored headlines");
            pipeline = pipeline.with_translator(Arc::new(translator));
        }

        Ok(Self {
            config: config.clone(),
            store,
            analyzer,
            sources,
            pipeline,
        })
    }

    /// Fetch every source once and ingest the result.
    pub async fn ingest_once(&self) -> Result<IngestReport> {
        let items = self.sources.collect().await;
        if items.is_empty() {
            tracing::info!("no headlines collected");
        }

        let report = self.pipeline.run(items).await;
        let total = self.store.count().await?;
        tracing::info!(total, "articles in store");
        Ok(report)
    }

    pub async fn export(&self, min_count: usize, hours: u32, path: Option<&Path>) -> Result<usize> {
        export::export_window(&self.store, min_count, hours, path).await
    }

    /// Export with the configured window to the configured file.
    pub async fn export_default(&self) -> Result<usize> {
        let settings = &self.config.export;
        self.export(settings.min_count, settings.hours, Some(Path::new(&settings.path)))
            .await
    }

    /// Ingest and export every `interval` until Ctrl-C. A failed cycle is
    /// logged and the loop keeps going.
    pub async fn watch(&self, interval: Duration) -> Result<()> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        tracing::error!("Ingestion cycle failed: {}", e);
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl-C received, stopping");
                    return Ok(());
                }
            }
        }
    }

    async fn run_cycle(&self) -> Result<()> {
        let report = self.ingest_once().await?;
        let exported = self.export_default().await?;
        tracing::info!(stored = report.stored, exported, "cycle complete");
        Ok(())
    }

    pub async fn classify(&self, text: &str) -> Result<Analysis> {
        self.analyzer.analyze(text).await
    }
}

fn build_translator(config: &Config, timeout: Duration) -> Result<Option<Translator>> {
    let settings = &config.translation;
    if !settings.enabled {
        return Ok(None);
    }

    let Some(api_key) = settings.api_key.clone().filter(|k| !k.is_empty()) else {
        tracing::warn!("translation enabled but no API key configured, storing English headlines");
        return Ok(None);
    };

    let mut translator = Translator::new(api_key, settings.target_language.clone(), timeout)?;
    if let Some(api_url) = &settings.api_url {
        translator = translator.with_api_url(api_url.clone());
    }
    Ok(Some(translator))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translator_needs_flag_and_key() {
        let mut config = Config::default();
        assert!(build_translator(&config, Duration::from_secs(1)).unwrap().is_none());

        config.translation.enabled = true;
        assert!(build_translator(&config, Duration::from_secs(1)).unwrap().is_none());

        config.translation.api_key = Some("key".to_string());
        let translator = build_translator(&config, Duration::from_secs(1)).unwrap().unwrap();
        assert_eq!(translator.target_language(), "ko");
    }

    #[tokio::test]
    async fn opens_store_and_exports_empty_window() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.db_path = dir.path().join("db").join("articles.db").to_string_lossy().to_string();
        config.export.path = dir.path().join("latest.json").to_string_lossy().to_string();

        let app = App::new(&config).await.unwrap();
        assert_eq!(app.export_default().await.unwrap(), 0);
        assert_eq!(std::fs::read_to_string(&config.export.path).unwrap().trim(), "[]");
    }
}
