use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

const APP_DIR: &str = "headline-sentiment";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_storage_timeout")]
    pub storage_timeout_secs: u64,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub translation: TranslationConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub api_url: String,
    pub api_token: Option<String>,
    pub emotion_model: String,
    pub zero_shot_model: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub neutral_factor: f64,
    pub margin: f64,
    pub alpha: f64,
    pub use_zero_shot: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RssSource {
    pub url: String,
    pub source_country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub gdelt_enabled: bool,
    /// Alternate GDELT DOC endpoint, e.g. a caching proxy.
    pub gdelt_api_url: Option<String>,
    /// GDELT timespan, e.g. `1hours` or `90min`.
    pub timespan: String,
    pub num_records: u32,
    pub countries: Vec<String>,
    pub rss_feeds: Vec<RssSource>,
    pub min_headline_len: usize,
    pub concurrency: usize,
    /// Persist items whose classification failed, with null sentiment.
    pub store_unscored: bool,
    pub interval_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub target_language: String,
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub path: String,
    pub min_count: usize,
    pub hours: u32,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("articles.db").to_string_lossy().to_string()
}

fn default_storage_timeout() -> u64 {
    10
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api-inference.huggingface.co".to_string(),
            api_token: None,
            emotion_model: "SamLowe/roberta-base-go_emotions".to_string(),
            zero_shot_model: "facebook/bart-large-mnli".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            neutral_factor: 0.3,
            margin: 0.10,
            alpha: 0.6,
            use_zero_shot: true,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            gdelt_enabled: true,
            gdelt_api_url: None,
            timespan: "1hours".to_string(),
            num_records: 250,
            countries: Vec::new(),
            rss_feeds: Vec::new(),
            min_headline_len: 15,
            concurrency: 4,
            store_unscored: false,
            interval_minutes: 60,
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            target_language: "ko".to_string(),
            api_url: None,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            path: "latest_articles_with_sentiment.json".to_string(),
            min_count: 100,
            hours: 1,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            storage_timeout_secs: default_storage_timeout(),
            model: ModelConfig::default(),
            scoring: ScoringConfig::default(),
            ingest: IngestConfig::default(),
            translation: TranslationConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl Config {
    /// Load from `path` (or the default location), writing a default file
    /// first if none exists, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::config_path);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Config>(&content)?
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            config
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    /// `DB_FILE`, `HF_API_TOKEN` and `GOOGLE_TRANSLATE_API_KEY` take
    /// precedence over the file.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(db_path) = lookup("DB_FILE").filter(|v| !v.is_empty()) {
            self.db_path = db_path;
        }
        if let Some(token) = lookup("HF_API_TOKEN").filter(|v| !v.is_empty()) {
            self.model.api_token = Some(token);
        }
        if let Some(key) = lookup("GOOGLE_TRANSLATE_API_KEY").filter(|v| !v.is_empty()) {
            self.translation.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<()> {
        let scoring = &self.scoring;
        if !(0.0..=1.0).contains(&scoring.alpha) {
            return Err(AppError::Config(format!(
                "scoring.alpha must be within [0, 1], got {}",
                scoring.alpha
            )));
        }
        if !scoring.neutral_factor.is_finite() || scoring.neutral_factor < 0.0 {
            return Err(AppError::Config(format!(
                "scoring.neutral_factor must be >= 0, got {}",
                scoring.neutral_factor
            )));
        }
        if !scoring.margin.is_finite() || scoring.margin < 0.0 {
            return Err(AppError::Config(format!(
                "scoring.margin must be >= 0, got {}",
                scoring.margin
            )));
        }
        if self.ingest.concurrency == 0 {
            return Err(AppError::Config("ingest.concurrency must be at least 1".to_string()));
        }
        if self.ingest.interval_minutes == 0 {
            return Err(AppError::Config(
                "ingest.interval_minutes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            db_path = "/tmp/articles.db"

            [scoring]
            alpha = 0.7

            [[ingest.rss_feeds]]
            url = "https://example.com/rss"
            source_country = "KR"
            "#,
        )
        .unwrap();

        assert_eq!(config.db_path, "/tmp/articles.db");
        assert_eq!(config.scoring.alpha, 0.7);
        assert_eq!(config.scoring.neutral_factor, 0.3);
        assert_eq!(config.scoring.margin, 0.10);
        assert!(config.scoring.use_zero_shot);
        assert_eq!(config.ingest.min_headline_len, 15);
        assert_eq!(config.ingest.rss_feeds[0].source_country, "KR");
        assert_eq!(config.export.min_count, 100);
        assert_eq!(config.export.hours, 1);
        assert_eq!(config.model.emotion_model, "SamLowe/roberta-base-go_emotions");
        config.validate().unwrap();
    }

    #[test]
    fn gdelt_endpoint_is_optional() {
        assert_eq!(Config::default().ingest.gdelt_api_url, None);

        let config: Config = toml::from_str(
            r#"
            [ingest]
            gdelt_api_url = "http://localhost:8080/doc"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.ingest.gdelt_api_url.as_deref(),
            Some("http://localhost:8080/doc")
        );
        assert!(config.ingest.gdelt_enabled);
    }

    #[test]
    fn env_overrides_win() {
        let mut config = Config::default();
        config.apply_env_overrides(|key| match key {
            "DB_FILE" => Some("/data/other.db".to_string()),
            "HF_API_TOKEN" => Some("hf_abc".to_string()),
            "GOOGLE_TRANSLATE_API_KEY" => Some(String::new()),
            _ => None,
        });

        assert_eq!(config.db_path, "/data/other.db");
        assert_eq!(config.model.api_token.as_deref(), Some("hf_abc"));
        assert_eq!(config.translation.api_key, None);
    }

    #[test]
    fn out_of_range_scoring_is_rejected() {
        let mut config = Config::default();
        config.scoring.alpha = 1.2;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scoring.margin = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ingest.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_writes_default_file_on_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("config.toml");

        let first = Config::load(Some(&path)).unwrap();
        assert!(path.exists());

        let second = Config::load(Some(&path)).unwrap();
        assert_eq!(first.export.path, second.export.path);
        assert_eq!(first.scoring.alpha, second.scoring.alpha);
    }
}
