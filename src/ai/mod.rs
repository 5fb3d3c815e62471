mod inference;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;

pub use inference::HfInferenceClient;

/// One label/score pair as returned by a classification model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// The two model capabilities the classifiers are built on.
///
/// Implementations are constructed once and shared behind an `Arc`.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Independent (sigmoid) probability for every emotion category the
    /// multi-label model knows about.
    async fn emotion_scores(&self, text: &str) -> Result<Vec<LabelScore>>;

    /// Zero-shot entailment scores of `text` against `candidates`.
    async fn zero_shot(&self, text: &str, candidates: &[&str]) -> Result<Vec<LabelScore>>;
}
