use std::sync::Arc;

use crate::ai::ModelBackend;
use crate::error::{AppError, Result};
use crate::models::{round_confidence, ClassificationResult, Polarity};

use super::emotion::{EmotionScores, NEGATIVE_EMOTIONS, NEUTRAL_EMOTION, POSITIVE_EMOTIONS};

pub const DEFAULT_NEUTRAL_FACTOR: f64 = 0.3;
pub const DEFAULT_MARGIN: f64 = 0.10;
const TOP_EMOTIONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarityParams {
    /// Multiplier applied to the neutral category before renormalizing.
    pub neutral_factor: f64,
    /// Lead one side needs over the other to avoid a neutral verdict.
    pub margin: f64,
}

impl PolarityParams {
    pub fn new(neutral_factor: f64, margin: f64) -> Result<Self> {
        if !neutral_factor.is_finite() || neutral_factor < 0.0 {
            return Err(AppError::Config(format!(
                "neutral_factor must be >= 0, got {neutral_factor}"
            )));
        }
        if !margin.is_finite() || margin < 0.0 {
            return Err(AppError::Config(format!("margin must be >= 0, got {margin}")));
        }
        Ok(Self {
            neutral_factor,
            margin,
        })
    }
}

impl Default for PolarityParams {
    fn default() -> Self {
        Self {
            neutral_factor: DEFAULT_NEUTRAL_FACTOR,
            margin: DEFAULT_MARGIN,
        }
    }
}

/// A polarity verdict plus the strongest raw emotions behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct PolarityVerdict {
    pub result: ClassificationResult,
    pub top_emotions: Vec<(&'static str, f64)>,
}

/// Collapses multi-label emotion probabilities into one polarity.
pub struct PolarityClassifier {
    backend: Arc<dyn ModelBackend>,
    params: PolarityParams,
}

impl PolarityClassifier {
    pub fn new(backend: Arc<dyn ModelBackend>, params: PolarityParams) -> Self {
        Self { backend, params }
    }

    pub async fn classify(&self, text: &str) -> Result<PolarityVerdict> {
        let raw = self.backend.emotion_scores(text).await?;
        let emotions = EmotionScores::from_label_scores(&raw)?;

        Ok(PolarityVerdict {
            result: score_emotions(&emotions, &self.params),
            top_emotions: emotions.top(TOP_EMOTIONS),
        })
    }
}

/// Dampen neutral, renormalize, then compare the positive and negative mass.
pub fn score_emotions(emotions: &EmotionScores, params: &PolarityParams) -> ClassificationResult {
    let dampened: Vec<(&str, f64)> = emotions
        .iter()
        .map(|(label, prob)| {
            if label == NEUTRAL_EMOTION {
                (label, prob * params.neutral_factor)
            } else {
                (label, prob)
            }
        })
        .collect();

    let total: f64 = dampened.iter().map(|(_, prob)| prob).sum();
    if total <= 0.0 {
        return ClassificationResult::new(Polarity::Neutral, 0.0);
    }

    let mut pos = 0.0;
    let mut neg = 0.0;
    for (label, prob) in dampened {
        if POSITIVE_EMOTIONS.contains(&label) {
            pos += prob / total;
        } else if NEGATIVE_EMOTIONS.contains(&label) {
            neg += prob / total;
        }
    }

    let confidence = round_confidence((pos - neg).abs().min(1.0));

    // Strict comparisons: a lead of exactly `margin` is still neutral.
    let label = if pos > neg + params.margin {
        Polarity::Positive
    } else if neg > pos + params.margin {
        Polarity::Negative
    } else {
        Polarity::Neutral
    };

    ClassificationResult::new(label, confidence)
}
