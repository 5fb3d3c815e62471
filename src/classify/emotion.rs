use crate::ai::LabelScore;
use crate::error::{AppError, Result};

/// GoEmotions categories in model output order.
pub const EMOTION_LABELS: [&str; 28] = [
    "admiration",
    "amusement",
    "anger",
    "annoyance",
    "approval",
    "caring",
    "confusion",
    "curiosity",
    "desire",
    "disappointment",
    "disapproval",
    "disgust",
    "embarrassment",
    "excitement",
    "fear",
    "gratitude",
    "grief",
    "joy",
    "love",
    "nervousness",
    "optimism",
    "pride",
    "realization",
    "relief",
    "remorse",
    "sadness",
    "surprise",
    "neutral",
];

pub const POSITIVE_EMOTIONS: [&str; 12] = [
    "admiration",
    "amusement",
    "approval",
    "caring",
    "excitement",
    "gratitude",
    "joy",
    "love",
    "optimism",
    "pride",
    "relief",
    "surprise",
];

pub const NEGATIVE_EMOTIONS: [&str; 11] = [
    "anger",
    "annoyance",
    "disappointment",
    "disapproval",
    "disgust",
    "embarrassment",
    "fear",
    "grief",
    "nervousness",
    "remorse",
    "sadness",
];

pub const NEUTRAL_EMOTION: &str = "neutral";

/// Per-category probabilities, indexed like [`EMOTION_LABELS`]. Categories
/// the model did not report stay at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionScores {
    probs: [f64; EMOTION_LABELS.len()],
}

impl EmotionScores {
    pub fn from_label_scores(scores: &[LabelScore]) -> Result<Self> {
        let mut probs = [0.0; EMOTION_LABELS.len()];
        let mut matched = 0usize;

        for LabelScore { label, score } in scores {
            if !score.is_finite() || *score < 0.0 {
                return Err(AppError::Classification(format!(
                    "invalid probability {score} for emotion {label}"
                )));
            }
            match EMOTION_LABELS.iter().position(|known| known == label) {
                Some(index) => {
                    probs[index] = *score;
                    matched += 1;
                }
                None => tracing::debug!(label = %label, "ignoring unknown emotion category"),
            }
        }

        if matched == 0 {
            return Err(AppError::Classification(
                "model returned no known emotion categories".to_string(),
            ));
        }

        Ok(Self { probs })
    }

    #[cfg(test)]
    pub fn get(&self, label: &str) -> Option<f64> {
        EMOTION_LABELS
            .iter()
            .position(|known| *known == label)
            .map(|index| self.probs[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        EMOTION_LABELS.iter().copied().zip(self.probs.iter().copied())
    }

    /// The `n` strongest raw categories, strongest first.
    pub fn top(&self, n: usize) -> Vec<(&'static str, f64)> {
        let mut ranked: Vec<_> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(n);
        ranked
    }
}
