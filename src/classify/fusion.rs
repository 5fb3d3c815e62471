use crate::error::{AppError, Result};
use crate::models::{round_confidence, ClassificationResult};

pub const DEFAULT_ALPHA: f64 = 0.6;

/// Blends the emotion-derived polarity (weight `alpha`) with the zero-shot
/// verdict (weight `1 - alpha`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionEngine {
    alpha: f64,
}

impl FusionEngine {
    pub fn new(alpha: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(AppError::Config(format!(
                "fusion alpha must be within [0, 1], got {alpha}"
            )));
        }
        Ok(Self { alpha })
    }

    /// On agreement the confidences are averaged by weight. On disagreement
    /// the side with the larger weighted confidence wins and keeps only that
    /// weighted confidence; an exact tie goes to `polarity`.
    pub fn fuse(
        &self,
        polarity: ClassificationResult,
        zero_shot: ClassificationResult,
    ) -> ClassificationResult {
        let weighted_polarity = self.alpha * polarity.confidence;
        let weighted_zero_shot = (1.0 - self.alpha) * zero_shot.confidence;

        if polarity.label == zero_shot.label {
            return ClassificationResult::new(
                polarity.label,
                round_confidence(weighted_polarity + weighted_zero_shot),
            );
        }

        if weighted_polarity >= weighted_zero_shot {
            ClassificationResult::new(polarity.label, round_confidence(weighted_polarity))
        } else {
            ClassificationResult::new(zero_shot.label, round_confidence(weighted_zero_shot))
        }
    }
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
        }
    }
}
