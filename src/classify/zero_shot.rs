use std::sync::Arc;

use crate::ai::{LabelScore, ModelBackend};
use crate::error::{AppError, Result};
use crate::models::{round_confidence, ClassificationResult, Polarity};

/// Three-way entailment classifier over positive/negative/neutral. The
/// model's own calibration is trusted: the result is simply its argmax.
pub struct ZeroShotClassifier {
    backend: Arc<dyn ModelBackend>,
}

impl ZeroShotClassifier {
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        Self { backend }
    }

    pub async fn classify(&self, text: &str) -> Result<ClassificationResult> {
        let candidates = Polarity::ALL.map(|p| p.as_str());
        let scores = self.backend.zero_shot(text, &candidates).await?;
        top_label(&scores)
    }
}

fn top_label(scores: &[LabelScore]) -> Result<ClassificationResult> {
    // First entry wins ties; the endpoint already returns scores sorted.
    let top = scores
        .iter()
        .filter(|s| s.score.is_finite())
        .reduce(|best, next| if next.score > best.score { next } else { best })
        .ok_or_else(|| AppError::Classification("zero-shot model returned no scores".to_string()))?;

    let label = top
        .label
        .parse::<Polarity>()
        .map_err(AppError::Classification)?;

    Ok(ClassificationResult::new(label, round_confidence(top.score)))
}
