mod emotion;
mod fusion;
mod polarity;
mod zero_shot;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::ai::ModelBackend;
use crate::config::ScoringConfig;
use crate::error::{AppError, Result};
use crate::models::ClassificationResult;

pub use fusion::FusionEngine;
pub use polarity::{PolarityClassifier, PolarityParams};
pub use zero_shot::ZeroShotClassifier;

/// Everything one headline's classification produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub polarity: ClassificationResult,
    pub zero_shot: Option<ClassificationResult>,
    pub fused: ClassificationResult,
    pub top_emotions: Vec<(&'static str, f64)>,
}

/// Runs both classifiers on a headline and fuses their verdicts.
pub struct SentimentAnalyzer {
    polarity: PolarityClassifier,
    zero_shot: Option<ZeroShotClassifier>,
    fusion: FusionEngine,
    timeout: Duration,
}

impl SentimentAnalyzer {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        scoring: &ScoringConfig,
        timeout: Duration,
    ) -> Result<Self> {
        let params = PolarityParams::new(scoring.neutral_factor, scoring.margin)?;
        let fusion = FusionEngine::new(scoring.alpha)?;
        let zero_shot = scoring
            .use_zero_shot
            .then(|| ZeroShotClassifier::new(Arc::clone(&backend)));

        Ok(Self {
            polarity: PolarityClassifier::new(backend, params),
            zero_shot,
            fusion,
            timeout,
        })
    }

    pub async fn analyze(&self, text: &str) -> Result<Analysis> {
        let polarity = bounded("emotion model", self.timeout, self.polarity.classify(text));

        let (verdict, zero_shot) = match &self.zero_shot {
            Some(classifier) => {
                let zero_shot = bounded("zero-shot model", self.timeout, classifier.classify(text));
                let (polarity, zero_shot) = tokio::join!(polarity, zero_shot);
                (polarity?, Some(zero_shot?))
            }
            None => (polarity.await?, None),
        };

        let fused = match zero_shot {
            Some(zero_shot) => self.fusion.fuse(verdict.result, zero_shot),
            None => verdict.result,
        };

        Ok(Analysis {
            polarity: verdict.result,
            zero_shot,
            fused,
            top_emotions: verdict.top_emotions,
        })
    }
}

async fn bounded<T>(
    what: &str,
    limit: Duration,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| AppError::Timeout(format!("{what} exceeded {limit:?}")))?
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::ai::{LabelScore, ModelBackend};
    use crate::error::{AppError, Result};

    /// Canned model answers keyed by input text. Texts containing `FAIL`
    /// error out; unknown texts get a flat neutral answer.
    #[derive(Default)]
    pub struct StubBackend {
        emotions: Mutex<HashMap<String, Vec<LabelScore>>>,
        zero_shot: Mutex<HashMap<String, Vec<LabelScore>>>,
        pub emotion_calls: AtomicUsize,
        pub zero_shot_calls: AtomicUsize,
        delay: Option<std::time::Duration>,
    }

    impl StubBackend {
        pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn with_answer(
            self,
            text: &str,
            emotions: &[(&str, f64)],
            zero_shot: (&str, f64),
        ) -> Self {
            self.emotions.lock().unwrap().insert(
                text.to_string(),
                emotions.iter().map(|(l, s)| LabelScore::new(*l, *s)).collect(),
            );
            self.zero_shot.lock().unwrap().insert(
                text.to_string(),
                vec![LabelScore::new(zero_shot.0, zero_shot.1)],
            );
            self
        }

        pub fn emotion_calls(&self) -> usize {
            self.emotion_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelBackend for StubBackend {
        async fn emotion_scores(&self, text: &str) -> Result<Vec<LabelScore>> {
            self.emotion_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if text.contains("FAIL") {
                return Err(AppError::ModelBackend("stub failure".to_string()));
            }
            Ok(self
                .emotions
                .lock()
                .unwrap()
                .get(text)
                .cloned()
                .unwrap_or_else(|| vec![LabelScore::new("neutral", 0.9)]))
        }

        async fn zero_shot(&self, text: &str, _candidates: &[&str]) -> Result<Vec<LabelScore>> {
            self.zero_shot_calls.fetch_add(1, Ordering::SeqCst);
            if text.contains("FAIL") {
                return Err(AppError::ModelBackend("stub failure".to_string()));
            }
            Ok(self
                .zero_shot
                .lock()
                .unwrap()
                .get(text)
                .cloned()
                .unwrap_or_else(|| vec![LabelScore::new("neutral", 0.9)]))
        }
    }
}
