use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::{AppError, Result};

use super::{LabelScore, ModelBackend};

/// Number of GoEmotions categories; asked for explicitly so the endpoint
/// does not truncate to its default top-k.
const EMOTION_TOP_K: usize = 28;

#[derive(Debug, Serialize)]
struct ClassificationRequest<'a> {
    inputs: &'a str,
    parameters: ClassificationParameters,
    options: RequestOptions,
}

#[derive(Debug, Serialize)]
struct ClassificationParameters {
    top_k: usize,
}

#[derive(Debug, Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
    options: RequestOptions,
}

#[derive(Debug, Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [&'a str],
}

#[derive(Debug, Serialize)]
struct RequestOptions {
    wait_for_model: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassificationResponse {
    Batched(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

#[derive(Debug, Deserialize)]
struct ZeroShotResponse {
    labels: Vec<String>,
    scores: Vec<f64>,
}

/// Hugging Face Inference API backend (also works against a self-hosted
/// text-generation-inference style gateway exposing `/models/{id}`).
pub struct HfInferenceClient {
    client: Client,
    base_url: String,
    api_token: Option<String>,
    emotion_model: String,
    zero_shot_model: String,
}

impl HfInferenceClient {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("headline-sentiment/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone().filter(|t| !t.is_empty()),
            emotion_model: config.emotion_model.clone(),
            zero_shot_model: config.zero_shot_model.clone(),
        })
    }

    async fn post<B, R>(&self, model: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut request = self
            .client
            .post(format!("{}/models/{}", self.base_url, model))
            .json(body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::ModelBackend(format!(
                "{model} returned HTTP {status}: {error_text}"
            )));
        }

        Ok(response.json().await?)
    }
}

impl fmt::Debug for HfInferenceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HfInferenceClient")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("emotion_model", &self.emotion_model)
            .field("zero_shot_model", &self.zero_shot_model)
            .finish()
    }
}

#[async_trait]
impl ModelBackend for HfInferenceClient {
    async fn emotion_scores(&self, text: &str) -> Result<Vec<LabelScore>> {
        let request = ClassificationRequest {
            inputs: text,
            parameters: ClassificationParameters {
                top_k: EMOTION_TOP_K,
            },
            options: RequestOptions {
                wait_for_model: true,
            },
        };

        let response: ClassificationResponse = self.post(&self.emotion_model, &request).await?;
        let scores = match response {
            ClassificationResponse::Batched(batches) => batches.into_iter().next().unwrap_or_default(),
            ClassificationResponse::Flat(scores) => scores,
        };

        if scores.is_empty() {
            return Err(AppError::ModelBackend(format!(
                "{} returned no emotion scores",
                self.emotion_model
            )));
        }
        Ok(scores)
    }

    async fn zero_shot(&self, text: &str, candidates: &[&str]) -> Result<Vec<LabelScore>> {
        let request = ZeroShotRequest {
            inputs: text,
            parameters: ZeroShotParameters {
                candidate_labels: candidates,
            },
            options: RequestOptions {
                wait_for_model: true,
            },
        };

        let response: ZeroShotResponse = self.post(&self.zero_shot_model, &request).await?;
        if response.labels.len() != response.scores.len() {
            return Err(AppError::ModelBackend(format!(
                "{} returned {} labels for {} scores",
                self.zero_shot_model,
                response.labels.len(),
                response.scores.len()
            )));
        }

        Ok(response
            .labels
            .into_iter()
            .zip(response.scores)
            .map(|(label, score)| LabelScore::new(label, score))
            .collect())
    }
}
