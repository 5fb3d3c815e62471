use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const TRANSLATE_API_URL: &str = "https://translation.googleapis.com/language/translate/v2";

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    target: &'a str,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
struct Translation {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// Google Cloud Translation (v2 REST) client.
pub struct Translator {
    client: Client,
    api_url: String,
    api_key: String,
    target_language: String,
}

impl Translator {
    pub fn new(api_key: String, target_language: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: TRANSLATE_API_URL.to_string(),
            api_key,
            target_language,
        })
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    pub async fn translate(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let request = TranslateRequest {
            q: text,
            target: &self.target_language,
            format: "text",
        };

        let response = self
            .client
            .post(&self.api_url)
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::TranslationApi(format!("API error: {}", error_text)));
        }

        let translate_response: TranslateResponse = response.json().await?;

        translate_response
            .data
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or_else(|| AppError::TranslationApi("No translation returned from API".to_string()))
    }

    /// Translate, keeping the original text if the call fails.
    pub async fn translate_or_original(&self, text: &str) -> String {
        match self.translate(text).await {
            Ok(translated) => translated,
            Err(e) => {
                tracing::warn!(error = %e, "translation failed, keeping original headline");
                text.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn translator_for(server: &MockServer) -> Translator {
        Translator::new("key-123".to_string(), "ko".to_string(), Duration::from_secs(5))
            .unwrap()
            .with_api_url(server.uri())
    }

    #[tokio::test]
    async fn returns_translated_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("key", "key-123"))
            .and(body_partial_json(json!({"q": "Hello world", "target": "ko"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"translations": [{"translatedText": "안녕하세요 세계"}]}
            })))
            .mount(&server)
            .await;

        let translated = translator_for(&server).translate("Hello world").await.unwrap();
        assert_eq!(translated, "안녕하세요 세계");
    }

    #[tokio::test]
    async fn empty_input_skips_the_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        assert_eq!(translator_for(&server).translate("  ").await.unwrap(), "");
    }

    #[tokio::test]
    async fn failure_falls_back_to_original() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("bad key"))
            .mount(&server)
            .await;

        let translator = translator_for(&server);
        assert!(translator.translate("Storm warning").await.is_err());
        assert_eq!(
            translator.translate_or_original("Storm warning").await,
            "Storm warning"
        );
    }
}
