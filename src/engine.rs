//! Translation capability and its production implementation.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TranslationError;

const DEFAULT_BASE_URL: &str = "https://translate.googleapis.com";

#[async_trait]
pub trait TranslationEngine: Send + Sync {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslationError>;
}

/// Google web translate endpoint (the `client=gtx` JSON API), with
/// automatic source-language detection.
#[derive(Debug, Clone)]
pub struct GoogleTranslate {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleTranslate {
    pub fn new() -> Self {
        Self::with_base_url(base_url())
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl Default for GoogleTranslate {
    fn default() -> Self {
        Self::new()
    }
}

fn base_url() -> String {
    std::env::var("TRANSLATE_API_BASE").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

#[async_trait]
impl TranslationEngine for GoogleTranslate {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslationError> {
        let url = format!("{}/translate_a/single", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target_lang),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::Status { status, body });
        }

        let payload: Value = response.json().await?;
        parse_translation(&payload)
    }
}

/// The endpoint answers with nested arrays; index 0 holds the translated
/// segments, each segment's index 0 the translated text.
fn parse_translation(payload: &Value) -> Result<String, TranslationError> {
    let segments = payload
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslationError::Malformed("missing segment list".to_string()))?;

    let mut translated = String::new();
    for segment in segments {
        if let Some(piece) = segment.get(0).and_then(Value::as_str) {
            translated.push_str(piece);
        }
    }

    if translated.is_empty() {
        return Err(TranslationError::Malformed(
            "no translated text in response".to_string(),
        ));
    }
    Ok(translated)
}
