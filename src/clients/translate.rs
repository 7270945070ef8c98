use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use super::Translator;
use crate::core::config::AppConfig;
use crate::core::models::Language;
use crate::errors::DigestError;

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

/// Client for a Google Translate v2 style endpoint (form-encoded request,
/// `data.translations[0].translatedText` in the response).
#[derive(Debug, Clone)]
pub struct TranslationClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl TranslationClient {
    #[must_use]
    pub fn new(http: Client, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            api_key: None,
            timeout,
        }
    }

    #[must_use]
    pub fn from_config(http: Client, config: &AppConfig) -> Self {
        Self {
            http,
            endpoint: config.translate_url.clone(),
            api_key: config.translate_api_key.clone(),
            timeout: Duration::from_secs(config.http_timeout_secs),
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

#[async_trait]
impl Translator for TranslationClient {
    async fn translate(
        &self,
        text: &str,
        target: Language,
        source: Language,
    ) -> Result<String, DigestError> {
        let mut form = vec![
            ("q", text),
            ("target", target.code()),
            ("source", source.code()),
        ];
        if let Some(key) = &self.api_key {
            form.push(("key", key.as_str()));
        }

        let response = self
            .http
            .post(&self.endpoint)
            .timeout(self.timeout)
            .form(&form)
            .send()
            .await
            .map_err(|e| DigestError::Translation(format!("Translation request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(%status, "Translation service rejected the request");
            return Err(DigestError::Translation(format!(
                "Translation service error (status {status}): {error_text}"
            )));
        }

        let parsed: TranslateResponse = response.json().await.map_err(|e| {
            DigestError::Translation(format!("Failed to parse translation response: {e}"))
        })?;

        let translated = parsed
            .data
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or_else(|| {
                DigestError::Translation("Translation response had no translations".to_string())
            })?;

        info!(%source, %target, chars = translated.chars().count(), "Translated content");
        Ok(translated)
    }
}
