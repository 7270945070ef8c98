use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use super::Extractor;
use crate::core::config::AppConfig;
use crate::errors::DigestError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractRequest<'a> {
    url: &'a str,
    get_text: bool,
}

/// Client for the scraping service. The 2xx body is the extracted text.
#[derive(Debug, Clone)]
pub struct ExtractionClient {
    http: Client,
    endpoint: String,
    timeout: Duration,
}

impl ExtractionClient {
    #[must_use]
    pub fn new(http: Client, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            timeout,
        }
    }

    #[must_use]
    pub fn from_config(http: Client, config: &AppConfig) -> Self {
        Self::new(
            http,
            config.extract_url.clone(),
            Duration::from_secs(config.http_timeout_secs),
        )
    }
}

#[async_trait]
impl Extractor for ExtractionClient {
    async fn extract(&self, url: &str) -> Result<String, DigestError> {
        let response = self
            .http
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&ExtractRequest {
                url,
                get_text: true,
            })
            .send()
            .await
            .map_err(|e| DigestError::Extraction(format!("Extraction request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(%status, url, "Extraction service rejected the request");
            return Err(DigestError::Extraction(format!(
                "Extraction service error (status {status}): {error_text}"
            )));
        }

        let text = response.text().await.map_err(|e| {
            DigestError::Extraction(format!("Failed to read extraction response: {e}"))
        })?;

        info!(url, chars = text.chars().count(), "Extracted page text");
        Ok(text)
    }
}
