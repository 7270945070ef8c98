//! Chat-completion API client module
//!
//! Sends the two-message prompt with streaming enabled and hands the raw
//! response body back as a byte stream for the aggregator.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use openai_api_rs::v1::chat_completion::{ChatCompletionMessage, Content, MessageRole};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::clients::Completer;
use crate::core::config::AppConfig;
use crate::core::models::StreamFormat;
use crate::errors::DigestError;

/// Boxed body stream of a completion response.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<bytes::Bytes, DigestError>> + Send>>;

#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4 + 1
}

/// HTTP client for the streamed chat-completion collaborator.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
    model: Option<String>,
    stream_format: StreamFormat,
}

impl CompletionClient {
    #[must_use]
    pub fn new(http: Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            api_key: None,
            model: None,
            stream_format: StreamFormat::Plain,
        }
    }

    #[must_use]
    pub fn from_config(http: Client, config: &AppConfig) -> Self {
        Self {
            http,
            endpoint: config.completion_url.clone(),
            api_key: config.completion_api_key.clone(),
            model: config.completion_model.clone(),
            stream_format: config.stream_format,
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_stream_format(mut self, format: StreamFormat) -> Self {
        self.stream_format = format;
        self
    }

    /// JSON body of the completion request.
    #[must_use]
    pub fn build_request_body(&self, prompt: &[ChatCompletionMessage]) -> Value {
        let mut body = json!({
            "messages": build_chat_messages_from_prompt(prompt),
            "stream": true
        });
        if let Some(model) = &self.model {
            body["model"] = json!(model);
        }
        body
    }

    /// Opens the streamed completion.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::Generation`] if the request cannot be sent or
    /// the service answers with a non-2xx status.
    pub async fn open_stream(
        &self,
        prompt: Vec<ChatCompletionMessage>,
    ) -> Result<ByteStream, DigestError> {
        #[cfg(feature = "debug-logs")]
        info!("Using completion prompt:\n{:?}", prompt);

        let estimated_input_tokens = prompt
            .iter()
            .map(|msg| match &msg.content {
                Content::Text(t) => estimate_tokens(t),
                Content::ImageUrl(_) => 0,
            })
            .sum::<usize>();

        info!(
            messages = prompt.len(),
            estimated_input_tokens, "Requesting streamed completion"
        );

        let request_body = self.build_request_body(&prompt);

        let mut request = self.http.post(&self.endpoint).json(&request_body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        if self.stream_format == StreamFormat::Sse {
            request = request.header(reqwest::header::ACCEPT, "text/event-stream");
        }

        let response = request
            .send()
            .await
            .map_err(|e| DigestError::Generation(format!("Completion request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|e| {
                format!("Failed to read error response body (status {status}): {e}")
            });
            warn!(%status, "Completion service rejected the request");
            return Err(DigestError::Generation(format!(
                "Completion service error (status {status}): {error_text}"
            )));
        }

        Ok(Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(DigestError::from)),
        ))
    }
}

#[async_trait]
impl Completer for CompletionClient {
    async fn complete(
        &self,
        prompt: Vec<ChatCompletionMessage>,
    ) -> Result<ByteStream, DigestError> {
        self.open_stream(prompt).await
    }

    fn stream_format(&self) -> StreamFormat {
        self.stream_format
    }
}

/// Maps the prompt to `{role, content}` objects.
/// Image parts are not part of this service's contract and are dropped.
pub(crate) fn build_chat_messages_from_prompt(prompt: &[ChatCompletionMessage]) -> Vec<Value> {
    prompt
        .iter()
        .filter_map(|m| {
            let role = match m.role {
                MessageRole::system => "system",
                MessageRole::assistant => "assistant",
                MessageRole::user | MessageRole::function | MessageRole::tool => "user",
            };
            match &m.content {
                Content::Text(t) => Some(json!({ "role": role, "content": t })),
                Content::ImageUrl(_) => None,
            }
        })
        .collect()
}
