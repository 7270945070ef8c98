//! Client modules for the external collaborators
//!
//! The orchestrator only sees the three traits below; the reqwest-backed
//! implementations live next to them (and in [`crate::ai::client`] for
//! completions).

pub mod extract;
pub mod translate;

use std::time::Duration;

use async_trait::async_trait;
use openai_api_rs::v1::chat_completion::ChatCompletionMessage;
use reqwest::Client;

use crate::ai::client::ByteStream;
use crate::core::models::{Language, StreamFormat};
use crate::errors::DigestError;

pub use extract::ExtractionClient;
pub use translate::TranslationClient;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Turns a URL into the plain text of the page.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<String, DigestError>;
}

/// Starts a streamed chat completion and returns its raw body.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, prompt: Vec<ChatCompletionMessage>)
    -> Result<ByteStream, DigestError>;

    /// How the returned body is framed.
    fn stream_format(&self) -> StreamFormat {
        StreamFormat::Plain
    }
}

/// Translates text between two languages.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        target: Language,
        source: Language,
    ) -> Result<String, DigestError>;
}

/// Shared HTTP client for all collaborators.
///
/// Only the connect phase is bounded here; whole-request timeouts are set
/// per call so a long completion stream is not cut off.
pub fn build_http_client() -> Result<Client, DigestError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .user_agent(concat!("pagedigest/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| DigestError::HttpError(format!("Failed to build HTTP client: {e}")))
}
