use std::env;

use crate::core::models::{Language, StreamFormat};

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub extract_url: String,
    pub completion_url: String,
    pub completion_api_key: Option<String>,
    pub completion_model: Option<String>,
    pub stream_format: StreamFormat,
    pub translate_url: String,
    pub translate_api_key: Option<String>,
    pub source_language: Language,
    pub http_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| format!("{key}: environment variable not found"))
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            extract_url: required("PAGEDIGEST_EXTRACT_URL")?,
            completion_url: required("PAGEDIGEST_COMPLETION_URL")?,
            completion_api_key: optional("PAGEDIGEST_COMPLETION_API_KEY"),
            completion_model: optional("PAGEDIGEST_COMPLETION_MODEL"),
            stream_format: optional("PAGEDIGEST_STREAM_FORMAT")
                .map(|v| v.parse::<StreamFormat>())
                .transpose()
                .map_err(|e| format!("PAGEDIGEST_STREAM_FORMAT: {e}"))?
                .unwrap_or_default(),
            translate_url: required("PAGEDIGEST_TRANSLATE_URL")?,
            translate_api_key: optional("PAGEDIGEST_TRANSLATE_API_KEY"),
            source_language: optional("PAGEDIGEST_SOURCE_LANGUAGE")
                .map(|v| v.parse::<Language>())
                .transpose()
                .map_err(|e| format!("PAGEDIGEST_SOURCE_LANGUAGE: {e}"))?
                .unwrap_or_default(),
            http_timeout_secs: optional("PAGEDIGEST_HTTP_TIMEOUT_SECS")
                .map(|v| v.trim().parse::<u64>())
                .transpose()
                .map_err(|e| format!("PAGEDIGEST_HTTP_TIMEOUT_SECS: {e}"))?
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        })
    }
}
