use std::fmt;
use std::str::FromStr;

use crate::prompt::{AnalysisMode, SummaryLength};

/// Output languages offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    Arabic,
    English,
    French,
    Spanish,
    German,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::Arabic,
        Language::English,
        Language::French,
        Language::Spanish,
        Language::German,
    ];

    /// ISO 639-1 code, as sent to the translation service.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Arabic => "ar",
            Self::English => "en",
            Self::French => "fr",
            Self::Spanish => "es",
            Self::German => "de",
        }
    }

    /// Name of the language in the language itself.
    #[must_use]
    pub const fn native_name(self) -> &'static str {
        match self {
            Self::Arabic => "العربية",
            Self::English => "English",
            Self::French => "Français",
            Self::Spanish => "Español",
            Self::German => "Deutsch",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.code() == code)
            .ok_or_else(|| format!("Invalid language: {s}. Valid options: ar, en, fr, es, de"))
    }
}

/// Wire format of the completion response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamFormat {
    /// The body is the generated text itself, delivered in chunks.
    #[default]
    Plain,
    /// The body is an OpenAI-style `text/event-stream` of chat completion deltas.
    Sse,
}

impl FromStr for StreamFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "text" => Ok(Self::Plain),
            "sse" | "event-stream" => Ok(Self::Sse),
            _ => Err(format!("Invalid stream format: {s}. Valid options: plain, sse")),
        }
    }
}

/// One user submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub url: String,
    pub mode: AnalysisMode,
    pub summary_length: SummaryLength,
    pub target_language: Language,
}

impl AnalysisRequest {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mode: AnalysisMode::default(),
            summary_length: SummaryLength::default(),
            target_language: Language::default(),
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: AnalysisMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_summary_length(mut self, length: SummaryLength) -> Self {
        self.summary_length = length;
        self
    }

    #[must_use]
    pub fn with_target_language(mut self, language: Language) -> Self {
        self.target_language = language;
        self
    }
}
