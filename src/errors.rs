use thiserror::Error;

#[derive(Debug, Error)]
pub enum DigestError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Failed to extract content: {0}")]
    Extraction(String),

    #[error("Failed to generate content: {0}")]
    Generation(String),

    #[error("Failed to translate content: {0}")]
    Translation(String),

    #[error("An analysis is already in progress")]
    Busy,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to send HTTP request: {0}")]
    HttpError(String),
}

impl From<reqwest::Error> for DigestError {
    fn from(error: reqwest::Error) -> Self {
        DigestError::HttpError(error.to_string())
    }
}
