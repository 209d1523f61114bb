use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScribeError {
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Failed to access LLM API: {0}")]
    LlmError(String),

    #[error("LLM API returned status {status}: {body}")]
    ApiStatus { status: u16, body: String },

    #[error("Failed to send HTTP request: {0}")]
    HttpError(String),

    #[error("Summary generation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Failed to deliver summary: {0}")]
    DeliveryError(String),

    #[error("Failed to read input: {0}")]
    IoError(String),
}

impl ScribeError {
    /// Whether a single LLM request may be retried after this error.
    ///
    /// Transport failures, rate limits and server-side errors qualify; anything
    /// the request itself caused does not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ScribeError::HttpError(_) => true,
            ScribeError::ApiStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ScribeError {
    fn from(error: reqwest::Error) -> Self {
        ScribeError::HttpError(error.to_string())
    }
}

impl From<anyhow::Error> for ScribeError {
    fn from(error: anyhow::Error) -> Self {
        ScribeError::LlmError(error.to_string())
    }
}

impl From<std::io::Error> for ScribeError {
    fn from(error: std::io::Error) -> Self {
        ScribeError::IoError(error.to_string())
    }
}

impl From<serde_json::Error> for ScribeError {
    fn from(error: serde_json::Error) -> Self {
        ScribeError::IoError(format!("invalid JSON: {error}"))
    }
}
