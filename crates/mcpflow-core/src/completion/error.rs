//! Completion error types

use thiserror::Error;

/// Errors raised while streaming a chat completion
#[derive(Error, Debug)]
pub enum CompletionError {
    /// Endpoint answered with a non-success status
    #[error("Completion API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Network/HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configured endpoint is not a usable URL
    #[error("Invalid completion URL '{0}'")]
    InvalidUrl(String),

    /// Request was cancelled
    #[error("Request cancelled")]
    Cancelled,

    /// Transport-level failure not covered above
    #[error("Transport error: {0}")]
    Transport(String),

    /// A scripted transport ran out of responses
    #[error("Script exhausted: {0}")]
    Script(String),
}

impl CompletionError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type CompletionResult<T> = Result<T, CompletionError>;
