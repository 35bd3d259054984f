//! MCP error types and their retry classification

use thiserror::Error;

/// Failure category used to decide whether an operation is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum McpErrorKind {
    ConnectionError,
    AuthenticationError,
    ToolNotFound,
    ParameterError,
    Timeout,
    ServerError,
    Cancelled,
    Unknown,
}

impl McpErrorKind {
    /// Transient categories worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            McpErrorKind::ConnectionError | McpErrorKind::Timeout | McpErrorKind::ServerError
        )
    }

    /// Category for a non-success HTTP status
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => McpErrorKind::AuthenticationError,
            404 => McpErrorKind::ToolNotFound,
            400 => McpErrorKind::ParameterError,
            408 => McpErrorKind::Timeout,
            500..=599 => McpErrorKind::ServerError,
            _ => McpErrorKind::ConnectionError,
        }
    }

    /// Category for a JSON-RPC error code
    pub fn from_rpc_code(code: i64) -> Self {
        match code {
            -32601 => McpErrorKind::ToolNotFound,
            -32602 => McpErrorKind::ParameterError,
            -32603 | -32099..=-32000 => McpErrorKind::ServerError,
            _ => McpErrorKind::Unknown,
        }
    }
}

impl std::fmt::Display for McpErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            McpErrorKind::ConnectionError => "connection error",
            McpErrorKind::AuthenticationError => "authentication error",
            McpErrorKind::ToolNotFound => "tool not found",
            McpErrorKind::ParameterError => "parameter error",
            McpErrorKind::Timeout => "timeout",
            McpErrorKind::ServerError => "server error",
            McpErrorKind::Cancelled => "cancelled",
            McpErrorKind::Unknown => "unknown error",
        };
        f.write_str(name)
    }
}

/// Errors raised by the wire client, the pool and the retry policy
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Server error: {0}")]
    Server(String),

    /// JSON-RPC error object returned by the server
    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The tool ran and reported failure (`isError: true`)
    #[error("Tool '{tool}' reported an error: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Client is not connected")]
    NotConnected,

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Client has been disposed")]
    Disposed,

    /// Every attempt failed with a retryable error
    #[error("{operation} failed after {attempts} attempts: {source}")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        source: Box<McpError>,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// Error for a non-success HTTP status, classified by status code
    pub fn from_status(status: u16, body: impl AsRef<str>) -> Self {
        let message = format!("HTTP {}: {}", status, truncate(body.as_ref(), 200));
        match McpErrorKind::from_status(status) {
            McpErrorKind::AuthenticationError => McpError::Authentication(message),
            McpErrorKind::ToolNotFound => McpError::ToolNotFound(message),
            McpErrorKind::ParameterError => McpError::InvalidParameters(message),
            McpErrorKind::Timeout => McpError::Timeout(message),
            McpErrorKind::ServerError => McpError::Server(message),
            _ => McpError::Connection(message),
        }
    }

    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        McpError::Rpc {
            code,
            message: message.into(),
        }
    }

    pub fn cancelled(what: impl Into<String>) -> Self {
        McpError::Cancelled(what.into())
    }

    /// Retry classification of this error
    pub fn kind(&self) -> McpErrorKind {
        match self {
            McpError::Connection(_) | McpError::NotConnected => McpErrorKind::ConnectionError,
            McpError::Authentication(_) => McpErrorKind::AuthenticationError,
            McpError::ToolNotFound(_) => McpErrorKind::ToolNotFound,
            McpError::InvalidParameters(_) => McpErrorKind::ParameterError,
            McpError::Timeout(_) => McpErrorKind::Timeout,
            McpError::Server(_) => McpErrorKind::ServerError,
            McpError::Rpc { code, .. } => McpErrorKind::from_rpc_code(*code),
            McpError::Cancelled(_) => McpErrorKind::Cancelled,
            McpError::RetryExhausted { source, .. } => source.kind(),
            McpError::Http(e) => classify_http(e),
            McpError::ToolFailed { .. }
            | McpError::Protocol(_)
            | McpError::Disposed
            | McpError::Json(_) => McpErrorKind::Unknown,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == McpErrorKind::Cancelled
    }
}

fn classify_http(error: &reqwest::Error) -> McpErrorKind {
    if error.is_timeout() {
        McpErrorKind::Timeout
    } else if let Some(status) = error.status() {
        McpErrorKind::from_status(status.as_u16())
    } else if error.is_builder() {
        McpErrorKind::Unknown
    } else {
        McpErrorKind::ConnectionError
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

pub type McpResult<T> = Result<T, McpError>;
