//! Orchestration error types

use thiserror::Error;

use crate::completion::CompletionError;
use crate::config::ConfigError;

/// Errors ending an orchestration run
///
/// Budget exhaustion is not an error; it is reported on the outcome.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Tool-mandatory run with no usable server
    #[error("No MCP server is available")]
    NoServers,

    /// Tool-mandatory run with no enabled tool
    #[error("No MCP tool is enabled")]
    NoEnabledTools,

    /// Tool-mandatory run finished without a single tool round
    #[error("The model answered without calling any tool")]
    ToolNotUsed,

    /// Tool-mandatory run where the model reported no suitable tool
    #[error("The model reported that no available tool fits the request")]
    NoSuitableTool,

    #[error("Run cancelled")]
    Cancelled,

    /// The service has been shut down
    #[error("Tool service has been shut down")]
    Disposed,

    #[error("Completion failed: {0}")]
    Completion(CompletionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<CompletionError> for OrchestratorError {
    fn from(error: CompletionError) -> Self {
        if error.is_cancelled() {
            OrchestratorError::Cancelled
        } else {
            OrchestratorError::Completion(error)
        }
    }
}

impl OrchestratorError {
    /// Text shown to the user in place of an answer
    pub fn user_message(&self) -> String {
        match self {
            OrchestratorError::NoServers => "Tool-forced strategy failed: no MCP server is available.\n\n\
                Enable at least one server, or switch to a strategy that may answer without tools."
                .to_string(),
            OrchestratorError::NoEnabledTools => "Tool-forced strategy failed: no MCP tool is enabled.\n\n\
                Enable at least one tool in the server settings."
                .to_string(),
            OrchestratorError::ToolNotUsed => "Tool-forced strategy failed: the model did not call any tool.\n\n\
                Possible causes:\n\
                1. Every MCP tool is disabled\n\
                2. The model ignored the instruction to use tools (retrying may help)\n\n\
                Consider the tool-first or hybrid strategy to let the model decide."
                .to_string(),
            OrchestratorError::NoSuitableTool => "Tool-forced strategy failed: the model found no available tool \
                that can answer this request.\n\n\
                Suggestions:\n\
                1. Switch to the tool-first or hybrid strategy to allow a direct answer\n\
                2. Add an MCP tool that handles this kind of request\n\
                3. Rephrase the request to match the available tools"
                .to_string(),
            OrchestratorError::Cancelled => "The request was cancelled.".to_string(),
            OrchestratorError::Disposed => "The tool service has been shut down.".to_string(),
            OrchestratorError::Completion(e) => format!("Completion request failed: {}", e),
            OrchestratorError::Config(e) => format!("Configuration problem: {}", e),
        }
    }
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
