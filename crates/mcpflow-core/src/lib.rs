//! McpFlow Core
//!
//! Tool orchestration for streaming LLM completions.
//! The model is offered tools advertised by MCP servers; its tool calls are
//! executed concurrently and fed back until it produces an answer. The crate
//! is runtime-agnostic apart from tokio and reports through the `Logger` trait,
//! so hosts plug in their own log sink and settings store.
//!
//! ## Layers
//!
//! - `mcp`: JSON-RPC wire client for tool servers (handshake, list, call)
//! - `pool`: one shared connection per server endpoint and credential
//! - `retry`: exponential backoff with jitter for handshakes and tool calls
//! - `tools`: tool cache, per-run catalog and the concurrent executor
//! - `completion`: OpenAI-compatible streaming client and delta collector
//! - `orchestrator`: the multi-round loop, strategies and the host service
//!
//! ```rust,ignore
//! use mcpflow_core::{FileSettingsStore, HttpClientFactory, ReqwestTransport, ToolService};
//!
//! let store = Arc::new(FileSettingsStore::user()?);
//! let factory = Arc::new(HttpClientFactory::new(logger.clone())?);
//! let transport = Arc::new(ReqwestTransport::new()?);
//! let service = ToolService::start(store, factory, transport, logger).await?;
//!
//! let outcome = service
//!     .complete(&conversation, Some("research"), &mut NoOpObserver, &cancel)
//!     .await?;
//! println!("{}", outcome.answer);
//! ```

pub mod types;
pub mod logging;
pub mod config;
pub mod mcp;
pub mod retry;
pub mod pool;
pub mod tools;
pub mod completion;
pub mod orchestrator;

// Re-export commonly used types
pub use types::{
    CallLimit, CancellationToken, ConversationMessage, MessageRole, PendingToolCall, ServerDescriptor,
    ToolCallRequest, ToolCallResult, ToolDescriptor, ToolToggle,
};

pub use logging::{ConsoleLogger, LogVerbosity, Logger, NoOpLogger, SharedLogger, VerbosityLogger};

pub use config::{ConfigError, ConfigResult, FileSettingsStore, MemorySettingsStore, Settings, SettingsStore};

pub use mcp::{ClientFactory, HttpClientFactory, McpError, McpHttpClient, McpResult, ToolClient};

pub use retry::RetryPolicy;

pub use pool::{ConnectionPool, PoolConfig, PoolStatistics};

pub use tools::{ConcurrentExecutor, ToolCache, ToolCatalog};

pub use completion::{CompletionClient, CompletionError, CompletionResult, ReqwestTransport, StreamTransport};

pub use orchestrator::{
    NoOpObserver, Orchestrator, OrchestratorError, OrchestratorResult, ResultDisplayMode, RunObserver,
    RunOutcome, StrategyConfig, ToolService, ToolStrategy, ToolTraceDisplay,
};
