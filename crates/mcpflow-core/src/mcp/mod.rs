//! MCP (Model Context Protocol) wire client
//!
//! JSON-RPC 2.0 over HTTP POST with optionally SSE-framed responses. Only the
//! handshake, `tools/list` and `tools/call` exchanges are implemented.
//!
//! # Example
//!
//! ```rust,ignore
//! use mcpflow_core::mcp::{McpHttpClient, ToolClient};
//! use mcpflow_core::types::{CancellationToken, ServerDescriptor};
//!
//! let server = ServerDescriptor::new("docs", "https://example.com/mcp")
//!     .with_api_key("X-Api-Key: secret");
//! let client = McpHttpClient::new(server, logger)?;
//! let cancel = CancellationToken::new();
//!
//! if client.connect(&cancel).await? {
//!     let tools = client.list_tools(&cancel).await?;
//!     let text = client.call_tool("search", json!({ "q": "pool" }), &cancel).await?;
//! }
//! ```

mod auth;
mod client;
mod error;
mod mock;
mod sse;

pub use auth::{derive_auth_header, AuthHeader};
pub use client::{
    ClientFactory, ConnectionState, HttpClientFactory, McpHttpClient, ToolClient,
    DEFAULT_TOOLS_CACHE_TTL, PROTOCOL_VERSION, PROTOCOL_VERSION_HEADER, SESSION_HEADER,
};
pub use error::{McpError, McpErrorKind, McpResult};
pub use mock::{MockClientFactory, MockToolClient, MockToolResponse};
pub use sse::{extract_json_payload, strip_data_prefix};
