//! MCP client over HTTP POST
//!
//! One JSON-RPC request per POST; responses may be plain JSON or SSE-framed.
//! The protocol model types (tool lists, call results, content blocks) come
//! from the official rmcp SDK.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, ClientCapabilities, ClientInfo, Implementation, ListToolsResult,
    PaginatedRequestParams, ProtocolVersion, RawContent,
};
use serde::Serialize;
use serde_json::Value;

use super::auth::{derive_auth_header, AuthHeader};
use super::error::{McpError, McpResult};
use super::sse::extract_json_payload;
use crate::logging::SharedLogger;
use crate::types::{CancellationToken, ServerDescriptor, ToolDescriptor};

/// Protocol revision sent on every request
pub const PROTOCOL_VERSION: &str = "2025-11-25";
pub const PROTOCOL_VERSION_HEADER: &str = "MCP-Protocol-Version";
pub const SESSION_HEADER: &str = "MCP-Session-Id";
const ACCEPT_VALUE: &str = "application/json, text/event-stream";
const CLIENT_NAME: &str = "mcpflow";
const JSONRPC_VERSION: &str = "2.0";

/// Default lifetime of the client's own tool list cache
pub const DEFAULT_TOOLS_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Upper bound on `tools/list` pages followed via `nextCursor`
const MAX_TOOL_PAGES: usize = 32;

/// Lifecycle of a wire client
///
/// `Disconnected -> Connecting -> Connected`; a failed handshake returns to
/// `Disconnected`. `Disposed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disposed,
}

/// A connection to one tool server
#[async_trait]
pub trait ToolClient: Send + Sync + std::fmt::Debug {
    /// The descriptor this client was created for
    fn server(&self) -> &ServerDescriptor;

    fn state(&self) -> ConnectionState;

    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Perform the handshake. Returns `Ok(false)` when the server could not be
    /// reached or rejected the handshake.
    async fn connect(&self, cancel: &CancellationToken) -> McpResult<bool>;

    /// Tools advertised by the server, served from the client cache while fresh
    async fn list_tools(&self, cancel: &CancellationToken) -> McpResult<Vec<ToolDescriptor>>;

    /// Re-fetch the tool list, bypassing the cache
    async fn refresh_tools(&self, cancel: &CancellationToken) -> McpResult<Vec<ToolDescriptor>>;

    fn invalidate_tools_cache(&self);

    /// Invoke a tool and return its text output
    async fn call_tool(&self, name: &str, arguments: Value, cancel: &CancellationToken) -> McpResult<String>;

    /// Release the connection; every later operation fails with `Disposed`
    fn dispose(&self);
}

/// Builds clients for the connection pool
pub trait ClientFactory: Send + Sync {
    fn create(&self, server: &ServerDescriptor) -> McpResult<Arc<dyn ToolClient>>;
}

/// Factory producing [`McpHttpClient`]s that share one HTTP connection pool
pub struct HttpClientFactory {
    http: reqwest::Client,
    tools_cache_ttl: Duration,
    logger: SharedLogger,
}

impl HttpClientFactory {
    pub fn new(logger: SharedLogger) -> McpResult<Self> {
        Ok(Self {
            http: default_http_client()?,
            tools_cache_ttl: DEFAULT_TOOLS_CACHE_TTL,
            logger,
        })
    }

    pub fn with_tools_cache_ttl(mut self, ttl: Duration) -> Self {
        self.tools_cache_ttl = ttl;
        self
    }
}

impl ClientFactory for HttpClientFactory {
    fn create(&self, server: &ServerDescriptor) -> McpResult<Arc<dyn ToolClient>> {
        let client = McpHttpClient::with_http(server.clone(), self.http.clone(), self.logger.clone())
            .with_tools_cache_ttl(self.tools_cache_ttl);
        Ok(Arc::new(client))
    }
}

fn default_http_client() -> McpResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()?)
}

struct CachedTools {
    fetched_at: Instant,
    tools: Vec<ToolDescriptor>,
}

/// MCP client speaking JSON-RPC over HTTP POST
pub struct McpHttpClient {
    server: ServerDescriptor,
    http: reqwest::Client,
    auth: Option<AuthHeader>,
    state: RwLock<ConnectionState>,
    session_id: RwLock<Option<String>>,
    server_info: RwLock<Option<Implementation>>,
    next_id: AtomicU64,
    tools_cache: RwLock<Option<CachedTools>>,
    tools_cache_ttl: Duration,
    logger: SharedLogger,
}

impl McpHttpClient {
    /// Create a client with its own HTTP connection pool
    pub fn new(server: ServerDescriptor, logger: SharedLogger) -> McpResult<Self> {
        Ok(Self::with_http(server, default_http_client()?, logger))
    }

    /// Create a client on a shared `reqwest::Client`
    pub fn with_http(server: ServerDescriptor, http: reqwest::Client, logger: SharedLogger) -> Self {
        let auth = derive_auth_header(&server.api_key);
        Self {
            server,
            http,
            auth,
            state: RwLock::new(ConnectionState::Disconnected),
            session_id: RwLock::new(None),
            server_info: RwLock::new(None),
            next_id: AtomicU64::new(1),
            tools_cache: RwLock::new(None),
            tools_cache_ttl: DEFAULT_TOOLS_CACHE_TTL,
            logger,
        }
    }

    pub fn with_tools_cache_ttl(mut self, ttl: Duration) -> Self {
        self.tools_cache_ttl = ttl;
        self
    }

    /// Server identity from the last successful handshake
    pub fn server_info(&self) -> Option<Implementation> {
        self.server_info.read().clone()
    }

    /// Session id assigned by the server, if any
    pub fn session_id(&self) -> Option<String> {
        self.session_id.read().clone()
    }

    fn ensure_connected(&self) -> McpResult<()> {
        match *self.state.read() {
            ConnectionState::Connected => Ok(()),
            ConnectionState::Disposed => Err(McpError::Disposed),
            _ => Err(McpError::NotConnected),
        }
    }

    fn build_post<B: Serialize + ?Sized>(&self, body: &B) -> reqwest::RequestBuilder {
        let mut request = self
            .http
            .post(&self.server.url)
            .header(PROTOCOL_VERSION_HEADER, PROTOCOL_VERSION)
            .header(reqwest::header::ACCEPT, ACCEPT_VALUE)
            .json(body);

        if let Some(auth) = &self.auth {
            request = request.header(auth.name.as_str(), auth.value.as_str());
        }
        if let Some(session) = self.session_id.read().as_deref() {
            request = request.header(SESSION_HEADER, session);
        }
        request
    }

    /// Send one JSON-RPC request and return its `result`
    async fn request<P: Serialize + Send>(
        &self,
        method: &str,
        params: P,
        cancel: &CancellationToken,
    ) -> McpResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let body = serde_json::to_value(RpcEnvelope {
            jsonrpc: JSONRPC_VERSION,
            id: Some(id),
            method,
            params: Some(params),
        })?;

        self.logger.debug(&format!(
            "[McpClient] -> {} (id {}) to '{}'",
            method, id, self.server.name
        ));

        let exchange = async {
            let response = self.build_post(&body).send().await?;
            let status = response.status();
            let session = response
                .headers()
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let text = response.text().await?;
            Ok::<_, McpError>((status, session, text))
        };

        let (status, session, text) = tokio::select! {
            _ = cancel.cancelled() => return Err(McpError::cancelled(format!("{} on '{}'", method, self.server.name))),
            result = exchange => result?,
        };

        if !status.is_success() {
            return Err(McpError::from_status(status.as_u16(), &text));
        }
        if let Some(session) = session {
            *self.session_id.write() = Some(session);
        }

        parse_rpc_result(&text)
    }

    /// Post a JSON-RPC notification without waiting for the outcome
    fn notify(&self, method: &str) {
        let request = self.build_post(&RpcEnvelope::<()> {
            jsonrpc: JSONRPC_VERSION,
            id: None,
            method,
            params: None,
        });
        let logger = self.logger.clone();
        let method = method.to_string();
        tokio::spawn(async move {
            if let Err(e) = request.send().await.and_then(|r| r.error_for_status()) {
                logger.debug(&format!("[McpClient] Notification {} failed: {}", method, e));
            }
        });
    }

    async fn handshake(&self, cancel: &CancellationToken) -> McpResult<()> {
        let params = ClientInfo {
            meta: None,
            protocol_version: protocol_version()?,
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: CLIENT_NAME.to_string(),
                title: Some("McpFlow".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                website_url: None,
                icons: None,
            },
        };

        let mut result = self.request("initialize", params, cancel).await?;
        // Servers that omit or mangle their identity are still usable
        let info = result
            .get_mut("serverInfo")
            .map(Value::take)
            .and_then(|info| serde_json::from_value::<Implementation>(info).ok());
        if let Some(info) = &info {
            self.logger.info(&format!(
                "[McpClient] '{}' is {} {}",
                self.server.name, info.name, info.version
            ));
        }
        *self.server_info.write() = info;

        self.notify("notifications/initialized");
        Ok(())
    }

    async fn fetch_tools(&self, cancel: &CancellationToken) -> McpResult<Vec<ToolDescriptor>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_TOOL_PAGES {
            let params = PaginatedRequestParams {
                meta: None,
                cursor: cursor.take(),
            };
            let page: ListToolsResult = serde_json::from_value(self.request("tools/list", params, cancel).await?)?;
            cursor = page.next_cursor;
            tools.extend(page.tools.into_iter().map(ToolDescriptor::from));

            if cursor.is_none() {
                break;
            }
        }

        Ok(tools)
    }
}

/// JSON-RPC 2.0 request or notification body
#[derive(Serialize)]
struct RpcEnvelope<'a, P> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<P>,
}

fn protocol_version() -> McpResult<ProtocolVersion> {
    Ok(serde_json::from_value(Value::from(PROTOCOL_VERSION))?)
}

/// Restores `Disconnected` when a handshake future is dropped mid-flight,
/// e.g. by a per-attempt timeout
struct ConnectingGuard<'a> {
    state: &'a RwLock<ConnectionState>,
    armed: bool,
}

impl ConnectingGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.write();
        if *state == ConnectionState::Connecting {
            *state = ConnectionState::Disconnected;
        }
    }
}

/// Extract `result` from a JSON-RPC response body, mapping `error` objects
fn parse_rpc_result(body: &str) -> McpResult<Value> {
    let payload = extract_json_payload(body);
    if payload.is_empty() {
        return Err(McpError::Protocol("empty response body".to_string()));
    }

    let mut response: Value = serde_json::from_str(payload)?;
    if let Some(error) = response.get("error") {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(McpError::Rpc { code, message });
    }

    response
        .get_mut("result")
        .map(Value::take)
        .ok_or_else(|| McpError::Protocol("response carries neither result nor error".to_string()))
}

/// Concatenate the text blocks of a tool result
fn result_text(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|c| match &c.raw {
            RawContent::Text(t) => Some(t.text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[async_trait]
impl ToolClient for McpHttpClient {
    fn server(&self) -> &ServerDescriptor {
        &self.server
    }

    fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    async fn connect(&self, cancel: &CancellationToken) -> McpResult<bool> {
        {
            let mut state = self.state.write();
            match *state {
                ConnectionState::Disposed => return Err(McpError::Disposed),
                ConnectionState::Connected => return Ok(true),
                ConnectionState::Connecting => {
                    self.logger.warn(&format!(
                        "[McpClient] Handshake with '{}' already in progress",
                        self.server.name
                    ));
                    return Ok(false);
                }
                ConnectionState::Disconnected => *state = ConnectionState::Connecting,
            }
        }

        self.logger.info(&format!(
            "[McpClient] Connecting to '{}' at {}",
            self.server.name, self.server.url
        ));

        let guard = ConnectingGuard {
            state: &self.state,
            armed: true,
        };
        let outcome = self.handshake(cancel).await;
        guard.disarm();

        let mut state = self.state.write();
        if *state == ConnectionState::Disposed {
            return Err(McpError::Disposed);
        }
        match outcome {
            Ok(()) => {
                *state = ConnectionState::Connected;
                drop(state);
                self.logger.info(&format!("[McpClient] Connected to '{}'", self.server.name));
                Ok(true)
            }
            Err(e) if e.is_cancelled() => {
                *state = ConnectionState::Disconnected;
                Err(e)
            }
            Err(e) => {
                *state = ConnectionState::Disconnected;
                drop(state);
                self.logger.warn(&format!(
                    "[McpClient] Handshake with '{}' failed: {}",
                    self.server.name, e
                ));
                Ok(false)
            }
        }
    }

    async fn list_tools(&self, cancel: &CancellationToken) -> McpResult<Vec<ToolDescriptor>> {
        self.ensure_connected()?;

        if let Some(cached) = self.tools_cache.read().as_ref() {
            if cached.fetched_at.elapsed() < self.tools_cache_ttl {
                return Ok(cached.tools.clone());
            }
        }

        self.refresh_tools(cancel).await
    }

    async fn refresh_tools(&self, cancel: &CancellationToken) -> McpResult<Vec<ToolDescriptor>> {
        self.ensure_connected()?;

        let tools = self.fetch_tools(cancel).await?;
        self.logger.info(&format!(
            "[McpClient] Listed {} tools from '{}'",
            tools.len(),
            self.server.name
        ));

        *self.tools_cache.write() = Some(CachedTools {
            fetched_at: Instant::now(),
            tools: tools.clone(),
        });
        Ok(tools)
    }

    fn invalidate_tools_cache(&self) {
        *self.tools_cache.write() = None;
    }

    async fn call_tool(&self, name: &str, arguments: Value, cancel: &CancellationToken) -> McpResult<String> {
        self.ensure_connected()?;
        self.logger.info(&format!("[McpClient] Calling tool '{}' on '{}'", name, self.server.name));

        let params = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: arguments.as_object().cloned(),
            task: None,
        };
        let result: CallToolResult = serde_json::from_value(self.request("tools/call", params, cancel).await?)?;
        let text = result_text(&result);

        if result.is_error.unwrap_or(false) {
            let message = if text.is_empty() {
                "tool reported an error without details".to_string()
            } else {
                text
            };
            return Err(McpError::ToolFailed {
                tool: name.to_string(),
                message,
            });
        }

        Ok(text)
    }

    fn dispose(&self) {
        let previous = std::mem::replace(&mut *self.state.write(), ConnectionState::Disposed);
        if previous != ConnectionState::Disposed {
            self.logger.debug(&format!("[McpClient] Disposed client for '{}'", self.server.name));
        }
        *self.tools_cache.write() = None;
        *self.session_id.write() = None;
    }
}

impl std::fmt::Debug for McpHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpHttpClient")
            .field("server", &self.server.name)
            .field("url", &self.server.url)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{NoOpLogger, RecordingLogger};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rpc_ok(result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
    }

    async fn mount_initialize(server: &MockServer) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "initialize" })))
            .respond_with(
                rpc_ok(json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": { "name": "fake", "version": "1.2.3" }
                }))
                .insert_header(SESSION_HEADER, "sess-42"),
            )
            .mount(server)
            .await;
    }

    fn client_for(server: &MockServer, api_key: &str) -> McpHttpClient {
        let descriptor = ServerDescriptor::new("fake", format!("{}/mcp", server.uri())).with_api_key(api_key);
        McpHttpClient::new(descriptor, NoOpLogger::shared()).unwrap()
    }

    #[test]
    fn test_parse_rpc_result_sse_and_error() {
        let ok = parse_rpc_result("event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"x\":1}}\n\n").unwrap();
        assert_eq!(ok, json!({ "x": 1 }));

        let err = parse_rpc_result(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"nope"}}"#).unwrap_err();
        assert!(matches!(err, McpError::Rpc { code: -32601, .. }));

        assert!(matches!(parse_rpc_result("  "), Err(McpError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_handshake_sends_protocol_headers_and_keeps_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "initialize",
                "params": { "protocolVersion": PROTOCOL_VERSION, "clientInfo": { "name": "mcpflow" } }
            })))
            .and(header(PROTOCOL_VERSION_HEADER, PROTOCOL_VERSION))
            .and(header("Authorization", "Bearer sk-test"))
            .respond_with(
                rpc_ok(json!({ "serverInfo": { "name": "fake", "version": "1.2.3" } }))
                    .insert_header(SESSION_HEADER, "sess-42"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, "sk-test");
        let cancel = CancellationToken::new();
        assert!(client.connect(&cancel).await.unwrap());
        assert!(client.is_connected());
        assert_eq!(client.session_id().as_deref(), Some("sess-42"));
        assert_eq!(client.server_info().unwrap().version, "1.2.3");
    }

    #[tokio::test]
    async fn test_connect_failure_returns_false() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server, "");
        assert!(!client.connect(&CancellationToken::new()).await.unwrap());
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_list_tools_uses_session_and_cache() {
        let server = MockServer::start().await;
        mount_initialize(&server).await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "tools/list" })))
            .and(header(SESSION_HEADER, "sess-42"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                "event: message\ndata: {}\n\n",
                json!({
                    "jsonrpc": "2.0", "id": 2,
                    "result": { "tools": [
                        { "name": "search", "description": "Search docs", "inputSchema": { "type": "object" } }
                    ] }
                })
            )))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server, "X-Api-Key: k");
        let cancel = CancellationToken::new();
        client.connect(&cancel).await.unwrap();

        let tools = client.list_tools(&cancel).await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "search");

        // Served from cache
        client.list_tools(&cancel).await.unwrap();

        // Invalidation forces a second fetch
        client.invalidate_tools_cache();
        client.list_tools(&cancel).await.unwrap();
    }

    #[tokio::test]
    async fn test_call_tool_joins_text_blocks() {
        let server = MockServer::start().await;
        mount_initialize(&server).await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "tools/call",
                "params": { "name": "echo", "arguments": { "text": "hi" } }
            })))
            .respond_with(rpc_ok(json!({
                "content": [
                    { "type": "text", "text": "line one" },
                    { "type": "text", "text": "line two\n" }
                ],
                "isError": false
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, "");
        let cancel = CancellationToken::new();
        client.connect(&cancel).await.unwrap();

        let text = client.call_tool("echo", json!({ "text": "hi" }), &cancel).await.unwrap();
        assert_eq!(text, "line one\nline two");
    }

    #[tokio::test]
    async fn test_call_tool_error_flag_is_failure() {
        let server = MockServer::start().await;
        mount_initialize(&server).await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "tools/call" })))
            .respond_with(rpc_ok(json!({
                "content": [{ "type": "text", "text": "file missing" }],
                "isError": true
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, "");
        let cancel = CancellationToken::new();
        client.connect(&cancel).await.unwrap();

        let err = client.call_tool("read", json!({}), &cancel).await.unwrap_err();
        assert!(matches!(err, McpError::ToolFailed { ref message, .. } if message == "file missing"));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_call_tool_status_classification() {
        let server = MockServer::start().await;
        mount_initialize(&server).await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "tools/call" })))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;

        let client = client_for(&server, "");
        let cancel = CancellationToken::new();
        client.connect(&cancel).await.unwrap();

        let err = client.call_tool("read", json!({}), &cancel).await.unwrap_err();
        assert!(matches!(err, McpError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_operations_require_connection_and_fail_after_dispose() {
        let server = MockServer::start().await;
        mount_initialize(&server).await;
        let client = client_for(&server, "");
        let cancel = CancellationToken::new();

        assert!(matches!(client.list_tools(&cancel).await, Err(McpError::NotConnected)));

        client.connect(&cancel).await.unwrap();
        client.dispose();
        assert_eq!(client.state(), ConnectionState::Disposed);
        assert!(matches!(client.call_tool("x", json!({}), &cancel).await, Err(McpError::Disposed)));
        assert!(matches!(client.connect(&cancel).await, Err(McpError::Disposed)));
    }

    #[tokio::test]
    async fn test_cancelled_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(rpc_ok(json!({})).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let client = client_for(&server, "");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = client.connect(&cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_timed_out_handshake_can_be_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "initialize" })))
            .respond_with(
                rpc_ok(json!({ "serverInfo": { "name": "fake", "version": "1.2.3" } }))
                    .set_delay(Duration::from_millis(500)),
            )
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        mount_initialize(&server).await;

        let client = client_for(&server, "");
        let cancel = CancellationToken::new();

        let first = tokio::time::timeout(Duration::from_millis(100), client.connect(&cancel)).await;
        assert!(first.is_err());
        assert_eq!(client.state(), ConnectionState::Disconnected);

        assert!(client.connect(&cancel).await.unwrap());
        assert!(client.is_connected());

        let handshakes = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| String::from_utf8_lossy(&r.body).contains("\"initialize\""))
            .count();
        assert_eq!(handshakes, 2);
    }

    #[tokio::test]
    async fn test_list_tools_follows_next_cursor() {
        let server = MockServer::start().await;
        mount_initialize(&server).await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "tools/list", "params": { "cursor": "page-2" } })))
            .respond_with(rpc_ok(json!({
                "tools": [{ "name": "b", "inputSchema": { "type": "object" } }]
            })))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "tools/list" })))
            .respond_with(rpc_ok(json!({
                "tools": [{ "name": "a", "inputSchema": { "type": "object" } }],
                "nextCursor": "page-2"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, "");
        let cancel = CancellationToken::new();
        client.connect(&cancel).await.unwrap();

        let names: Vec<_> = client.list_tools(&cancel).await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_credentials_never_logged() {
        let server = MockServer::start().await;
        mount_initialize(&server).await;
        let logger = Arc::new(RecordingLogger::new());
        let descriptor = ServerDescriptor::new("fake", server.uri()).with_api_key("super-secret");
        let client = McpHttpClient::new(descriptor, logger.clone()).unwrap();

        client.connect(&CancellationToken::new()).await.unwrap();
        assert!(!logger.entries().is_empty());
        assert!(!logger.contains("super-secret"));
    }
}
