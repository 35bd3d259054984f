//! Mock tool client for testing
//!
//! Deterministic, configurable tool servers without network dependencies.
//! Used by the pool, executor and orchestrator tests and available to hosts
//! for their own integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use super::client::{ClientFactory, ConnectionState, ToolClient};
use super::error::{McpError, McpResult};
use crate::types::{CancellationToken, ServerDescriptor, ToolDescriptor};

/// Scripted behaviour of one mock tool
#[derive(Debug, Clone)]
pub enum MockToolResponse {
    /// Return fixed text
    Text(String),
    /// Return the call arguments serialized as JSON
    Echo,
    /// Report `isError: true` with this text
    ToolError(String),
    /// Fail with a retryable server error
    ServerError(String),
}

/// Mock implementation of [`ToolClient`]
pub struct MockToolClient {
    server: ServerDescriptor,
    tools: RwLock<Vec<(ToolDescriptor, MockToolResponse)>>,
    state: RwLock<ConnectionState>,
    failing_connects: AtomicU32,
    connect_delay: Duration,
    call_delay: Duration,
    connects: AtomicU32,
    list_calls: AtomicU32,
    calls: Mutex<Vec<(String, Value)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockToolClient {
    pub fn new(server: ServerDescriptor) -> Self {
        Self {
            server,
            tools: RwLock::new(Vec::new()),
            state: RwLock::new(ConnectionState::Disconnected),
            failing_connects: AtomicU32::new(0),
            connect_delay: Duration::ZERO,
            call_delay: Duration::ZERO,
            connects: AtomicU32::new(0),
            list_calls: AtomicU32::new(0),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Advertise a tool with scripted behaviour
    pub fn with_tool(self, name: &str, response: MockToolResponse) -> Self {
        self.tools
            .write()
            .push((ToolDescriptor::new(name, format!("Mock tool {}", name)), response));
        self
    }

    /// Advertise a tool with a full descriptor
    pub fn with_descriptor(self, descriptor: ToolDescriptor, response: MockToolResponse) -> Self {
        self.tools.write().push((descriptor, response));
        self
    }

    /// Make the first `count` handshakes fail
    pub fn with_failing_connects(self, count: u32) -> Self {
        self.failing_connects.store(count, Ordering::SeqCst);
        self
    }

    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = delay;
        self
    }

    /// Simulate the server dropping the connection
    pub fn disconnect(&self) {
        let mut state = self.state.write();
        if *state == ConnectionState::Connected {
            *state = ConnectionState::Disconnected;
        }
    }

    /// Number of handshakes attempted
    pub fn connect_count(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    /// Number of tool list fetches that reached the "server"
    pub fn list_count(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Tool invocations received, in arrival order
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    /// Highest number of tool calls observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn is_disposed(&self) -> bool {
        *self.state.read() == ConnectionState::Disposed
    }

    fn ensure_connected(&self) -> McpResult<()> {
        match *self.state.read() {
            ConnectionState::Connected => Ok(()),
            ConnectionState::Disposed => Err(McpError::Disposed),
            _ => Err(McpError::NotConnected),
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for MockToolClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockToolClient")
            .field("server", &self.server.name)
            .field("state", &*self.state.read())
            .field("connects", &self.connects.load(Ordering::SeqCst))
            .finish()
    }
}

#[async_trait]
impl ToolClient for MockToolClient {
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
                _ => *state = ConnectionState::Connecting,
            }
        }
        self.connects.fetch_add(1, Ordering::SeqCst);

        if !self.connect_delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => {
                    *self.state.write() = ConnectionState::Disconnected;
                    return Err(McpError::cancelled("mock connect"));
                }
                _ = tokio::time::sleep(self.connect_delay) => {}
            }
        }

        let fail = self
            .failing_connects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        let mut state = self.state.write();
        if *state == ConnectionState::Disposed {
            return Err(McpError::Disposed);
        }
        *state = if fail {
            ConnectionState::Disconnected
        } else {
            ConnectionState::Connected
        };
        Ok(!fail)
    }

    async fn list_tools(&self, _cancel: &CancellationToken) -> McpResult<Vec<ToolDescriptor>> {
        self.ensure_connected()?;
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.tools.read().iter().map(|(d, _)| d.clone()).collect())
    }

    async fn refresh_tools(&self, cancel: &CancellationToken) -> McpResult<Vec<ToolDescriptor>> {
        self.list_tools(cancel).await
    }

    fn invalidate_tools_cache(&self) {}

    async fn call_tool(&self, name: &str, arguments: Value, cancel: &CancellationToken) -> McpResult<String> {
        self.ensure_connected()?;
        self.calls.lock().push((name.to_string(), arguments.clone()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.call_delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(McpError::cancelled(format!("mock call {}", name))),
                _ = tokio::time::sleep(self.call_delay) => {}
            }
        }

        let response = self
            .tools
            .read()
            .iter()
            .find(|(d, _)| d.name == name)
            .map(|(_, r)| r.clone());

        match response {
            Some(MockToolResponse::Text(text)) => Ok(text),
            Some(MockToolResponse::Echo) => Ok(arguments.to_string()),
            Some(MockToolResponse::ToolError(message)) => Err(McpError::ToolFailed {
                tool: name.to_string(),
                message,
            }),
            Some(MockToolResponse::ServerError(message)) => Err(McpError::Server(message)),
            None => Err(McpError::ToolNotFound(name.to_string())),
        }
    }

    fn dispose(&self) {
        *self.state.write() = ConnectionState::Disposed;
    }
}

type MockBuilder = dyn Fn(&ServerDescriptor) -> MockToolClient + Send + Sync;

/// Factory creating [`MockToolClient`]s and remembering every instance
pub struct MockClientFactory {
    build: Box<MockBuilder>,
    created: Mutex<Vec<Arc<MockToolClient>>>,
    by_server: Mutex<HashMap<String, u32>>,
}

impl MockClientFactory {
    pub fn new(build: impl Fn(&ServerDescriptor) -> MockToolClient + Send + Sync + 'static) -> Self {
        Self {
            build: Box::new(build),
            created: Mutex::new(Vec::new()),
            by_server: Mutex::new(HashMap::new()),
        }
    }

    /// Every client created so far, in creation order
    pub fn created(&self) -> Vec<Arc<MockToolClient>> {
        self.created.lock().clone()
    }

    /// Number of clients created for the named server
    pub fn created_for(&self, server_name: &str) -> u32 {
        self.by_server.lock().get(server_name).copied().unwrap_or(0)
    }
}

impl ClientFactory for MockClientFactory {
    fn create(&self, server: &ServerDescriptor) -> McpResult<Arc<dyn ToolClient>> {
        let client = Arc::new((self.build)(server));
        self.created.lock().push(client.clone());
        *self.by_server.lock().entry(server.name.clone()).or_insert(0) += 1;
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_client_scripted_tools() {
        let client = MockToolClient::new(ServerDescriptor::new("m", "mock://m"))
            .with_tool("echo", MockToolResponse::Echo)
            .with_tool("broken", MockToolResponse::ToolError("nope".to_string()))
            .with_failing_connects(1);
        let cancel = CancellationToken::new();

        assert!(!client.connect(&cancel).await.unwrap());
        assert!(client.connect(&cancel).await.unwrap());
        assert_eq!(client.connect_count(), 2);

        assert_eq!(client.list_tools(&cancel).await.unwrap().len(), 2);
        assert_eq!(client.call_tool("echo", json!({"a": 1}), &cancel).await.unwrap(), r#"{"a":1}"#);
        assert!(matches!(
            client.call_tool("broken", json!({}), &cancel).await,
            Err(McpError::ToolFailed { .. })
        ));
        assert!(matches!(
            client.call_tool("missing", json!({}), &cancel).await,
            Err(McpError::ToolNotFound(_))
        ));
        assert_eq!(client.calls().len(), 3);
    }
}
