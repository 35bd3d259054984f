//! Tool catalog for one orchestration run
//!
//! The ToolCatalog is the run's view of the tool world:
//! - Which tools each connected server advertises
//! - Which of them the user disabled
//! - Which client backs a tool name
//! - The function definitions offered to the model

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::logging::SharedLogger;
use crate::mcp::ToolClient;
use crate::pool::PoolKey;
use crate::types::{ServerDescriptor, ToolDescriptor};

/// A tool together with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub descriptor: ToolDescriptor,
    /// Name of the server advertising the tool
    pub server: String,
    /// Endpoint and credential of that server; names need not be unique
    pub key: PoolKey,
    /// Whether the tool may be offered to the model
    pub enabled: bool,
}

/// Enabled tools and their backing clients, built once per run
pub struct ToolCatalog {
    entries: Vec<CatalogEntry>,
    clients: HashMap<PoolKey, Arc<dyn ToolClient>>,
    logger: SharedLogger,
}

impl ToolCatalog {
    pub fn new(logger: SharedLogger) -> Self {
        Self {
            entries: Vec::new(),
            clients: HashMap::new(),
            logger,
        }
    }

    /// Register a server's tools, applying its per-tool toggles
    ///
    /// A tool name already provided by an earlier server keeps its first
    /// provider.
    pub fn add_server(&mut self, client: Arc<dyn ToolClient>, tools: Vec<ToolDescriptor>) {
        let server = client.server().clone();
        self.add_server_as(&server, client, tools);
    }

    /// Register tools under `server`, whose toggles may be newer than the
    /// descriptor a pooled client was created with
    pub fn add_server_as(&mut self, server: &ServerDescriptor, client: Arc<dyn ToolClient>, tools: Vec<ToolDescriptor>) {
        let key = PoolKey::for_server(server);
        let mut added = 0;

        for descriptor in tools {
            if let Some(existing) = self.entries.iter().find(|e| e.descriptor.name == descriptor.name) {
                self.logger.warn(&format!(
                    "[ToolCatalog] Tool '{}' from '{}' shadowed by '{}'",
                    descriptor.name, server.name, existing.server
                ));
                continue;
            }

            let enabled = server.is_tool_enabled(&descriptor.name);
            self.entries.push(CatalogEntry {
                descriptor,
                server: server.name.clone(),
                key,
                enabled,
            });
            added += 1;
        }

        self.logger.info(&format!(
            "[ToolCatalog] Registered {} tools from '{}'",
            added, server.name
        ));
        self.clients.insert(key, client);
    }

    /// Every registered tool, enabled or not
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    fn entry(&self, tool: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.descriptor.name == tool)
    }

    /// Enabled tool descriptors, in registration order
    pub fn enabled_tools(&self) -> Vec<&ToolDescriptor> {
        self.entries
            .iter()
            .filter(|e| e.enabled)
            .map(|e| &e.descriptor)
            .collect()
    }

    /// Enabled tools in the chat-completions `tools` format
    pub fn function_specs(&self) -> Vec<Value> {
        self.enabled_tools()
            .into_iter()
            .map(ToolDescriptor::to_function_spec)
            .collect()
    }

    /// Known to the catalog but switched off by configuration
    pub fn is_disabled(&self, tool: &str) -> bool {
        self.entry(tool).is_some_and(|e| !e.enabled)
    }

    /// Client of the server that advertises `tool`
    pub fn client_for(&self, tool: &str) -> Option<Arc<dyn ToolClient>> {
        self.entry(tool).and_then(|e| self.clients.get(&e.key)).cloned()
    }

    /// Server name advertising `tool`
    pub fn server_for(&self, tool: &str) -> Option<&str> {
        self.entry(tool).map(|e| e.server.as_str())
    }

    pub fn server_count(&self) -> usize {
        self.clients.len()
    }

    pub fn tool_count(&self) -> usize {
        self.entries.len()
    }

    pub fn enabled_count(&self) -> usize {
        self.entries.iter().filter(|e| e.enabled).count()
    }

    /// No tool can be offered
    pub fn is_empty(&self) -> bool {
        self.enabled_count() == 0
    }
}

impl std::fmt::Debug for ToolCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolCatalog")
            .field("entries", &self.entries)
            .field("servers", &self.clients.values().map(|c| c.server().name.as_str()).collect::<Vec<_>>())
            .finish()
    }
}
