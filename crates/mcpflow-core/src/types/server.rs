//! Tool server descriptors

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_max_tool_calls() -> u32 {
    10
}

/// Per-tool enable toggle stored with a server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolToggle {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// A configured tool server
///
/// Owned by configuration and treated as immutable while a round runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDescriptor {
    /// Display name, unique per configuration (case-insensitive)
    pub name: String,
    /// Endpoint URL of the tool server
    pub url: String,
    /// Credential in any of the accepted forms (see [`crate::mcp::derive_auth_header`])
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Advisory per-server call cap, informational only
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: u32,
    /// Per-tool toggles; tools without a toggle are enabled
    #[serde(default)]
    pub tools: Vec<ToolToggle>,
}

impl ServerDescriptor {
    /// Create an enabled server descriptor
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            api_key: String::new(),
            enabled: true,
            max_tool_calls: default_max_tool_calls(),
            tools: Vec::new(),
        }
    }

    /// Set the credential
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Set a per-tool toggle
    pub fn with_tool_toggle(mut self, name: impl Into<String>, enabled: bool) -> Self {
        let name = name.into();
        match self.tools.iter_mut().find(|t| t.name == name) {
            Some(toggle) => toggle.enabled = enabled,
            None => self.tools.push(ToolToggle {
                name,
                description: String::new(),
                enabled,
            }),
        }
        self
    }

    /// Enabled and pointing somewhere
    pub fn is_usable(&self) -> bool {
        self.enabled && !self.url.trim().is_empty()
    }

    /// Whether the named tool may be offered to the model
    pub fn is_tool_enabled(&self, tool_name: &str) -> bool {
        self.tools
            .iter()
            .find(|t| t.name == tool_name)
            .map_or(true, |t| t.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usable() {
        assert!(ServerDescriptor::new("a", "http://localhost:1/mcp").is_usable());
        assert!(!ServerDescriptor::new("a", "   ").is_usable());

        let mut disabled = ServerDescriptor::new("a", "http://localhost:1/mcp");
        disabled.enabled = false;
        assert!(!disabled.is_usable());
    }

    #[test]
    fn test_tool_toggles_default_to_enabled() {
        let server = ServerDescriptor::new("a", "http://x")
            .with_tool_toggle("search", false)
            .with_tool_toggle("fetch", true);

        assert!(!server.is_tool_enabled("search"));
        assert!(server.is_tool_enabled("fetch"));
        assert!(server.is_tool_enabled("unlisted"));
    }

    #[test]
    fn test_yaml_defaults() {
        let server: ServerDescriptor = serde_yaml::from_str("name: docs\nurl: http://x/mcp\n").unwrap();
        assert!(server.enabled);
        assert_eq!(server.max_tool_calls, 10);
        assert!(server.api_key.is_empty());
    }
}
