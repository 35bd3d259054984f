//! Settings document
//!
//! Every field has a default so partial YAML files load cleanly.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logging::LogVerbosity;
use crate::orchestrator::{StrategyConfig, ToolStrategy};
use crate::types::ServerDescriptor;

pub const DEFAULT_COMPLETION_URL: &str = "https://api.deepseek.com/";
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// OpenAI-compatible completion endpoint settings
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    pub url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub n: u32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_COMPLETION_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 2048,
            temperature: 0.7,
            top_p: 1.0,
            n: 1,
        }
    }
}

impl CompletionSettings {
    /// Model name to send, falling back to the default when blank
    pub fn effective_model(&self) -> &str {
        match self.model.trim() {
            "" => DEFAULT_MODEL,
            model => model,
        }
    }
}

impl std::fmt::Debug for CompletionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionSettings")
            .field("url", &self.url)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("n", &self.n)
            .finish()
    }
}

/// Tool-server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McpSettings {
    /// Global switch; when off every prompt runs without tools
    pub enabled: bool,
    pub log_level: LogVerbosity,
    pub tool_cache_minutes: u64,
    pub max_concurrent_tools: usize,
    pub max_concurrent_runs: usize,
    pub idle_timeout_secs: u64,
    pub servers: Vec<ServerDescriptor>,
}

impl Default for McpSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            log_level: LogVerbosity::Coarse,
            tool_cache_minutes: 5,
            max_concurrent_tools: 5,
            max_concurrent_runs: 5,
            idle_timeout_secs: 300,
            servers: Vec::new(),
        }
    }
}

impl McpSettings {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Enabled servers with a non-blank URL
    pub fn usable_servers(&self) -> Vec<ServerDescriptor> {
        self.servers.iter().filter(|s| s.is_usable()).cloned().collect()
    }

    pub fn find_server(&self, name: &str) -> Option<&ServerDescriptor> {
        self.servers.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }
}

/// The whole settings document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub completion: CompletionSettings,
    pub mcp: McpSettings,
    /// Prompt name → strategy; unlisted prompts run Disabled
    pub prompt_strategies: BTreeMap<String, ToolStrategy>,
    /// Per-strategy settings; missing entries use defaults
    pub strategies: BTreeMap<ToolStrategy, StrategyConfig>,
}

impl Settings {
    pub fn strategy_config(&self, strategy: ToolStrategy) -> StrategyConfig {
        self.strategies.get(&strategy).cloned().unwrap_or_default()
    }

    pub fn strategy_for_prompt(&self, prompt: &str) -> Option<ToolStrategy> {
        self.prompt_strategies.get(prompt).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::ResultDisplayMode;
    use crate::types::CallLimit;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.completion.url, "https://api.deepseek.com/");
        assert_eq!(settings.completion.max_tokens, 2048);
        assert!(!settings.mcp.enabled);
        assert_eq!(settings.mcp.tool_cache_minutes, 5);
        assert_eq!(settings.mcp.max_concurrent_tools, 5);
        assert_eq!(settings.mcp.idle_timeout(), Duration::from_secs(300));

        let config = settings.strategy_config(ToolStrategy::Hybrid);
        assert_eq!(config.consecutive_limit, CallLimit::Limited(5));
        assert_eq!(config.total_limit, CallLimit::Limited(15));
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
completion:
  api_key: sk-test
  model: "  "
mcp:
  enabled: true
  log_level: 2
  servers:
    - name: docs
      url: http://localhost:9000/mcp
      tools:
        - name: delete_page
          enabled: false
    - name: legacy
      url: http://localhost:9001/mcp
      enabled: false
prompt_strategies:
  translate: tool_first
strategies:
  tool_first:
    total_limit: -1
    display_mode: mixed
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.completion.effective_model(), "deepseek-chat");
        assert_eq!(settings.completion.temperature, 0.7);
        assert_eq!(settings.mcp.log_level, LogVerbosity::Verbose);
        assert_eq!(settings.mcp.usable_servers().len(), 1);
        assert!(!settings.mcp.find_server("DOCS").unwrap().is_tool_enabled("delete_page"));
        assert_eq!(settings.strategy_for_prompt("translate"), Some(ToolStrategy::ToolFirst));

        let config = settings.strategy_config(ToolStrategy::ToolFirst);
        assert_eq!(config.total_limit, CallLimit::Unlimited);
        assert_eq!(config.consecutive_limit, CallLimit::Limited(5));
        assert_eq!(config.display_mode, ResultDisplayMode::Mixed);
    }

    #[test]
    fn test_debug_masks_api_key() {
        let settings = CompletionSettings {
            api_key: "sk-secret".to_string(),
            ..Default::default()
        };
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("***"));
    }
}
