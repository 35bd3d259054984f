//! Tool-use strategies and their per-strategy settings

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::types::CallLimit;

/// How strongly the model is steered toward tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolStrategy {
    /// No tools, plain completion
    #[default]
    Disabled,
    /// Tools listed without guidance
    Blank,
    /// The model decides whether tools help
    Hybrid,
    /// Prefer tools, answer directly when none fits
    ToolFirst,
    /// Tools are mandatory
    ToolForced,
}

/// Which tool description goes into the system prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionTier {
    /// Name and parameters (`$description_rough`)
    Rough,
    /// Name, parameters and description (`$description_detailed`)
    Detailed,
}

impl ToolStrategy {
    pub const ALL: [ToolStrategy; 5] = [
        ToolStrategy::Disabled,
        ToolStrategy::Blank,
        ToolStrategy::Hybrid,
        ToolStrategy::ToolFirst,
        ToolStrategy::ToolForced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolStrategy::Disabled => "disabled",
            ToolStrategy::Blank => "blank",
            ToolStrategy::Hybrid => "hybrid",
            ToolStrategy::ToolFirst => "tool_first",
            ToolStrategy::ToolForced => "tool_forced",
        }
    }

    pub fn offers_tools(&self) -> bool {
        *self != ToolStrategy::Disabled
    }

    /// Running without a tool is a failure
    pub fn is_tool_mandatory(&self) -> bool {
        *self == ToolStrategy::ToolForced
    }

    pub fn description_tier(&self) -> DescriptionTier {
        match self {
            ToolStrategy::Blank => DescriptionTier::Rough,
            _ => DescriptionTier::Detailed,
        }
    }

    /// Built-in system prompt template (empty for Disabled)
    pub fn default_prompt(&self) -> &'static str {
        DEFAULT_PROMPTS.get(self).copied().unwrap_or("")
    }
}

impl std::fmt::Display for ToolStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ToolStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        ToolStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == normalized || strategy.as_str().replace('_', "") == normalized)
            .ok_or_else(|| format!("Unknown tool strategy: {}", s))
    }
}

/// Marker the ToolForced prompt asks the model to emit when no tool fits
pub const NO_SUITABLE_TOOL_MARKER: &str = "[NO_SUITABLE_TOOL]";

static DEFAULT_PROMPTS: Lazy<HashMap<ToolStrategy, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(ToolStrategy::Blank, "Available MCP tools:\n$description_rough");
    m.insert(
        ToolStrategy::Hybrid,
        "You are a helpful assistant with access to optional MCP tools.

Available tools:
$description_detailed

Instructions:
- Tools are OPTIONAL - use them only when they can genuinely help answer the question
- For general knowledge, common sense, or simple questions - answer directly WITHOUT tools
- If no tool fits the request, answer directly with your own knowledge
- If a tool returns empty results, errors, or no useful data, answer completely from your own knowledge without mentioning the failed attempt unless asked",
    );
    m.insert(
        ToolStrategy::ToolFirst,
        "You are a helpful assistant with access to MCP tools.

Available tools:
$description_detailed

Instructions:
- PRIORITIZE tools whenever they can provide better or more accurate information
- If no suitable tool is available, answer directly using your own knowledge
- If a tool returns empty results, errors, or no useful data, answer from your own knowledge and say explicitly that the tool did not help",
    );
    m.insert(
        ToolStrategy::ToolForced,
        "You are a helpful assistant that MUST use the available MCP tools.

Available tools:
$description_detailed

CRITICAL INSTRUCTIONS:
- You MUST use tools to answer the question
- If no suitable tool exists, reply exactly: [NO_SUITABLE_TOOL] No suitable tool available to answer this question.
- Do not answer from your own knowledge unless explicitly instructed",
    );
    m
});

/// How tool activity is rendered next to the answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResultDisplayMode {
    /// Nothing but the answer
    #[default]
    Disabled,
    /// Inline tool markers only
    Minimal,
    /// Inline markers plus a results block truncated per tool
    Mixed,
    /// Inline markers plus full multi-line results
    Detailed,
}

impl std::str::FromStr for ResultDisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "disabled" => Ok(ResultDisplayMode::Disabled),
            "minimal" => Ok(ResultDisplayMode::Minimal),
            "mixed" => Ok(ResultDisplayMode::Mixed),
            "detailed" => Ok(ResultDisplayMode::Detailed),
            other => Err(format!("Unknown display mode: {}", other)),
        }
    }
}

pub const DEFAULT_CONSECUTIVE_LIMIT: CallLimit = CallLimit::Limited(5);
pub const DEFAULT_TOTAL_LIMIT: CallLimit = CallLimit::Limited(15);

fn default_consecutive_limit() -> CallLimit {
    DEFAULT_CONSECUTIVE_LIMIT
}

fn default_total_limit() -> CallLimit {
    DEFAULT_TOTAL_LIMIT
}

/// Settings attached to one strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Replaces the built-in system prompt when not blank
    #[serde(default)]
    pub custom_prompt: String,
    /// Calls of the same tool allowed before it is gated
    #[serde(default = "default_consecutive_limit")]
    pub consecutive_limit: CallLimit,
    /// Tool rounds allowed per run
    #[serde(default = "default_total_limit")]
    pub total_limit: CallLimit,
    #[serde(default)]
    pub display_mode: ResultDisplayMode,
    #[serde(default)]
    pub show_tool_chain: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            custom_prompt: String::new(),
            consecutive_limit: DEFAULT_CONSECUTIVE_LIMIT,
            total_limit: DEFAULT_TOTAL_LIMIT,
            display_mode: ResultDisplayMode::Disabled,
            show_tool_chain: false,
        }
    }
}

impl StrategyConfig {
    pub fn with_limits(mut self, consecutive: CallLimit, total: CallLimit) -> Self {
        self.consecutive_limit = consecutive;
        self.total_limit = total;
        self
    }

    pub fn with_display(mut self, mode: ResultDisplayMode, show_tool_chain: bool) -> Self {
        self.display_mode = mode;
        self.show_tool_chain = show_tool_chain;
        self
    }

    pub fn with_custom_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.custom_prompt = prompt.into();
        self
    }

    /// System prompt template for `strategy`, before placeholder substitution
    pub fn prompt_template(&self, strategy: ToolStrategy) -> &str {
        if strategy == ToolStrategy::Disabled {
            return "";
        }
        if self.custom_prompt.trim().is_empty() {
            strategy.default_prompt()
        } else {
            &self.custom_prompt
        }
    }
}
