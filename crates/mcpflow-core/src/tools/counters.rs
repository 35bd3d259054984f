//! Per-run call counters

use std::collections::HashMap;

use crate::types::CallLimit;

/// Counters scoped to one orchestration run, never shared between runs
#[derive(Debug, Clone, Default)]
pub struct RunCounters {
    consecutive: HashMap<String, u32>,
    tool_rounds: u32,
}

impl RunCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more call of `tool`, returning the new count
    pub fn record_call(&mut self, tool: &str) -> u32 {
        let count = self.consecutive.entry(tool.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn consecutive(&self, tool: &str) -> u32 {
        self.consecutive.get(tool).copied().unwrap_or(0)
    }

    /// Whether every named tool has already reached `limit`
    pub fn all_reached<'a>(&self, tools: impl IntoIterator<Item = &'a str>, limit: CallLimit) -> bool {
        let mut any = false;
        for tool in tools {
            any = true;
            if !limit.is_reached(self.consecutive(tool)) {
                return false;
            }
        }
        any
    }

    pub fn reset<'a>(&mut self, tools: impl IntoIterator<Item = &'a str>) {
        for tool in tools {
            self.consecutive.remove(tool);
        }
    }

    /// Count a round in which the model requested tools
    pub fn record_tool_round(&mut self) -> u32 {
        self.tool_rounds += 1;
        self.tool_rounds
    }

    pub fn tool_rounds(&self) -> u32 {
        self.tool_rounds
    }
}
