//! Accumulates one streamed completion round
//!
//! Reasoning and content are concatenated in arrival order. Tool-call
//! fragments are merged by their `index`: the first `id` and `type` seen for
//! an index stick, `name` and `arguments` fragments are appended.

use std::collections::BTreeMap;

use crate::mcp::strip_data_prefix;
use crate::types::{CompletionChunk, FunctionCall, PendingToolCall, ToolCallDelta};

/// How the round ended, as far as the stream has told us
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Finish {
    /// No finish reason seen yet
    #[default]
    Streaming,
    /// The model stopped to call tools
    ToolCalls,
    /// Any other finish reason (`stop`, `length`, ...)
    Stop(String),
}

/// Text fragment surfaced to observers while streaming
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextDelta {
    Reasoning(String),
    Content(String),
}

#[derive(Debug, Default)]
struct PartialCall {
    id: Option<String>,
    kind: Option<String>,
    name: String,
    arguments: String,
}

/// Collector for a single round, discarded once the round is processed
#[derive(Debug, Default)]
pub struct StreamCollector {
    reasoning: String,
    content: String,
    calls: BTreeMap<u32, PartialCall>,
    finish: Finish,
}

impl StreamCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_reasoning(&mut self, text: &str) {
        self.reasoning.push_str(text);
    }

    pub fn append_content(&mut self, text: &str) {
        self.content.push_str(text);
    }

    pub fn accumulate_tool_call_delta(&mut self, delta: ToolCallDelta) {
        let call = self.calls.entry(delta.index).or_default();
        if call.id.is_none() {
            call.id = delta.id.filter(|id| !id.is_empty());
        }
        if call.kind.is_none() {
            call.kind = delta.kind.filter(|k| !k.is_empty());
        }
        if let Some(function) = delta.function {
            if let Some(name) = function.name {
                call.name.push_str(&name);
            }
            if let Some(arguments) = function.arguments {
                call.arguments.push_str(&arguments);
            }
        }
    }

    /// Record a finish reason; empty and `"null"` reasons are ignored
    pub fn set_finish_reason(&mut self, reason: &str) {
        match reason {
            "tool_calls" => self.finish = Finish::ToolCalls,
            "" | "null" => {}
            other => self.finish = Finish::Stop(other.to_string()),
        }
    }

    /// Apply one raw streamed line, returning the text it contributed
    ///
    /// Blank lines, `[DONE]` and unparseable payloads contribute nothing.
    pub fn ingest_line(&mut self, raw: &str) -> Vec<TextDelta> {
        let payload = strip_data_prefix(raw).unwrap_or(raw).trim();
        if payload.is_empty() || payload == "[DONE]" {
            return Vec::new();
        }
        let Ok(chunk) = serde_json::from_str::<CompletionChunk>(payload) else {
            return Vec::new();
        };
        self.apply(chunk)
    }

    fn apply(&mut self, mut chunk: CompletionChunk) -> Vec<TextDelta> {
        let mut deltas = Vec::new();
        if chunk.choices.is_empty() {
            return deltas;
        }
        let choice = chunk.choices.swap_remove(0);

        if let Some(reasoning) = choice.delta.reasoning_content.filter(|r| !r.is_empty()) {
            self.append_reasoning(&reasoning);
            deltas.push(TextDelta::Reasoning(reasoning));
        }
        if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
            self.append_content(&content);
            deltas.push(TextDelta::Content(content));
        }
        for delta in choice.delta.tool_calls.unwrap_or_default() {
            self.accumulate_tool_call_delta(delta);
        }
        if let Some(reason) = choice.finish_reason {
            self.set_finish_reason(&reason);
        }
        deltas
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn finish(&self) -> &Finish {
        &self.finish
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.calls.is_empty()
    }

    /// The round asked for tools: finished with `tool_calls` and carried some
    pub fn requests_tools(&self) -> bool {
        self.finish == Finish::ToolCalls && self.has_tool_calls()
    }

    /// Merged tool calls ordered by index
    pub fn tool_calls(&self) -> Vec<PendingToolCall> {
        self.calls
            .values()
            .map(|call| PendingToolCall {
                id: call.id.clone().unwrap_or_default(),
                kind: call.kind.clone().unwrap_or_else(|| "function".to_string()),
                function: FunctionCall {
                    name: call.name.clone(),
                    arguments: if call.arguments.is_empty() {
                        "{}".to_string()
                    } else {
                        call.arguments.clone()
                    },
                },
            })
            .collect()
    }
}
