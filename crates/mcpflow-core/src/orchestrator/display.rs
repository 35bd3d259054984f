//! Tool trace rendering for chat output
//!
//! `ToolTraceDisplay` listens to a run and renders the streamed answer with
//! inline tool markers and, depending on [`ResultDisplayMode`], a block of
//! tool results:
//!
//! ```text
//! [Warning] Reached the maximum tool call limit (15)
//!
//! Let me look that up. [tool:search ✓]
//! The answer is 42.
//!
//! ---
//! Tool chain: search -> fetch
//! > Tool results:
//! >   [✓] search: 3 matches
//! ---
//! ```

use super::observer::RunObserver;
use super::strategy::{ResultDisplayMode, StrategyConfig};
use crate::types::{CallLimit, ToolCallRequest, ToolCallResult};

const MIXED_RESULT_CHARS: usize = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallStatus {
    Pending,
    Succeeded,
    Failed,
}

impl CallStatus {
    fn symbol(&self) -> &'static str {
        match self {
            CallStatus::Pending => "…",
            CallStatus::Succeeded => "✓",
            CallStatus::Failed => "✗",
        }
    }
}

#[derive(Debug, Clone)]
struct TracedCall {
    call_id: String,
    tool: String,
    status: CallStatus,
    output: String,
}

#[derive(Debug, Clone)]
enum Segment {
    Text(String),
    Marker(usize),
}

/// Observer that renders answer text plus tool activity
#[derive(Debug, Clone)]
pub struct ToolTraceDisplay {
    mode: ResultDisplayMode,
    show_chain: bool,
    segments: Vec<Segment>,
    /// Markers waiting for the next content delta
    planned: Vec<usize>,
    calls: Vec<TracedCall>,
    warning: Option<CallLimit>,
}

impl ToolTraceDisplay {
    pub fn new(mode: ResultDisplayMode, show_chain: bool) -> Self {
        Self {
            mode,
            show_chain,
            segments: Vec::new(),
            planned: Vec::new(),
            calls: Vec::new(),
            warning: None,
        }
    }

    pub fn for_config(config: &StrategyConfig) -> Self {
        Self::new(config.display_mode, config.show_tool_chain)
    }

    pub fn mode(&self) -> ResultDisplayMode {
        self.mode
    }

    /// The text a chat view would show at this point of the run
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(limit) = self.warning {
            out.push_str(&format!("[Warning] Reached the maximum tool call limit ({})\n\n", limit));
        }

        let markers = self.mode != ResultDisplayMode::Disabled;
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Marker(index) if markers => out.push_str(&self.marker(*index)),
                Segment::Marker(_) => {}
            }
        }
        if markers {
            for index in &self.planned {
                out.push_str(&self.marker(*index));
            }
        }

        if let Some(block) = self.results_block() {
            if !out.is_empty() {
                out.push_str("\n\n");
            }
            out.push_str(&block);
        }
        out
    }

    fn marker(&self, index: usize) -> String {
        let call = &self.calls[index];
        format!(" [tool:{} {}] ", call.tool, call.status.symbol())
    }

    fn results_block(&self) -> Option<String> {
        if self.mode == ResultDisplayMode::Disabled {
            return None;
        }
        let finished: Vec<&TracedCall> = self.calls.iter().filter(|c| c.status != CallStatus::Pending).collect();
        if finished.is_empty() {
            return None;
        }

        let mut lines = vec!["---".to_string()];
        if self.show_chain {
            let chain: Vec<&str> = self.calls.iter().map(|c| c.tool.as_str()).collect();
            lines.push(format!("Tool chain: {}", chain.join(" -> ")));
        }

        match self.mode {
            ResultDisplayMode::Disabled => return None,
            ResultDisplayMode::Minimal => {
                if lines.len() == 1 {
                    return None;
                }
            }
            ResultDisplayMode::Mixed => {
                lines.push("> Tool results:".to_string());
                for call in &finished {
                    lines.push(format!(
                        ">   [{}] {}: {}",
                        call.status.symbol(),
                        call.tool,
                        truncate(&call.output.replace('\n', " "), MIXED_RESULT_CHARS)
                    ));
                }
            }
            ResultDisplayMode::Detailed => {
                lines.push("> Tool results:".to_string());
                for call in &finished {
                    lines.push(format!(">   [{}] {}:", call.status.symbol(), call.tool));
                    for line in call.output.lines() {
                        lines.push(format!(">     {}", line));
                    }
                }
            }
        }
        lines.push("---".to_string());
        Some(lines.join("\n"))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

impl RunObserver for ToolTraceDisplay {
    fn content_appended(&mut self, text: &str) {
        for index in self.planned.drain(..) {
            self.segments.push(Segment::Marker(index));
        }
        match self.segments.last_mut() {
            Some(Segment::Text(existing)) => existing.push_str(text),
            _ => self.segments.push(Segment::Text(text.to_string())),
        }
    }

    fn tool_started(&mut self, request: &ToolCallRequest) {
        self.calls.push(TracedCall {
            call_id: request.call_id.clone(),
            tool: request.tool_name.clone(),
            status: CallStatus::Pending,
            output: String::new(),
        });
        self.planned.push(self.calls.len() - 1);
    }

    fn tool_finished(&mut self, result: &ToolCallResult) {
        let traced = self
            .calls
            .iter_mut()
            .rev()
            .find(|c| c.call_id == result.call_id && c.status == CallStatus::Pending);
        if let Some(call) = traced {
            call.status = if result.success {
                CallStatus::Succeeded
            } else {
                CallStatus::Failed
            };
            call.output = result.output.clone();
        }
    }

    fn budget_exhausted(&mut self, limit: CallLimit) {
        self.warning = Some(limit);
    }
}
