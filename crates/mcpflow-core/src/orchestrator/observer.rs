//! Run progress callbacks

use crate::types::{CallLimit, ToolCallRequest, ToolCallResult};

/// Receives progress of one orchestration run
///
/// All methods default to no-ops. Callbacks arrive on the task driving the
/// run, in order: a round starts, text streams in, tools start and finish.
pub trait RunObserver: Send {
    fn round_started(&mut self, _round: u32) {}

    fn reasoning_appended(&mut self, _text: &str) {}

    fn content_appended(&mut self, _text: &str) {}

    fn tool_started(&mut self, _request: &ToolCallRequest) {}

    fn tool_finished(&mut self, _result: &ToolCallResult) {}

    /// The tool-round budget ran out before the model answered
    fn budget_exhausted(&mut self, _limit: CallLimit) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpObserver;

impl RunObserver for NoOpObserver {}
