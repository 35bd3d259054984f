//! Scripted transport for testing
//!
//! Each request consumes the next scripted round and replays its lines.
//! Every request is recorded so tests can inspect the bodies that were sent.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::error::{CompletionError, CompletionResult};
use super::traits::StreamTransport;
use crate::types::CancellationToken;

/// One scripted response
#[derive(Debug, Clone)]
pub enum MockRound {
    /// Raw lines to replay
    Lines(Vec<String>),
    /// Fail with an API error
    Error { status: u16, message: String },
}

impl MockRound {
    /// Plain answer split into a few content chunks, finished with `stop`
    pub fn text(answer: &str) -> Self {
        let mut lines: Vec<String> = split_chunks(answer, 16).iter().map(|c| content_line(c)).collect();
        lines.push(finish_line("stop"));
        lines.push(done_line());
        MockRound::Lines(lines)
    }

    /// Reasoning followed by an answer
    pub fn reasoning_then_text(reasoning: &str, answer: &str) -> Self {
        let mut lines = vec![reasoning_line(reasoning)];
        if let MockRound::Lines(rest) = Self::text(answer) {
            lines.extend(rest);
        }
        MockRound::Lines(lines)
    }

    /// Tool calls as `(id, name, arguments)`, arguments streamed in two halves
    pub fn tool_calls(calls: &[(&str, &str, &str)]) -> Self {
        Self::content_and_tool_calls("", calls)
    }

    /// Some content, then tool calls
    pub fn content_and_tool_calls(content: &str, calls: &[(&str, &str, &str)]) -> Self {
        let mut lines = Vec::new();
        if !content.is_empty() {
            lines.push(content_line(content));
        }
        for (index, (id, name, arguments)) in calls.iter().enumerate() {
            let split = arguments.char_indices().nth(arguments.chars().count() / 2).map_or(0, |(i, _)| i);
            let (head, tail) = arguments.split_at(split);
            lines.push(tool_call_line(index as u32, Some(*id), Some(*name), head));
            lines.push(tool_call_line(index as u32, None, None, tail));
        }
        lines.push(finish_line("tool_calls"));
        lines.push(done_line());
        MockRound::Lines(lines)
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        MockRound::Error {
            status,
            message: message.into(),
        }
    }
}

fn split_chunks(text: &str, size: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.chars()
        .collect::<Vec<_>>()
        .chunks(size)
        .map(|c| c.iter().collect())
        .collect()
}

pub fn content_line(text: &str) -> String {
    format!("data: {}", json!({ "choices": [{ "index": 0, "delta": { "content": text } }] }))
}

pub fn reasoning_line(text: &str) -> String {
    format!(
        "data: {}",
        json!({ "choices": [{ "index": 0, "delta": { "reasoning_content": text } }] })
    )
}

pub fn tool_call_line(index: u32, id: Option<&str>, name: Option<&str>, arguments: &str) -> String {
    let mut call = json!({ "index": index, "function": { "arguments": arguments } });
    if let Some(id) = id {
        call["id"] = json!(id);
        call["type"] = json!("function");
    }
    if let Some(name) = name {
        call["function"]["name"] = json!(name);
    }
    format!("data: {}", json!({ "choices": [{ "index": 0, "delta": { "tool_calls": [call] } }] }))
}

pub fn finish_line(reason: &str) -> String {
    format!(
        "data: {}",
        json!({ "choices": [{ "index": 0, "delta": {}, "finish_reason": reason }] })
    )
}

pub fn done_line() -> String {
    "data: [DONE]".to_string()
}

/// A request the mock received
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub body: Value,
    pub headers: Vec<(String, String)>,
}

/// Transport replaying [`MockRound`]s in order
#[derive(Debug, Default)]
pub struct MockTransport {
    rounds: Mutex<VecDeque<MockRound>>,
    requests: Mutex<Vec<RecordedRequest>>,
    line_delay: Duration,
}

impl MockTransport {
    pub fn new(rounds: impl IntoIterator<Item = MockRound>) -> Self {
        Self {
            rounds: Mutex::new(rounds.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            line_delay: Duration::ZERO,
        }
    }

    /// Pause between replayed lines
    pub fn with_line_delay(mut self, delay: Duration) -> Self {
        self.line_delay = delay;
        self
    }

    pub fn push_round(&self, round: MockRound) {
        self.rounds.lock().push_back(round);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn remaining(&self) -> usize {
        self.rounds.lock().len()
    }
}

#[async_trait]
impl StreamTransport for MockTransport {
    async fn stream_post(
        &self,
        url: &str,
        body: &Value,
        headers: &[(String, String)],
        on_line: &mut (dyn for<'a> FnMut(&'a str) + Send),
        cancel: &CancellationToken,
    ) -> CompletionResult<()> {
        if cancel.is_cancelled() {
            return Err(CompletionError::Cancelled);
        }
        let number = {
            let mut requests = self.requests.lock();
            requests.push(RecordedRequest {
                url: url.to_string(),
                body: body.clone(),
                headers: headers.to_vec(),
            });
            requests.len()
        };

        let round = self
            .rounds
            .lock()
            .pop_front()
            .ok_or_else(|| CompletionError::Script(format!("no scripted response for request #{}", number)))?;

        match round {
            MockRound::Error { status, message } => Err(CompletionError::api(status, message)),
            MockRound::Lines(lines) => {
                for line in lines {
                    if !self.line_delay.is_zero() {
                        tokio::select! {
                            _ = cancel.cancelled() => return Err(CompletionError::Cancelled),
                            _ = tokio::time::sleep(self.line_delay) => {}
                        }
                    } else if cancel.is_cancelled() {
                        return Err(CompletionError::Cancelled);
                    }
                    on_line(&line);
                }
                Ok(())
            }
        }
    }
}
