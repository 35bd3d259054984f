//! The multi-round tool loop
//!
//! One run alternates completion rounds and tool rounds:
//!
//! ```text
//! conversation ─► [system prompt + tools] ─► stream round ─┬─► answer
//!                         ▲                                │
//!                         └── tool results ◄── executor ◄──┘ tool_calls
//! ```
//!
//! Rounds are strictly sequential. The run ends on an answer, on budget
//! exhaustion (reported, not an error), on a tool-mandatory failure or on
//! cancellation.

use std::collections::HashSet;

use super::error::{OrchestratorError, OrchestratorResult};
use super::observer::RunObserver;
use super::prompt::{build_system_prompt, has_call_markup, signals_no_suitable_tool, strip_think};
use super::strategy::{StrategyConfig, ToolStrategy};
use crate::completion::{CompletionClient, StreamCollector, TextDelta};
use crate::logging::{LogLevel, LoggerExt, SharedLogger};
use crate::tools::{CallGates, ConcurrentExecutor, RunCounters, ToolCatalog};
use crate::types::{CallLimit, CancellationToken, ConversationMessage, PendingToolCall, ToolCallRequest};

/// Result of a completed run
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    /// Final answer text, prefixed with a warning when the budget ran out
    pub answer: String,
    /// Reasoning streamed over all rounds
    pub reasoning: String,
    /// Completion requests issued
    pub rounds: u32,
    /// Rounds in which the model requested tools
    pub tool_rounds: u32,
    pub budget_exhausted: bool,
    /// Messages sent and received, starting with the system prompt when tools were offered
    pub transcript: Vec<ConversationMessage>,
}

pub fn budget_warning(limit: CallLimit) -> String {
    format!("[Warning] Reached the maximum tool call limit ({})", limit)
}

fn truncation_notice(tool: &str, limit: CallLimit) -> String {
    format!(
        "[truncated] tool '{}' reached consecutive call limit ({}), answer directly",
        tool, limit
    )
}

/// Drives completion rounds and tool execution for one conversation
pub struct Orchestrator {
    completion: CompletionClient,
    executor: ConcurrentExecutor,
    logger: SharedLogger,
}

impl Orchestrator {
    pub fn new(completion: CompletionClient, executor: ConcurrentExecutor, logger: SharedLogger) -> Self {
        Self {
            completion,
            executor,
            logger,
        }
    }

    pub fn completion(&self) -> &CompletionClient {
        &self.completion
    }

    pub fn executor(&self) -> &ConcurrentExecutor {
        &self.executor
    }

    /// Run the conversation under `strategy`
    ///
    /// Tools come from `catalog`; per-run counters start fresh on every call.
    pub async fn run(
        &self,
        conversation: &[ConversationMessage],
        catalog: &ToolCatalog,
        strategy: ToolStrategy,
        config: &StrategyConfig,
        observer: &mut dyn RunObserver,
        cancel: &CancellationToken,
    ) -> OrchestratorResult<RunOutcome> {
        if cancel.is_cancelled() {
            return Err(OrchestratorError::Cancelled);
        }
        if !strategy.offers_tools() {
            return self.run_plain(conversation, observer, cancel).await;
        }
        if catalog.is_empty() {
            if strategy.is_tool_mandatory() {
                self.logger
                    .warn("[Orchestrator] Tool-forced run has no enabled tool, giving up");
                return Err(OrchestratorError::NoEnabledTools);
            }
            self.logger
                .info("[Orchestrator] No enabled tool, falling back to a plain completion");
            return self.run_plain(conversation, observer, cancel).await;
        }

        let tools = catalog.function_specs();
        let system_prompt = build_system_prompt(config.prompt_template(strategy), &catalog.enabled_tools());
        let mut transcript = Vec::with_capacity(conversation.len() + 1);
        transcript.push(ConversationMessage::system(system_prompt));
        transcript.extend_from_slice(conversation);

        self.logger.info(&format!(
            "[Orchestrator] Starting {} run with {} tools (consecutive limit {}, total limit {})",
            strategy,
            tools.len(),
            config.consecutive_limit,
            config.total_limit
        ));

        let mut counters = RunCounters::new();
        let mut outcome = RunOutcome::default();
        let mut streamed = String::new();

        loop {
            if config.total_limit.is_reached(counters.tool_rounds()) {
                self.logger.warn(&format!(
                    "[Orchestrator] Tool round budget of {} exhausted",
                    config.total_limit
                ));
                observer.budget_exhausted(config.total_limit);
                outcome.answer = format!("{}\n\n{}", budget_warning(config.total_limit), streamed);
                outcome.budget_exhausted = true;
                outcome.tool_rounds = counters.tool_rounds();
                outcome.transcript = transcript;
                return Ok(outcome);
            }

            outcome.rounds += 1;
            let collector = self
                .stream_round(&transcript, &tools, outcome.rounds, observer, cancel)
                .await?;
            outcome.reasoning.push_str(collector.reasoning());

            if !collector.requests_tools() {
                let content = collector.content().to_string();
                if strategy.is_tool_mandatory() {
                    if signals_no_suitable_tool(&content) {
                        self.logger.info("[Orchestrator] Model reported no suitable tool");
                        return Err(OrchestratorError::NoSuitableTool);
                    }
                    if counters.tool_rounds() == 0 {
                        self.logger.info("[Orchestrator] Model answered without calling a tool");
                        return Err(OrchestratorError::ToolNotUsed);
                    }
                }

                self.logger.info(&format!(
                    "[Orchestrator] Finished after {} rounds ({} with tools)",
                    outcome.rounds,
                    counters.tool_rounds()
                ));
                transcript.push(ConversationMessage::assistant(content.clone()));
                outcome.answer = content;
                outcome.tool_rounds = counters.tool_rounds();
                outcome.transcript = transcript;
                return Ok(outcome);
            }

            let round = counters.record_tool_round();
            let calls: Vec<PendingToolCall> = collector
                .tool_calls()
                .into_iter()
                .filter(|call| {
                    let usable = !call.id.is_empty() && !call.function.name.is_empty();
                    if !usable {
                        self.logger.warn(&format!(
                            "[Orchestrator] Skipping tool call without id or name: {:?}",
                            call
                        ));
                    }
                    usable
                })
                .collect();

            let mut content = collector.content().to_string();
            if has_call_markup(&content) {
                content.clear();
            }
            streamed.push_str(&content);
            let reasoning = Some(collector.reasoning().to_string());
            transcript.push(ConversationMessage::assistant_tool_calls(content, reasoning, calls.clone()));

            let mut seen = HashSet::new();
            let names: Vec<&str> = calls
                .iter()
                .map(|c| c.function.name.as_str())
                .filter(|name| seen.insert(*name))
                .collect();

            if counters.all_reached(names.iter().copied(), config.consecutive_limit) {
                self.logger.warn(&format!(
                    "[Orchestrator] Round {}: every requested tool hit the consecutive limit, truncating",
                    round
                ));
                for call in &calls {
                    transcript.push(ConversationMessage::tool_result(
                        call.id.clone(),
                        truncation_notice(&call.function.name, config.consecutive_limit),
                    ));
                }
                counters.reset(names.iter().copied());
                continue;
            }

            let requests: Vec<ToolCallRequest> = calls
                .iter()
                .enumerate()
                .map(|(ordinal, call)| ToolCallRequest::from_pending(call, ordinal))
                .collect();
            self.logger.info(&format!(
                "[Orchestrator] Round {}: calling {}",
                round,
                names.join(", ")
            ));
            for request in &requests {
                observer.tool_started(request);
            }

            let mut gates = CallGates {
                catalog,
                counters: &mut counters,
                consecutive_limit: config.consecutive_limit,
            };
            let results = self.executor.execute_all(requests, &mut gates, cancel).await;
            if cancel.is_cancelled() {
                return Err(OrchestratorError::Cancelled);
            }

            for result in results {
                observer.tool_finished(&result);
                transcript.push(ConversationMessage::tool_result(result.call_id, result.output));
            }
        }
    }

    async fn run_plain(
        &self,
        conversation: &[ConversationMessage],
        observer: &mut dyn RunObserver,
        cancel: &CancellationToken,
    ) -> OrchestratorResult<RunOutcome> {
        self.logger.debug("[Orchestrator] Plain completion");
        let collector = self.stream_round(conversation, &[], 1, observer, cancel).await?;

        let answer = strip_think(collector.content());
        let mut transcript = conversation.to_vec();
        transcript.push(ConversationMessage::assistant(answer.clone()));
        Ok(RunOutcome {
            answer,
            reasoning: collector.reasoning().to_string(),
            rounds: 1,
            tool_rounds: 0,
            budget_exhausted: false,
            transcript,
        })
    }

    async fn stream_round(
        &self,
        messages: &[ConversationMessage],
        tools: &[serde_json::Value],
        round: u32,
        observer: &mut dyn RunObserver,
        cancel: &CancellationToken,
    ) -> OrchestratorResult<StreamCollector> {
        observer.round_started(round);
        let mut on_delta = |delta: TextDelta| match delta {
            TextDelta::Reasoning(text) => observer.reasoning_appended(&text),
            TextDelta::Content(text) => observer.content_appended(&text),
        };
        let collector = self
            .completion
            .stream_round(messages, tools, &mut on_delta, cancel)
            .await
            .inspect_err(|e| {
                let level = if e.is_cancelled() { LogLevel::Info } else { LogLevel::Error };
                self.logger.log(level, &format!("[Orchestrator] Round {} ended: {}", round, e));
            })?;
        Ok(collector)
    }
}
