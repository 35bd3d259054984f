//! One streamed completion round over a [`StreamTransport`]

use std::sync::Arc;

use serde_json::Value;

use super::collector::{StreamCollector, TextDelta};
use super::error::CompletionResult;
use super::request::{endpoint_url, request_body, request_headers};
use super::traits::StreamTransport;
use crate::config::CompletionSettings;
use crate::logging::SharedLogger;
use crate::types::{CancellationToken, ConversationMessage};

pub struct CompletionClient {
    transport: Arc<dyn StreamTransport>,
    settings: CompletionSettings,
    logger: SharedLogger,
}

impl CompletionClient {
    pub fn new(transport: Arc<dyn StreamTransport>, settings: CompletionSettings, logger: SharedLogger) -> Self {
        Self {
            transport,
            settings,
            logger,
        }
    }

    pub fn settings(&self) -> &CompletionSettings {
        &self.settings
    }

    /// Stream one round, reporting text deltas as they arrive
    pub async fn stream_round(
        &self,
        messages: &[ConversationMessage],
        tools: &[Value],
        on_delta: &mut (dyn FnMut(TextDelta) + Send),
        cancel: &CancellationToken,
    ) -> CompletionResult<StreamCollector> {
        let url = endpoint_url(&self.settings.url)?;
        let body = request_body(&self.settings, messages, tools);
        let headers = request_headers(&self.settings);

        self.logger.debug(&format!(
            "[Completion] POST {} ({} messages, {} tools)",
            url,
            messages.len(),
            tools.len()
        ));

        let mut collector = StreamCollector::new();
        let mut on_line = |line: &str| {
            for delta in collector.ingest_line(line) {
                on_delta(delta);
            }
        };
        self.transport
            .stream_post(&url, &body, &headers, &mut on_line, cancel)
            .await?;

        self.logger.debug(&format!(
            "[Completion] Round finished: {:?}, {} tool calls",
            collector.finish(),
            collector.tool_calls().len()
        ));
        Ok(collector)
    }
}
