//! reqwest-backed streaming transport

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;

use super::error::{CompletionError, CompletionResult};
use super::traits::StreamTransport;
use crate::types::CancellationToken;

/// Streams response bodies line by line over a shared `reqwest::Client`
#[derive(Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> CompletionResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { http })
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

/// Split complete lines off the front of `buffer`
fn drain_lines(buffer: &mut Vec<u8>, on_line: &mut (dyn for<'a> FnMut(&'a str) + Send)) {
    while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=pos).collect();
        emit(&line[..line.len() - 1], on_line);
    }
}

fn emit(raw: &[u8], on_line: &mut (dyn for<'a> FnMut(&'a str) + Send)) {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_end_matches('\r');
    if !line.trim().is_empty() {
        on_line(line);
    }
}

#[async_trait]
impl StreamTransport for ReqwestTransport {
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
        let mut request = self.http.post(url).json(body);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(CompletionError::Cancelled),
            response = request.send() => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let message = tokio::select! {
                _ = cancel.cancelled() => return Err(CompletionError::Cancelled),
                text = response.text() => text.unwrap_or_default(),
            };
            return Err(CompletionError::api(status.as_u16(), message.trim()));
        }

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return Err(CompletionError::Cancelled),
                next = stream.next() => next,
            };
            match next {
                Some(chunk) => {
                    buffer.extend_from_slice(&chunk?);
                    drain_lines(&mut buffer, on_line);
                }
                None => break,
            }
        }
        if !buffer.is_empty() {
            emit(&buffer, on_line);
        }
        Ok(())
    }
}
