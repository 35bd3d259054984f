//! Transport seam for streaming completions

use async_trait::async_trait;
use serde_json::Value;

use super::error::CompletionResult;
use crate::types::CancellationToken;

/// Posts a JSON body and hands every raw response line to `on_line`
///
/// Lines arrive in order, without their trailing newline. Framing (`data:`
/// prefixes, `[DONE]`) is left to the caller.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    async fn stream_post(
        &self,
        url: &str,
        body: &Value,
        headers: &[(String, String)],
        on_line: &mut (dyn for<'a> FnMut(&'a str) + Send),
        cancel: &CancellationToken,
    ) -> CompletionResult<()>;
}
