//! Streaming chat-completion chunk types
//!
//! Every field the model may omit is optional; absent and `null` values
//! deserialize the same way.

use serde::{Deserialize, Serialize};

/// One `data:` payload of a streaming chat completion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionChunk {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

impl CompletionChunk {
    /// The first choice, which is the only one the engine consumes
    pub fn first_choice(&self) -> Option<&ChunkChoice> {
        self.choices.first()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Incremental fragment of the assistant turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

/// Fragment of one tool call, merged by `index`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionDelta>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tool_call_chunk() {
        let chunk: CompletionChunk = serde_json::from_str(
            r#"{"id":"c1","choices":[{"index":0,"delta":{"tool_calls":[{"index":1,"id":"call_9","type":"function","function":{"name":"search","arguments":"{\"q\""}}]},"finish_reason":null}]}"#,
        )
        .unwrap();

        let choice = chunk.first_choice().unwrap();
        assert!(choice.finish_reason.is_none());
        let delta = &choice.delta.tool_calls.as_ref().unwrap()[0];
        assert_eq!(delta.index, 1);
        assert_eq!(delta.id.as_deref(), Some("call_9"));
        assert_eq!(delta.function.as_ref().unwrap().arguments.as_deref(), Some("{\"q\""));
    }

    #[test]
    fn test_parse_sparse_chunk() {
        let chunk: CompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":null,"reasoning_content":"hm"}}]}"#).unwrap();
        let delta = &chunk.first_choice().unwrap().delta;
        assert!(delta.content.is_none());
        assert_eq!(delta.reasoning_content.as_deref(), Some("hm"));
    }
}
