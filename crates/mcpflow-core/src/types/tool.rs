//! Tool/function calling types

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A tool advertised by a tool server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name (function name)
    pub name: String,
    /// Description of what the tool does
    #[serde(default)]
    pub description: String,
    /// JSON Schema for the input parameters
    #[serde(rename = "inputSchema", default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

impl ToolDescriptor {
    /// Create a new tool descriptor with an empty object schema
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: empty_object_schema(),
        }
    }

    /// Set the input schema
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Function definition in the chat-completions `tools` format
    pub fn to_function_spec(&self) -> Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.input_schema,
            }
        })
    }
}

impl From<rmcp::model::Tool> for ToolDescriptor {
    fn from(tool: rmcp::model::Tool) -> Self {
        Self {
            name: tool.name.to_string(),
            description: tool.description.map(|s| s.to_string()).unwrap_or_default(),
            // input_schema is Arc<JsonObject>, convert to Value
            input_schema: serde_json::to_value(tool.input_schema.as_ref())
                .unwrap_or_else(|_| empty_object_schema()),
        }
    }
}

/// Function part of a merged tool call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Raw JSON argument text as streamed by the model
    #[serde(default)]
    pub arguments: String,
}

/// A tool call reassembled from streaming deltas, echoed back in the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

impl PendingToolCall {
    /// Create a function tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: function_kind(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// A tool invocation handed to the executor
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: Value,
    /// Position in the model's request; results are returned in this order
    pub ordinal: usize,
}

impl ToolCallRequest {
    /// Build a request from a merged tool call
    ///
    /// Empty or malformed argument text becomes an empty object so the server
    /// reports missing parameters itself.
    pub fn from_pending(call: &PendingToolCall, ordinal: usize) -> Self {
        let arguments = match call.function.arguments.trim() {
            "" => Value::Object(Map::new()),
            raw => match serde_json::from_str::<Value>(raw) {
                Ok(value @ Value::Object(_)) => value,
                _ => Value::Object(Map::new()),
            },
        };

        Self {
            call_id: call.id.clone(),
            tool_name: call.function.name.clone(),
            arguments,
            ordinal,
        }
    }
}

/// Outcome of a single tool invocation (never absent, failures included)
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallResult {
    pub call_id: String,
    pub tool_name: String,
    /// Tool output text, or the error text for failures
    pub output: String,
    pub success: bool,
    pub elapsed: Duration,
    pub ordinal: usize,
}

impl ToolCallResult {
    /// Create a successful result
    pub fn success(request: &ToolCallRequest, output: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            call_id: request.call_id.clone(),
            tool_name: request.tool_name.clone(),
            output: output.into(),
            success: true,
            elapsed,
            ordinal: request.ordinal,
        }
    }

    /// Create a failed result carrying error text
    pub fn failure(request: &ToolCallRequest, error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: false,
            ..Self::success(request, error, elapsed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_function_spec_shape() {
        let tool = ToolDescriptor::new("get_weather", "Get the current weather").with_schema(json!({
            "type": "object",
            "properties": { "location": { "type": "string" } },
            "required": ["location"]
        }));

        let spec = tool.to_function_spec();
        assert_eq!(spec["type"], "function");
        assert_eq!(spec["function"]["name"], "get_weather");
        assert_eq!(spec["function"]["parameters"]["required"][0], "location");
    }

    #[test]
    fn test_descriptor_from_rmcp_tool() {
        let raw: rmcp::model::Tool = serde_json::from_value(json!({
            "name": "echo",
            "description": "Echo text",
            "inputSchema": { "type": "object", "properties": { "text": { "type": "string" } } }
        }))
        .unwrap();

        let descriptor = ToolDescriptor::from(raw);
        assert_eq!(descriptor.name, "echo");
        assert_eq!(descriptor.description, "Echo text");
        assert_eq!(descriptor.input_schema["properties"]["text"]["type"], "string");
    }

    #[test]
    fn test_request_from_pending_parses_arguments() {
        let call = PendingToolCall::new("call_1", "search", r#"{"q":"rust"}"#);
        let request = ToolCallRequest::from_pending(&call, 3);
        assert_eq!(request.arguments, json!({ "q": "rust" }));
        assert_eq!(request.ordinal, 3);
    }

    #[test]
    fn test_request_from_pending_tolerates_bad_arguments() {
        let empty = ToolCallRequest::from_pending(&PendingToolCall::new("a", "t", ""), 0);
        assert_eq!(empty.arguments, json!({}));

        let broken = ToolCallRequest::from_pending(&PendingToolCall::new("b", "t", "{\"q\":"), 0);
        assert_eq!(broken.arguments, json!({}));
    }

    #[test]
    fn test_failure_result() {
        let request = ToolCallRequest::from_pending(&PendingToolCall::new("a", "t", "{}"), 1);
        let result = ToolCallResult::failure(&request, "Error: boom", Duration::ZERO);
        assert!(!result.success);
        assert_eq!(result.output, "Error: boom");
        assert_eq!(result.ordinal, 1);
    }
}
