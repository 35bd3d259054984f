//! Chat-completion request construction

use reqwest::Url;
use serde_json::{json, Value};

use super::error::{CompletionError, CompletionResult};
use crate::config::CompletionSettings;
use crate::types::ConversationMessage;

/// Endpoint URL; a bare `/` path becomes `/chat/completions`
pub fn endpoint_url(base: &str) -> CompletionResult<String> {
    let mut url = Url::parse(base.trim()).map_err(|_| CompletionError::InvalidUrl(base.to_string()))?;
    if url.path() == "/" || url.path().is_empty() {
        url.set_path("/chat/completions");
    }
    Ok(url.to_string())
}

/// Streaming request body; `tools` and `tool_choice` only appear with tools
pub fn request_body(settings: &CompletionSettings, messages: &[ConversationMessage], tools: &[Value]) -> Value {
    let mut body = json!({
        "model": settings.effective_model(),
        "messages": messages,
        "temperature": settings.temperature.clamp(0.0, 2.0),
        "max_tokens": settings.max_tokens,
        "top_p": settings.top_p,
        "n": settings.n,
        "stream": true,
    });
    if !tools.is_empty() {
        body["tools"] = Value::Array(tools.to_vec());
        body["tool_choice"] = json!("auto");
    }
    body
}

pub fn request_headers(settings: &CompletionSettings) -> Vec<(String, String)> {
    vec![
        ("Authorization".to_string(), format!("Bearer {}", settings.api_key.trim())),
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Accept".to_string(), "text/event-stream".to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url() {
        assert_eq!(
            endpoint_url("https://api.deepseek.com/").unwrap(),
            "https://api.deepseek.com/chat/completions"
        );
        assert_eq!(
            endpoint_url("https://api.deepseek.com").unwrap(),
            "https://api.deepseek.com/chat/completions"
        );
        assert_eq!(
            endpoint_url("http://localhost:8080/v1/chat/completions").unwrap(),
            "http://localhost:8080/v1/chat/completions"
        );
        assert!(matches!(endpoint_url("not a url"), Err(CompletionError::InvalidUrl(_))));
    }

    #[test]
    fn test_body_clamps_and_omits_tools() {
        let settings = CompletionSettings {
            temperature: 3.5,
            model: String::new(),
            ..Default::default()
        };
        let body = request_body(&settings, &[ConversationMessage::user("hi")], &[]);

        assert_eq!(body["temperature"], 2.0);
        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "user");
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn test_body_with_tools() {
        let tools = vec![json!({ "type": "function", "function": { "name": "search" } })];
        let body = request_body(&CompletionSettings::default(), &[], &tools);
        assert_eq!(body["tools"][0]["function"]["name"], "search");
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["max_tokens"], 2048);
    }

    #[test]
    fn test_headers_carry_bearer_token() {
        let settings = CompletionSettings {
            api_key: " sk-1 ".to_string(),
            ..Default::default()
        };
        let headers = request_headers(&settings);
        assert!(headers.contains(&("Authorization".to_string(), "Bearer sk-1".to_string())));
    }
}
