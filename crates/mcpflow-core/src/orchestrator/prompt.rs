//! System prompt assembly and model-text cleanup

use serde_json::Value;

use super::strategy::{DescriptionTier, NO_SUITABLE_TOOL_MARKER};
use crate::types::ToolDescriptor;

const ROUGH_PLACEHOLDER: &str = "$description_rough";
const DETAILED_PLACEHOLDER: &str = "$description_detailed";
const NO_TOOLS_TEXT: &str = "(no MCP tools are currently enabled)";

/// One tool as a prompt bullet
///
/// ```text
/// - search
///   Parameters:
///     - query (string): Text to look for
///   Required: query
///   Description: Full-text search
/// ```
pub fn describe_tool(tool: &ToolDescriptor, tier: DescriptionTier) -> String {
    let mut lines = vec![format!("- {}", tool.name)];

    match &tool.input_schema {
        Value::Object(schema) => {
            if let Some(Value::Object(properties)) = schema.get("properties") {
                if !properties.is_empty() {
                    lines.push("  Parameters:".to_string());
                    for (name, property) in properties {
                        let kind = property.get("type").map_or_else(|| "any".to_string(), display_value);
                        let description = property.get("description").map(display_value).unwrap_or_default();
                        lines.push(format!("    - {} ({}): {}", name, kind, description).trim_end().to_string());
                    }
                }
            }
            if let Some(Value::Array(required)) = schema.get("required") {
                if !required.is_empty() {
                    let names: Vec<String> = required.iter().map(display_value).collect();
                    lines.push(format!("  Required: {}", names.join(", ")));
                }
            }
        }
        Value::Null => {}
        other => lines.push(format!("  Schema: {}", other)),
    }

    if tier == DescriptionTier::Detailed && !tool.description.trim().is_empty() {
        lines.push(format!("  Description: {}", tool.description.trim()));
    }
    lines.join("\n")
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn describe_tools(tools: &[&ToolDescriptor], tier: DescriptionTier) -> String {
    if tools.is_empty() {
        return NO_TOOLS_TEXT.to_string();
    }
    tools
        .iter()
        .map(|tool| describe_tool(tool, tier))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Substitute both description placeholders in `template`
pub fn build_system_prompt(template: &str, tools: &[&ToolDescriptor]) -> String {
    let mut prompt = template.to_string();
    if prompt.contains(ROUGH_PLACEHOLDER) {
        prompt = prompt.replace(ROUGH_PLACEHOLDER, &describe_tools(tools, DescriptionTier::Rough));
    }
    if prompt.contains(DETAILED_PLACEHOLDER) {
        prompt = prompt.replace(DETAILED_PLACEHOLDER, &describe_tools(tools, DescriptionTier::Detailed));
    }
    prompt
}

/// Drop the first `<think>...</think>` block
pub fn strip_think(content: &str) -> String {
    match (content.find("<think>"), content.find("</think>")) {
        (Some(start), Some(end)) if end > start => {
            let rest = content[end + "</think>".len()..].trim();
            format!("{}{}", &content[..start], rest)
        }
        _ => content.to_string(),
    }
}

/// Tool-call markup some models leak into content alongside real tool calls
pub fn has_call_markup(content: &str) -> bool {
    content.contains("<｜DSML｜") || content.contains("function_calls")
}

pub fn signals_no_suitable_tool(content: &str) -> bool {
    let lower = content.to_lowercase();
    lower.contains(&NO_SUITABLE_TOOL_MARKER.to_lowercase()) || lower.contains("no suitable tool available")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn search_tool() -> ToolDescriptor {
        ToolDescriptor::new("search", "Full-text search").with_schema(json!({
            "type": "object",
            "properties": {
                "limit": { "type": "integer" },
                "query": { "type": "string", "description": "Text to look for" }
            },
            "required": ["query"]
        }))
    }

    #[test]
    fn test_rough_and_detailed_descriptions() {
        let tool = search_tool();
        let rough = describe_tool(&tool, DescriptionTier::Rough);
        assert_eq!(
            rough,
            "- search\n  Parameters:\n    - limit (integer):\n    - query (string): Text to look for\n  Required: query"
        );

        let detailed = describe_tool(&tool, DescriptionTier::Detailed);
        assert!(detailed.starts_with(&rough));
        assert!(detailed.ends_with("  Description: Full-text search"));
    }

    #[test]
    fn test_tool_without_parameters() {
        let tool = ToolDescriptor::new("now", "");
        assert_eq!(describe_tool(&tool, DescriptionTier::Detailed), "- now");
    }

    #[test]
    fn test_system_prompt_substitution() {
        let tool = search_tool();
        let prompt = build_system_prompt("Tools:\n$description_detailed\nEnd", &[&tool]);
        assert!(prompt.contains("- search"));
        assert!(prompt.contains("Description: Full-text search"));
        assert!(!prompt.contains("$description"));

        let empty = build_system_prompt("Tools:\n$description_rough", &[]);
        assert_eq!(empty, "Tools:\n(no MCP tools are currently enabled)");
    }

    #[test]
    fn test_strip_think() {
        assert_eq!(strip_think("<think>hmm</think>\n\nAnswer"), "Answer");
        assert_eq!(strip_think("Pre <think>x</think> post"), "Pre post");
        assert_eq!(strip_think("no tags"), "no tags");
        assert_eq!(strip_think("</think> broken <think>"), "</think> broken <think>");
    }

    #[test]
    fn test_markers() {
        assert!(has_call_markup("<｜DSML｜function_calls>"));
        assert!(!has_call_markup("plain"));
        assert!(signals_no_suitable_tool("[no_suitable_tool] sorry"));
        assert!(signals_no_suitable_tool("No suitable tool available to answer this question."));
        assert!(!signals_no_suitable_tool("Here is the answer"));
    }
}
