//! Server-sent-event framing helpers

/// Payload of an SSE `data:` line, if the line is one (prefix is case-insensitive)
pub fn strip_data_prefix(line: &str) -> Option<&str> {
    let line = line.trim_start();
    let head = line.get(..5)?;
    head.eq_ignore_ascii_case("data:").then(|| line[5..].trim())
}

/// JSON text of a response body that may be plain JSON or SSE-framed
///
/// For SSE bodies the first non-empty `data:` payload wins; otherwise the
/// whole body is returned trimmed.
pub fn extract_json_payload(body: &str) -> &str {
    body.lines()
        .filter_map(strip_data_prefix)
        .find(|payload| !payload.is_empty())
        .unwrap_or_else(|| body.trim())
}
