//! Credential to HTTP header derivation

/// Header carrying a server credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeader {
    pub name: String,
    pub value: String,
}

impl AuthHeader {
    fn authorization(value: impl Into<String>) -> Self {
        Self {
            name: "Authorization".to_string(),
            value: value.into(),
        }
    }
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}

fn with_bearer(token: &str) -> String {
    if strip_prefix_ignore_case(token, "Bearer ").is_some() {
        token.to_string()
    } else {
        format!("Bearer {}", token)
    }
}

/// Derive the request header for a configured credential
///
/// Accepted forms, tried in order on the trimmed credential:
/// 1. `Authorization=<value>`: `Authorization: Bearer <value>` (prefix added if missing)
/// 2. `Bearer <token>`: sent as-is in `Authorization`
/// 3. `Header-Name: value`: custom header, split at the first colon
/// 4. anything else: `Authorization: Bearer <credential>`
///
/// An empty credential yields no header.
pub fn derive_auth_header(credential: &str) -> Option<AuthHeader> {
    let credential = credential.trim();
    if credential.is_empty() {
        return None;
    }

    if let Some(value) = strip_prefix_ignore_case(credential, "Authorization=") {
        let value = value.trim();
        return (!value.is_empty()).then(|| AuthHeader::authorization(with_bearer(value)));
    }

    if strip_prefix_ignore_case(credential, "Bearer ").is_some() {
        return Some(AuthHeader::authorization(credential));
    }

    if let Some((name, value)) = credential.split_once(':') {
        let name = name.trim();
        if !name.is_empty() && !name.contains(char::is_whitespace) {
            return Some(AuthHeader {
                name: name.to_string(),
                value: value.trim().to_string(),
            });
        }
    }

    Some(AuthHeader::authorization(format!("Bearer {}", credential)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(name: &str, value: &str) -> Option<AuthHeader> {
        Some(AuthHeader {
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    #[test]
    fn test_authorization_assignment_form() {
        assert_eq!(derive_auth_header("Authorization=abc123"), header("Authorization", "Bearer abc123"));
        assert_eq!(derive_auth_header("authorization=Bearer xyz"), header("Authorization", "Bearer xyz"));
        assert_eq!(derive_auth_header("Authorization=  "), None);
    }

    #[test]
    fn test_bearer_form_kept() {
        assert_eq!(derive_auth_header("  Bearer tok  "), header("Authorization", "Bearer tok"));
        assert_eq!(derive_auth_header("bearer tok"), header("Authorization", "bearer tok"));
    }

    #[test]
    fn test_custom_header_form() {
        assert_eq!(derive_auth_header("X-Api-Key: secret"), header("X-Api-Key", "secret"));
        assert_eq!(
            derive_auth_header("Authorization: Basic dXNlcjpwYXNz"),
            header("Authorization", "Basic dXNlcjpwYXNz")
        );
        // Only the first colon splits
        assert_eq!(derive_auth_header("X-Token:a:b"), header("X-Token", "a:b"));
    }

    #[test]
    fn test_raw_token_form() {
        assert_eq!(derive_auth_header("sk-123"), header("Authorization", "Bearer sk-123"));
        // A name with spaces cannot be a header name
        assert_eq!(derive_auth_header("my key: v"), header("Authorization", "Bearer my key: v"));
    }

    #[test]
    fn test_empty_credential() {
        assert_eq!(derive_auth_header(""), None);
        assert_eq!(derive_auth_header("   "), None);
    }
}
