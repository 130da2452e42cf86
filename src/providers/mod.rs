pub mod ollama;
pub mod traits;

pub use ollama::{OllamaProvider, DEFAULT_BASE_URL};
pub use traits::{
    build_tool_instructions_text, ChatMessage, ChatRequest, ChatResponse, Provider,
    ProviderCapabilities, TokenUsage, ToolCall, ToolsPayload,
};

use crate::config::Config;

const MAX_API_ERROR_CHARS: usize = 200;

/// Build the chat provider from resolved configuration.
pub fn create_provider(config: &Config) -> Box<dyn Provider> {
    Box::new(OllamaProvider::new(
        config.api_url.as_deref(),
        config.api_key.as_deref(),
    ))
}

/// Scrub common secret patterns from API error bodies before logging.
pub fn scrub_secret_patterns(input: &str) -> String {
    const PREFIXES: [(&str, usize); 4] = [
        ("sk-", 1),
        ("tvly-", 1),
        ("\"api_key\":\"", 8),
        ("api_key=", 8),
    ];

    let mut output = input.to_string();
    for (prefix, keep) in PREFIXES {
        let mut from = 0;
        while from < output.len() {
            let Some(found) = output[from..].find(prefix) else {
                break;
            };
            let secret_start = from + found + prefix.len();
            let secret_end = output[secret_start..]
                .find(|c: char| !c.is_ascii_alphanumeric() && c != '-' && c != '_')
                .map_or(output.len(), |i| secret_start + i);
            if secret_end > secret_start + keep {
                output.replace_range(secret_start + keep..secret_end, "***");
                from = secret_start + keep + 3;
            } else {
                from = secret_end.max(secret_start);
            }
        }
    }
    output
}

/// Truncate and scrub a raw provider error body for safe logging.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);

    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed;
    }

    let mut end = MAX_API_ERROR_CHARS;
    while end > 0 && !scrubbed.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}...", &scrubbed[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_short_body_passes_through() {
        assert_eq!(sanitize_api_error("model not found"), "model not found");
    }

    #[test]
    fn sanitize_long_body_truncates() {
        let body = "x".repeat(500);
        let sanitized = sanitize_api_error(&body);
        assert!(sanitized.ends_with("..."));
        assert!(sanitized.len() <= MAX_API_ERROR_CHARS + 3);
    }

    #[test]
    fn scrub_masks_api_key_fields() {
        let body = r#"{"error":"bad request","api_key":"tvly-abcdef1234567890"}"#;
        let scrubbed = scrub_secret_patterns(body);
        assert!(!scrubbed.contains("abcdef1234567890"));
        assert!(scrubbed.contains("***"));
    }

    #[test]
    fn create_provider_uses_config_endpoint() {
        let config = Config {
            api_url: Some("http://localhost:11434".into()),
            ..Config::default()
        };
        let provider = create_provider(&config);
        assert!(provider.supports_native_tools());
    }
}
