use anyhow::{Context, Result};
use std::time::Duration;

/// Server-side configuration for the translation endpoint.
#[derive(Debug, Clone)]
pub struct Config {
    // OpenAI
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_api_url: String,
    pub translation_max_tokens: u32,

    // Public endpoint limits
    pub max_text_chars: usize,
    pub cache_capacity: usize,

    // Protects operational endpoints such as /api/metrics
    pub api_key: Option<String>,

    // Server
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            // OpenAI
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY not set")?,
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
            translation_max_tokens: parse_or("TRANSLATION_MAX_TOKENS", 2000),

            max_text_chars: parse_or("TRANSLATION_MAX_TEXT_CHARS", 5000),
            cache_capacity: parse_or("TRANSLATION_CACHE_CAPACITY", 10_000),

            api_key: std::env::var("API_KEY").ok().filter(|key| !key.is_empty()),

            port: parse_or("PORT", 8080),
        })
    }
}

/// Configuration for the translation client (the `translate` binary).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Full URL of the translation endpoint
    pub endpoint: String,
    /// JSON file backing the persistent key/value store
    pub store_path: String,
    /// Upper bound on a single translation request
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: std::env::var("TRANSLATE_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:8080/api/translate".to_string()),
            store_path: std::env::var("TRANSLATION_STORE")
                .unwrap_or_else(|_| ".civic-translate.json".to_string()),
            timeout: Duration::from_secs(parse_or("TRANSLATE_TIMEOUT_SECS", 30)),
        }
    }
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_falls_back_on_missing_variable() {
        let value: u32 = parse_or("CIVIC_TRANSLATE_TEST_UNSET_VARIABLE", 42);
        assert_eq!(value, 42);
    }

    #[test]
    fn test_parse_or_falls_back_on_garbage() {
        std::env::set_var("CIVIC_TRANSLATE_TEST_GARBAGE", "not-a-number");
        let value: u16 = parse_or("CIVIC_TRANSLATE_TEST_GARBAGE", 8080);
        assert_eq!(value, 8080);
    }

    #[test]
    fn test_parse_or_reads_value() {
        std::env::set_var("CIVIC_TRANSLATE_TEST_PORT", "9090");
        let value: u16 = parse_or("CIVIC_TRANSLATE_TEST_PORT", 8080);
        assert_eq!(value, 9090);
    }
}
