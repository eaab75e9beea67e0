//! Upstream translation through an OpenAI-compatible chat completions API.
//!
//! This is what sits behind `POST /api/translate`: the city website sends a
//! piece of page text and a target language, and gets back the translation.

use crate::config::Config;
use crate::i18n::{Language, TranslationValidator};
use crate::retry::{with_retry_if, RetryConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// OpenAI Chat Completion request for translation
#[derive(Debug, Serialize)]
struct TranslationRequest {
    model: String,
    messages: Vec<Message>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// Failure talking to the upstream translation API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Failed to send translation request to OpenAI API: {0}")]
    Request(#[source] reqwest::Error),

    #[error("OpenAI API error during translation ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to parse OpenAI translation response: {0}")]
    Parse(#[source] reqwest::Error),

    #[error("OpenAI translation response contained no choices")]
    NoChoices,
}

impl UpstreamError {
    /// Rate limits, 5xx responses and transport problems are worth retrying;
    /// other 4xx responses will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            UpstreamError::Api { status, .. } => {
                *status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            _ => true,
        }
    }
}

/// Check if a model is a reasoning model that doesn't support temperature
fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("gpt-5")
        || model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("o4")
}

/// Build the system prompt for translating city website text
fn build_translation_system_prompt(target_language: &str) -> String {
    format!(
        r#"You are a professional translator for a city government website. Translate the text you are given from English to {}.

## Translation Rules

### DO NOT translate:
- URLs, e-mail addresses and phone numbers
- Street addresses and building names
- Official names of city departments, programs and elected offices (e.g., "Department of Public Works", "Parks & Recreation")
- Form field identifiers, codes and reference numbers

### DO translate:
- Page headings, button labels and navigation text
- Descriptions of services, eligibility and deadlines
- Instructions for residents

### Formatting:
- Preserve HTML tags, markdown formatting and line breaks exactly
- Keep dates, times, amounts and units as written

### Tone:
- Plain, welcoming language suitable for all residents
- Keep legal and procedural meaning exact; do not add or omit requirements

Reply with the translation only. Do not add explanations, notes or quotation marks."#,
        target_language
    )
}

/// Build the user prompt for translation
fn build_translation_user_prompt(text: &str, target_language: &str) -> String {
    format!("Translate the following text to {}:\n\n{}", target_language, text)
}

/// Translate `text` from English to `target_language`.
///
/// The canonical language is returned unchanged without an API call.
pub async fn translate_text(
    client: &reqwest::Client,
    config: &Config,
    text: &str,
    target_language: Language,
) -> Result<String, UpstreamError> {
    if target_language.is_canonical() {
        return Ok(text.to_string());
    }

    // Reasoning models need higher token limits and don't support temperature
    let is_reasoning = is_reasoning_model(&config.openai_model);
    let max_completion_tokens = if is_reasoning {
        16000
    } else {
        config.translation_max_tokens
    };

    let request = TranslationRequest {
        model: config.openai_model.clone(),
        messages: vec![
            Message {
                role: "system".to_string(),
                content: build_translation_system_prompt(target_language.name()),
            },
            Message {
                role: "user".to_string(),
                content: build_translation_user_prompt(text, target_language.name()),
            },
        ],
        max_completion_tokens,
        temperature: if is_reasoning { None } else { Some(0.2) },
        reasoning_effort: if is_reasoning {
            Some("low".to_string())
        } else {
            None
        },
    };

    let translated = with_retry_if(
        &RetryConfig::api_call(),
        &format!("Translation to {}", target_language.name()),
        || async {
            let response = client
                .post(&config.openai_api_url)
                .header("Authorization", format!("Bearer {}", config.openai_api_key))
                .json(&request)
                .send()
                .await
                .map_err(UpstreamError::Request)?;

            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
                return Err(UpstreamError::Api { status, body });
            }

            let chat_response: ChatResponse =
                response.json().await.map_err(UpstreamError::Parse)?;

            chat_response
                .choices
                .into_iter()
                .next()
                .map(|choice| choice.message.content.trim().to_string())
                .ok_or(UpstreamError::NoChoices)
        },
        UpstreamError::is_retryable,
    )
    .await?;

    let validation = TranslationValidator::validate(text, &translated);
    if !validation.is_clean() {
        warn!(
            "Translation validation issues for {} ({}): errors={:?} warnings={:?}",
            target_language.name(),
            target_language.code(),
            validation.errors,
            validation.warnings
        );
    }

    Ok(translated)
}
