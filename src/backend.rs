//! Client side of the translation endpoint.
//!
//! Wire format: `POST {"text", "targetLang"}` answered by
//! `{"translatedText"}`. Any other shape, or a non-2xx status, is a failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Request body of the translation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    pub text: String,
    pub target_lang: String,
}

/// Success body of the translation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponse {
    pub translated_text: String,
}

/// Lenient view of a response body, so a missing field is told apart from
/// a body that is not JSON at all.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTranslateResponse {
    translated_text: Option<String>,
}

/// Why a translation request produced no translation.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("translation request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("translation endpoint returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed translation response: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The body parsed but carried no usable `translatedText`
    #[error("translation response contained no translatedText")]
    MissingTranslation,
}

/// Something that can translate one string into one target language.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, BackendError>;
}

/// Translation backend calling the website's `/api/translate` endpoint.
#[derive(Debug, Clone)]
pub struct HttpTranslationBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTranslationBackend {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Backend with its own client bounded by `timeout` per request.
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::new(client, endpoint))
    }
}

#[async_trait]
impl TranslationBackend for HttpTranslationBackend {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, BackendError> {
        let request = TranslateRequest {
            text: text.to_string(),
            target_lang: target_lang.to_string(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(BackendError::Status { status, body });
        }

        let parsed: RawTranslateResponse = serde_json::from_str(&body)?;
        parsed
            .translated_text
            .filter(|translated| !translated.trim().is_empty())
            .ok_or(BackendError::MissingTranslation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{body_json, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    async fn backend_for(server: &MockServer) -> HttpTranslationBackend {
        HttpTranslationBackend::new(
            reqwest::Client::new(),
            format!("{}/api/translate", server.uri()),
        )
    }

    #[tokio::test]
    async fn test_translate_sends_wire_format() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/translate"))
            .and(body_json(serde_json::json!({
                "text": "Submit",
                "targetLang": "es"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "translatedText": "Enviar" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let result = backend_for(&server).await.translate("Submit", "es").await;
        assert_eq!(result.unwrap(), "Enviar");
    }

    #[tokio::test]
    async fn test_translate_non_success_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let err = backend_for(&server)
            .await
            .translate("Submit", "es")
            .await
            .unwrap_err();

        match err {
            BackendError::Status { status, body } => {
                assert_eq!(status.as_u16(), 502);
                assert_eq!(body, "upstream down");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_translate_missing_field() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "result": "Enviar" })),
            )
            .mount(&server)
            .await;

        let err = backend_for(&server)
            .await
            .translate("Submit", "es")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::MissingTranslation));
    }

    #[tokio::test]
    async fn test_translate_blank_translation_counts_as_missing() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "translatedText": "" })),
            )
            .mount(&server)
            .await;

        let err = backend_for(&server)
            .await
            .translate("Submit", "es")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::MissingTranslation));
    }

    #[tokio::test]
    async fn test_translate_malformed_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = backend_for(&server)
            .await
            .translate("Submit", "es")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_translate_wrong_field_type_is_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "translatedText": 7 })),
            )
            .mount(&server)
            .await;

        let err = backend_for(&server)
            .await
            .translate("Submit", "es")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_translate_connection_refused() {
        // Nothing listens on the discard port in the test environment
        let backend =
            HttpTranslationBackend::new(reqwest::Client::new(), "http://127.0.0.1:9/api/translate");

        let err = backend.translate("Submit", "es").await.unwrap_err();
        assert!(matches!(err, BackendError::Network(_)));
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let json = serde_json::to_string(&TranslateRequest {
            text: "Pay a bill".to_string(),
            target_lang: "vi".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"text":"Pay a bill","targetLang":"vi"}"#);
    }
}
