//! HTTP surface of the translation service.
//!
//! - `POST /api/translate`: `{text, targetLang}` to `{translatedText}`
//! - `GET /api/languages`: languages offered by the switcher
//! - `GET /api/metrics`: translation counters, behind `X-API-Key`
//! - `GET /health`

use crate::backend::{TranslateRequest, TranslateResponse};
use crate::config::Config;
use crate::i18n::{Language, LanguageRegistry, MetricsReport, TranslationMetrics};
use crate::translation::translate_text;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use subtle::ConstantTimeEq;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared state of the translation service.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<ServerState>,
}

struct ServerState {
    config: Config,
    client: reqwest::Client,
    cache: Mutex<TranslationCache>,
    metrics: TranslationMetrics,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(ServerState {
                cache: Mutex::new(TranslationCache::new(config.cache_capacity)),
                config,
                client: reqwest::Client::new(),
                metrics: TranslationMetrics::new(),
            }),
        }
    }

    fn cached(&self, text: &str, language: &str) -> Option<String> {
        self.inner
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(text, language)
    }

    fn remember(&self, text: &str, language: &str, translated: &str) {
        self.inner
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(text, language, translated);
    }
}

/// (text, language) -> translation, shared by every site visitor.
///
/// Holds at most `capacity` entries; once full, the oldest insertion is
/// evicted first.
#[derive(Debug)]
struct TranslationCache {
    entries: HashMap<(String, String), String>,
    order: VecDeque<(String, String)>,
    capacity: usize,
}

impl TranslationCache {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn get(&self, text: &str, language: &str) -> Option<String> {
        self.entries
            .get(&(text.to_string(), language.to_string()))
            .cloned()
    }

    fn insert(&mut self, text: &str, language: &str, translated: &str) {
        if self.capacity == 0 {
            return;
        }

        let key = (text.to_string(), language.to_string());
        if self
            .entries
            .insert(key.clone(), translated.to_string())
            .is_some()
        {
            return;
        }
        self.order.push_back(key);

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }
}

/// JSON error body: `{"error": "..."}`.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LanguageInfo {
    code: &'static str,
    name: &'static str,
    native_name: &'static str,
    is_canonical: bool,
}

impl From<Language> for LanguageInfo {
    fn from(language: Language) -> Self {
        Self {
            code: language.code(),
            name: language.name(),
            native_name: language.native_name(),
            is_canonical: language.is_canonical(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/translate", post(translate_handler))
        .route("/api/languages", get(languages_handler))
        .route("/api/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the service until Ctrl+C.
pub async fn serve(config: Config) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Translation service listening on {}", addr);

    axum::serve(listener, router(AppState::new(config)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Translation service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn translate_handler(
    State(state): State<AppState>,
    Json(request): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>, ApiError> {
    let TranslateRequest { text, target_lang } = request;

    if text.trim().is_empty() {
        return Ok(Json(TranslateResponse {
            translated_text: text,
        }));
    }

    let max_chars = state.inner.config.max_text_chars;
    if text.chars().count() > max_chars {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("Text exceeds the {} character limit", max_chars),
        ));
    }

    let language = Language::from_code(&target_lang)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;

    if language.is_canonical() {
        return Ok(Json(TranslateResponse {
            translated_text: text,
        }));
    }

    let metrics = &state.inner.metrics;
    if let Some(translated_text) = state.cached(&text, language.code()) {
        metrics.record_cache_hit();
        return Ok(Json(TranslateResponse { translated_text }));
    }
    metrics.record_cache_miss();
    metrics.record_api_call();

    match translate_text(&state.inner.client, &state.inner.config, &text, language).await {
        Ok(translated_text) => {
            state.remember(&text, language.code(), &translated_text);
            Ok(Json(TranslateResponse { translated_text }))
        }
        Err(e) => {
            metrics.record_api_failure();
            warn!("Upstream translation to {} failed: {}", language.code(), e);
            Err(ApiError::new(
                StatusCode::BAD_GATEWAY,
                "Translation service unavailable",
            ))
        }
    }
}

async fn languages_handler() -> Json<Vec<LanguageInfo>> {
    Json(
        LanguageRegistry::get()
            .list_enabled()
            .into_iter()
            .filter_map(|lang| Language::from_code(lang.code).ok())
            .map(LanguageInfo::from)
            .collect(),
    )
}

async fn metrics_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MetricsReport>, ApiError> {
    let Some(expected) = state.inner.config.api_key.as_deref() else {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "Not found"));
    };

    let provided = headers
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if !api_key_matches(expected, provided) {
        return Err(ApiError::new(StatusCode::UNAUTHORIZED, "Invalid API key"));
    }

    Ok(Json(state.inner.metrics.report()))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Constant-time comparison, so response timing does not leak the key.
fn api_key_matches(expected: &str, provided: &str) -> bool {
    if expected.len() != provided.len() {
        return false;
    }
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_matches() {
        assert!(api_key_matches("secret123", "secret123"));
        assert!(!api_key_matches("secret123", "secret124"));
        assert!(!api_key_matches("secret123", "secret12"));
        assert!(!api_key_matches("secret", ""));
    }

    #[test]
    fn test_api_error_body() {
        let response = ApiError::new(StatusCode::BAD_GATEWAY, "down").into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    fn test_config(max_text_chars: usize, cache_capacity: usize) -> Config {
        Config {
            openai_api_key: "k".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            // Nothing listens here; a test reaching upstream fails fast
            openai_api_url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            translation_max_tokens: 2000,
            max_text_chars,
            cache_capacity,
            api_key: None,
            port: 0,
        }
    }

    fn translate_request(text: &str, target_lang: &str) -> Json<TranslateRequest> {
        Json(TranslateRequest {
            text: text.to_string(),
            target_lang: target_lang.to_string(),
        })
    }

    #[test]
    fn test_state_cache_round_trip() {
        let state = AppState::new(test_config(5000, 100));

        assert_eq!(state.cached("Parks", "es"), None);
        state.remember("Parks", "es", "Parques");
        assert_eq!(state.cached("Parks", "es").as_deref(), Some("Parques"));
        assert_eq!(state.cached("Parks", "fr"), None);
    }

    #[test]
    fn test_cache_evicts_oldest_entries_beyond_capacity() {
        let state = AppState::new(test_config(5000, 2));

        state.remember("Parks", "es", "Parques");
        state.remember("Library", "es", "Biblioteca");
        state.remember("Permits", "es", "Permisos");

        assert_eq!(state.cached("Parks", "es"), None);
        assert_eq!(state.cached("Library", "es").as_deref(), Some("Biblioteca"));
        assert_eq!(state.cached("Permits", "es").as_deref(), Some("Permisos"));
        assert_eq!(state.inner.cache.lock().unwrap().entries.len(), 2);
    }

    #[test]
    fn test_cache_stays_bounded_under_many_distinct_texts() {
        let state = AppState::new(test_config(5000, 10));

        for i in 0..1000 {
            state.remember(&format!("Notice {}", i), "vi", &format!("Thông báo {}", i));
        }

        let cache = state.inner.cache.lock().unwrap();
        assert_eq!(cache.entries.len(), 10);
        assert_eq!(cache.order.len(), 10);
        assert_eq!(cache.get("Notice 999", "vi").as_deref(), Some("Thông báo 999"));
        assert_eq!(cache.get("Notice 989", "vi"), None);
    }

    #[test]
    fn test_cache_rewrite_does_not_duplicate_order() {
        let state = AppState::new(test_config(5000, 2));

        state.remember("Parks", "es", "Parques");
        state.remember("Parks", "es", "Parques");
        state.remember("Library", "es", "Biblioteca");

        assert_eq!(state.cached("Parks", "es").as_deref(), Some("Parques"));
        assert_eq!(state.inner.cache.lock().unwrap().order.len(), 2);
    }

    #[test]
    fn test_zero_capacity_cache_stores_nothing() {
        let state = AppState::new(test_config(5000, 0));

        state.remember("Parks", "es", "Parques");
        assert_eq!(state.cached("Parks", "es"), None);
    }

    #[tokio::test]
    async fn test_oversize_text_is_rejected() {
        let state = AppState::new(test_config(10, 100));

        let error = translate_handler(State(state.clone()), translate_request(&"a".repeat(11), "es"))
            .await
            .unwrap_err();

        assert_eq!(error.status, StatusCode::BAD_REQUEST);
        assert!(error.message.contains("10 character limit"));
        assert_eq!(state.inner.metrics.report().api_calls, 0);
    }

    #[tokio::test]
    async fn test_text_at_limit_is_accepted() {
        let state = AppState::new(test_config(6, 100));
        state.remember("Parque", "es", "Parque");

        let Json(response) = translate_handler(State(state.clone()), translate_request("Parque", "es"))
            .await
            .unwrap();
        assert_eq!(response.translated_text, "Parque");

        // Six characters, seven bytes
        let Json(response) = translate_handler(State(state), translate_request("Über  ", "en"))
            .await
            .unwrap();
        assert_eq!(response.translated_text, "Über  ");
    }

    #[test]
    fn test_language_info_from_language() {
        let info = LanguageInfo::from(Language::SPANISH);

        assert_eq!(info.code, "es");
        assert_eq!(info.name, "Spanish");
        assert_eq!(info.native_name, "Español");
        assert!(!info.is_canonical);
        assert!(LanguageInfo::from(Language::ENGLISH).is_canonical);
    }
}
