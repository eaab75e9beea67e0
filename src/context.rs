//! Client-side translation cache and request deduplicator.
//!
//! A [`LanguageContext`] owns everything a running client needs to show
//! translated text:
//!
//! - the translation cache, `text -> language -> translation`, persisted to a
//!   [`KeyValueStore`] on every change and never pruned;
//! - the registry of requests in flight, keyed by (text, language), so
//!   concurrent callers asking for the same pair share one network call;
//! - the selected language, persisted and defaulting to the source language.
//!
//! `translate` never fails. Network, endpoint and storage problems are logged
//! and the caller gets the source text back.
//!
//! A request is always cached under the language that was active when it was
//! issued. If the language changes while it is in flight, the caller still
//! receives the translation it asked for; comparing against
//! [`LanguageContext::language`] after the await tells it whether the text is
//! still relevant.

use crate::backend::TranslationBackend;
use crate::i18n::{MetricsReport, TranslationMetrics, SOURCE_LANGUAGE};
use crate::storage::{KeyValueStore, CACHE_KEY, LANGUAGE_KEY};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Source text -> target language code -> translated text.
pub type TranslationCache = HashMap<String, HashMap<String, String>>;

/// A translation in flight, awaitable by any number of callers.
type PendingTranslation = Shared<BoxFuture<'static, String>>;

/// (source text, target language). A tuple rather than `text:language` so
/// texts containing ':' cannot collide.
type RequestKey = (String, String);

/// Cheaply cloneable handle to one client's translation state.
///
/// Construct one per running client with [`LanguageContext::load`] and hand
/// clones to everything that renders text. Must be used inside a tokio
/// runtime: each network request runs on its own task.
#[derive(Clone)]
pub struct LanguageContext {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn TranslationBackend>,
    store: Arc<dyn KeyValueStore>,
    cache: Mutex<TranslationCache>,
    pending: Mutex<HashMap<RequestKey, PendingTranslation>>,
    language: RwLock<String>,
    outstanding: Mutex<usize>,
    translating: watch::Sender<bool>,
    // Serializes snapshot+write so an older snapshot never lands last
    persist_lock: Mutex<()>,
    metrics: TranslationMetrics,
}

impl LanguageContext {
    /// Restore the cache and selected language from `store`.
    ///
    /// Never fails: an unreadable store or an unparsable cache starts the
    /// session with an empty cache, a missing language with the source
    /// language.
    pub fn load(backend: Arc<dyn TranslationBackend>, store: Arc<dyn KeyValueStore>) -> Self {
        let cache = load_cache(store.as_ref());
        let language = load_language(store.as_ref());

        info!(
            "Translation context ready: {} cached source strings, language '{}'",
            cache.len(),
            language
        );

        let (translating, _) = watch::channel(false);

        Self {
            inner: Arc::new(Inner {
                backend,
                store,
                cache: Mutex::new(cache),
                pending: Mutex::new(HashMap::new()),
                language: RwLock::new(language),
                outstanding: Mutex::new(0),
                translating,
                persist_lock: Mutex::new(()),
                metrics: TranslationMetrics::new(),
            }),
        }
    }

    /// Translate `text` into the selected language.
    ///
    /// Returns `text` unchanged when the selected language is the source
    /// language, when `text` is blank, or when the translation fails.
    pub async fn translate(&self, text: &str) -> String {
        let language = self.language();
        if language == SOURCE_LANGUAGE || text.trim().is_empty() {
            return text.to_string();
        }

        let key: RequestKey = (text.to_string(), language.clone());

        // The completing task writes the cache before leaving the pending
        // map, so checking both under the pending lock sees one or the other.
        let request = {
            let mut pending = lock(&self.inner.pending);

            if let Some(translated) = self.cached_translation(text, &language) {
                self.inner.metrics.record_cache_hit();
                debug!("Translation cache hit for '{}:{}'", text, language);
                return translated;
            }

            match pending.get(&key) {
                Some(in_flight) => {
                    self.inner.metrics.record_deduplicated();
                    debug!("Joining in-flight translation for '{}:{}'", text, language);
                    in_flight.clone()
                }
                None => {
                    self.inner.metrics.record_cache_miss();
                    let request = self.spawn_request(text, &language, key.clone());
                    pending.insert(key, request.clone());
                    request
                }
            }
        };

        request.await
    }

    /// The selected target language code.
    pub fn language(&self) -> String {
        self.inner
            .language
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Select a new target language and persist the choice.
    ///
    /// Any code is accepted. Cached translations for every language are kept,
    /// so switching back is instant.
    pub fn set_language(&self, code: &str) {
        *self
            .inner
            .language
            .write()
            .unwrap_or_else(PoisonError::into_inner) = code.to_string();

        info!("Display language set to '{}'", code);

        if let Err(e) = self.inner.store.set(LANGUAGE_KEY, code) {
            warn!("Failed to persist language selection '{}': {:#}", code, e);
        }
    }

    /// `true` while at least one translation request is outstanding.
    pub fn is_translating(&self) -> bool {
        *lock(&self.inner.outstanding) > 0
    }

    /// Receiver that changes whenever [`is_translating`](Self::is_translating) flips.
    pub fn subscribe_translating(&self) -> watch::Receiver<bool> {
        self.inner.translating.subscribe()
    }

    /// Cached translation of `text` into `language`, if any.
    pub fn cached_translation(&self, text: &str, language: &str) -> Option<String> {
        lock(&self.inner.cache)
            .get(text)
            .and_then(|by_language| by_language.get(language))
            .cloned()
    }

    /// Number of distinct source strings in the cache.
    pub fn cached_text_count(&self) -> usize {
        lock(&self.inner.cache).len()
    }

    pub fn metrics(&self) -> MetricsReport {
        self.inner.metrics.report()
    }

    /// Start the network request for `key` on its own task.
    ///
    /// The task runs to completion even if every caller stops awaiting it,
    /// so a translation already paid for still reaches the cache.
    fn spawn_request(&self, text: &str, language: &str, key: RequestKey) -> PendingTranslation {
        self.inner.begin_request();

        let guard = PendingGuard {
            inner: Arc::clone(&self.inner),
            key,
        };
        let source = text.to_string();
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(inner.fetch(source.clone(), language.to_string(), guard));

        async move {
            match task.await {
                Ok(translated) => translated,
                Err(e) => {
                    warn!("Translation task ended abnormally: {}", e);
                    source
                }
            }
        }
        .boxed()
        .shared()
    }
}

impl Inner {
    async fn fetch(self: Arc<Self>, text: String, language: String, guard: PendingGuard) -> String {
        self.metrics.record_api_call();

        let output = match self.backend.translate(&text, &language).await {
            Ok(translated) => {
                self.remember(&text, &language, &translated);

                // Store writes are blocking I/O; keep them off the async workers
                let inner = Arc::clone(&self);
                if let Err(e) = tokio::task::spawn_blocking(move || inner.persist_cache()).await {
                    warn!("Translation cache persist task failed: {}", e);
                }
                translated
            }
            Err(e) => {
                self.metrics.record_api_failure();
                warn!(
                    "Translation to '{}' failed, showing source text: {}",
                    language, e
                );
                text
            }
        };

        drop(guard);
        output
    }

    fn remember(&self, text: &str, language: &str, translated: &str) {
        lock(&self.cache)
            .entry(text.to_string())
            .or_default()
            .insert(language.to_string(), translated.to_string());
    }

    /// Write the whole cache to the store. Failures only cost persistence.
    ///
    /// Blocks on the store; run it on the blocking pool.
    fn persist_cache(&self) {
        let _persist = lock(&self.persist_lock);

        let snapshot = match serde_json::to_string(&*lock(&self.cache)) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Failed to serialize translation cache: {}", e);
                return;
            }
        };

        if let Err(e) = self.store.set(CACHE_KEY, &snapshot) {
            warn!("Failed to persist translation cache: {:#}", e);
        }
    }

    fn begin_request(&self) {
        let mut outstanding = lock(&self.outstanding);
        *outstanding += 1;
        self.publish_translating(*outstanding);
    }

    fn end_request(&self) {
        let mut outstanding = lock(&self.outstanding);
        *outstanding = outstanding.saturating_sub(1);
        self.publish_translating(*outstanding);
    }

    fn publish_translating(&self, outstanding: usize) {
        let active = outstanding > 0;
        self.translating.send_if_modified(|current| {
            if *current == active {
                return false;
            }
            *current = active;
            true
        });
    }
}

/// Removes a request from the pending map when it settles, including when
/// the backend panics.
struct PendingGuard {
    inner: Arc<Inner>,
    key: RequestKey,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        lock(&self.inner.pending).remove(&self.key);
        self.inner.end_request();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn load_cache(store: &dyn KeyValueStore) -> TranslationCache {
    match store.get(CACHE_KEY) {
        Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
            warn!("Discarding unparsable translation cache: {}", e);
            TranslationCache::new()
        }),
        Ok(None) => TranslationCache::new(),
        Err(e) => {
            warn!("Failed to read translation cache, starting empty: {:#}", e);
            TranslationCache::new()
        }
    }
}

fn load_language(store: &dyn KeyValueStore) -> String {
    match store.get(LANGUAGE_KEY) {
        Ok(Some(code)) if !code.trim().is_empty() => code,
        Ok(_) => SOURCE_LANGUAGE.to_string(),
        Err(e) => {
            warn!("Failed to read language selection: {:#}", e);
            SOURCE_LANGUAGE.to_string()
        }
    }
}
