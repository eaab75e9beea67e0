//! Internationalization (i18n) support shared by the client cache and the
//! translation endpoint.
//!
//! # Architecture
//!
//! - `registry`: the languages the city website offers, and the source language
//! - `language`: `Language` type validated against the registry
//! - `validator`: checks that contact details survive a translation
//! - `metrics`: per-component translation counters
//!
//! # Example
//!
//! ```rust,ignore
//! use civic_translate::i18n::{Language, LanguageRegistry};
//!
//! let spanish = Language::from_code("es")?;
//! let offered = LanguageRegistry::get().list_enabled();
//! ```

mod language;
mod metrics;
mod registry;
mod validator;

pub use language::Language;
pub use metrics::{MetricsReport, TranslationMetrics};
pub use registry::{LanguageConfig, LanguageRegistry, SOURCE_LANGUAGE};
pub use validator::{TranslationValidator, ValidationReport};
