//! Language registry: the fixed set of languages the city website offers.
//!
//! The language switcher only presents these languages, and the translation
//! endpoint only accepts them as targets. The translation cache itself is not
//! bound to this list; it stores whatever language code it is asked for.

use std::sync::OnceLock;

/// Code of the language all literal site text is authored in.
pub const SOURCE_LANGUAGE: &str = "en";

/// Configuration for a supported language.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// ISO 639-1 language code (e.g., "en", "es")
    pub code: &'static str,

    /// English name of the language (e.g., "Spanish")
    pub name: &'static str,

    /// Native name of the language (e.g., "Español")
    pub native_name: &'static str,

    /// Whether this is the source language (exactly one is)
    pub is_canonical: bool,

    /// Whether the switcher offers this language
    pub enabled: bool,
}

/// Global, immutable language registry.
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the global language registry instance.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: default_languages(),
        })
    }

    /// Get a language configuration by its code.
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    /// All enabled languages, in switcher order.
    pub fn list_enabled(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().filter(|lang| lang.enabled).collect()
    }

    /// Check if a language code is supported and enabled.
    pub fn is_enabled(&self, code: &str) -> bool {
        self.get_by_code(code)
            .map(|lang| lang.enabled)
            .unwrap_or(false)
    }
}

/// Languages offered by the city website's language switcher.
///
/// These cover the most common languages spoken at home by residents, as
/// required for access to city services.
fn default_languages() -> Vec<LanguageConfig> {
    vec![
        LanguageConfig {
            code: SOURCE_LANGUAGE,
            name: "English",
            native_name: "English",
            is_canonical: true,
            enabled: true,
        },
        LanguageConfig {
            code: "es",
            name: "Spanish",
            native_name: "Español",
            is_canonical: false,
            enabled: true,
        },
        LanguageConfig {
            code: "zh",
            name: "Chinese",
            native_name: "中文",
            is_canonical: false,
            enabled: true,
        },
        LanguageConfig {
            code: "vi",
            name: "Vietnamese",
            native_name: "Tiếng Việt",
            is_canonical: false,
            enabled: true,
        },
        LanguageConfig {
            code: "tl",
            name: "Tagalog",
            native_name: "Tagalog",
            is_canonical: false,
            enabled: true,
        },
        LanguageConfig {
            code: "ko",
            name: "Korean",
            native_name: "한국어",
            is_canonical: false,
            enabled: true,
        },
        LanguageConfig {
            code: "fr",
            name: "French",
            native_name: "Français",
            is_canonical: false,
            enabled: true,
        },
        LanguageConfig {
            code: "ar",
            name: "Arabic",
            native_name: "العربية",
            is_canonical: false,
            enabled: true,
        },
    ]
}
