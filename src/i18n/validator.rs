//! Translation quality validation.
//!
//! City pages carry contact details residents act on. A translation that
//! drops or mangles a URL, e-mail address or phone number is worse than no
//! translation, so the service checks these survive and logs mismatches.

use regex::Regex;
use std::sync::OnceLock;

/// Validation report containing errors and warnings about a translation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Critical errors that indicate translation issues
    pub errors: Vec<String>,

    /// Non-critical warnings about potential issues
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// No errors and no warnings
    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }
}

/// Validator for translation quality.
pub struct TranslationValidator;

static URL_REGEX: OnceLock<Regex> = OnceLock::new();
static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
static MARKDOWN_LINK_REGEX: OnceLock<Regex> = OnceLock::new();

impl TranslationValidator {
    /// Validate that a translation preserves the actionable parts of the
    /// original: URLs, e-mail addresses, phone numbers and markdown links.
    ///
    /// Word order changes between languages, so extracted items are compared
    /// as sorted lists.
    pub fn validate(original: &str, translated: &str) -> ValidationReport {
        let mut report = ValidationReport::new();

        if !original.trim().is_empty() && translated.trim().is_empty() {
            report
                .errors
                .push("Translation is empty for non-empty source text".to_string());
            return report;
        }

        let orig_urls = sorted(Self::extract_urls(original));
        let trans_urls = sorted(Self::extract_urls(translated));
        if orig_urls != trans_urls {
            report.warnings.push(format!(
                "URL mismatch: original has {} URLs, translation has {} URLs",
                orig_urls.len(),
                trans_urls.len()
            ));
        }

        let orig_emails = sorted(Self::extract_emails(original));
        let trans_emails = sorted(Self::extract_emails(translated));
        if orig_emails != trans_emails {
            report.warnings.push(format!(
                "E-mail mismatch: original has {:?}, translation has {:?}",
                orig_emails, trans_emails
            ));
        }

        let orig_phones = sorted(Self::extract_phone_numbers(original));
        let trans_phones = sorted(Self::extract_phone_numbers(translated));
        if orig_phones != trans_phones {
            report.warnings.push(format!(
                "Phone number mismatch: original has {:?}, translation has {:?}",
                orig_phones, trans_phones
            ));
        }

        let orig_md_links = Self::extract_markdown_links(original);
        let trans_md_links = Self::extract_markdown_links(translated);
        if orig_md_links.len() != trans_md_links.len() {
            report.warnings.push(format!(
                "Markdown link count mismatch: original has {}, translation has {}",
                orig_md_links.len(),
                trans_md_links.len()
            ));
        }

        report
    }

    fn extract_urls(text: &str) -> Vec<String> {
        let regex = URL_REGEX.get_or_init(|| Regex::new(r#"https?://[^\s)\]<>"]+"#).unwrap());

        regex
            .find_iter(text)
            .map(|m| m.as_str().trim_end_matches(['.', ',']).to_string())
            .collect()
    }

    fn extract_emails(text: &str) -> Vec<String> {
        let regex = EMAIL_REGEX
            .get_or_init(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());

        regex
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .collect()
    }

    /// Phone numbers normalized to their digits, so "(555) 123-4567" and
    /// "555.123.4567" compare equal.
    fn extract_phone_numbers(text: &str) -> Vec<String> {
        let regex = PHONE_REGEX
            .get_or_init(|| Regex::new(r"\(?\b\d{3}\)?[\s.-]?\d{3}[\s.-]\d{4}\b").unwrap());

        regex
            .find_iter(text)
            .map(|m| m.as_str().chars().filter(char::is_ascii_digit).collect())
            .collect()
    }

    fn extract_markdown_links(text: &str) -> Vec<String> {
        let regex =
            MARKDOWN_LINK_REGEX.get_or_init(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());

        regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

fn sorted(mut items: Vec<String>) -> Vec<String> {
    items.sort();
    items
}
