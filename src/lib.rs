//! Cached, deduplicated on-demand translation for the city website.
//!
//! The client side is [`context::LanguageContext`]: it remembers every
//! translation it has fetched, shares one network call between concurrent
//! requests for the same text, and falls back to the English source text
//! whenever anything goes wrong. The server side ([`server`]) answers those
//! requests through an OpenAI-compatible API.

pub mod backend;
pub mod config;
pub mod context;
pub mod i18n;
pub mod retry;
pub mod server;
pub mod storage;
pub mod translation;
