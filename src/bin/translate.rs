//! Translate site strings from the terminal through the translation cache.
//!
//! Usage:
//!   translate "Pay a bill" "Report a concern"   # translate into the saved language
//!   translate --lang es "Submit"                 # switch language, then translate
//!   translate --languages                        # list languages the site offers
//!   translate --status                           # show saved language and cache size
//!
//! Optional environment variables:
//! - TRANSLATE_ENDPOINT (defaults to http://localhost:8080/api/translate)
//! - TRANSLATION_STORE (defaults to .civic-translate.json)
//! - TRANSLATE_TIMEOUT_SECS (defaults to 30)

use anyhow::{bail, Context, Result};
use civic_translate::{
    backend::HttpTranslationBackend,
    config::ClientConfig,
    context::LanguageContext,
    i18n::LanguageRegistry,
    storage::FileStore,
};
use std::sync::Arc;
use tracing::warn;

/// What the command line asked for.
#[derive(Debug, PartialEq)]
enum Command {
    Languages,
    Status,
    Translate(Vec<String>),
}

#[derive(Debug, PartialEq)]
struct Cli {
    /// Language to switch to before running the command
    language: Option<String>,
    command: Command,
}

/// Flags may appear anywhere; `--languages` wins over `--status`, and both
/// win over translating.
fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Cli> {
    let mut args = args.into_iter();
    let mut language = None;
    let mut list_languages = false;
    let mut status = false;
    let mut texts = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--languages" => list_languages = true,
            "--status" => status = true,
            "--lang" => {
                let Some(code) = args.next() else {
                    bail!("--lang requires a language code");
                };
                language = Some(code);
            }
            flag if flag.starts_with("--") => bail!("Unknown option '{}'", flag),
            _ => texts.push(arg),
        }
    }

    let command = if list_languages {
        Command::Languages
    } else if status {
        Command::Status
    } else {
        Command::Translate(texts)
    };

    Ok(Cli { language, command })
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("civic_translate=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args(std::env::args().skip(1))?;

    if cli.command == Command::Languages {
        for lang in LanguageRegistry::get().list_enabled() {
            println!("{}\t{}\t{}", lang.code, lang.name, lang.native_name);
        }
        return Ok(());
    }

    let config = ClientConfig::from_env();
    let backend = HttpTranslationBackend::with_timeout(&config.endpoint, config.timeout)
        .context("Failed to build HTTP client")?;
    let store = FileStore::new(&config.store_path);
    let ctx = LanguageContext::load(Arc::new(backend), Arc::new(store));

    if let Some(code) = &cli.language {
        if !LanguageRegistry::get().is_enabled(code) {
            warn!("'{}' is not one of the site's languages", code);
        }
        ctx.set_language(code);
    }

    match cli.command {
        Command::Languages => {}
        Command::Status => {
            println!("language: {}", ctx.language());
            println!("cached source strings: {}", ctx.cached_text_count());
            println!("endpoint: {}", config.endpoint);
            println!("store: {}", config.store_path);
        }
        Command::Translate(texts) => {
            let translations =
                futures::future::join_all(texts.iter().map(|text| ctx.translate(text))).await;
            for translated in translations {
                println!("{}", translated);
            }
        }
    }

    Ok(())
}
