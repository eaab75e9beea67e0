use anyhow::Result;
use civic_translate::{config::Config, server};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("civic_translate=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    info!(
        "Starting translation service (model {}, port {})",
        config.openai_model, config.port
    );

    server::serve(config).await
}
