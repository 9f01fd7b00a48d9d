use anyhow::Context;
use log::info;
use semantic_book_recommender::{app::Application, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenv::dotenv().ok();

    // Setup logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // Default to info level if RUST_LOG is not set
                "semantic_book_recommender=info,actix_web=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Loading configuration...");
    let config = Config::load().context("Invalid configuration")?;

    // Create and run application
    let application = Application::new(&config);
    application
        .run()
        .await
        .context("Recommendation server failed")?;

    Ok(())
}
