use dotenvy::dotenv;
use std::env;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use workshop_stock::{
    bot::{self, BotData},
    config::{self, database},
    core::seed,
    errors::{Error, Result},
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the workshop configuration
    let config = config::catalog::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {e}"))?;
    info!(
        "Configuration loaded: markup x{}, default currency '{}'",
        config.settings.cost_markup, config.settings.default_currency
    );

    // 4. Initialize database
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {e}"))?;

    // 5. Seed the catalog from config.toml
    let summary = seed::seed_catalog(&db, &config)
        .await
        .inspect_err(|e| error!("Failed to seed catalog: {e}"))?;
    info!(
        "Catalog seeded: {} sections, {} leaves, {} recipe lines added",
        summary.sections, summary.leaves, summary.recipe_lines
    );

    // 6. Run the bot
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {e}"))
        .map_err(Error::EnvVar)?;

    bot::run_bot(token, BotData::new(db, config.settings)).await
}
