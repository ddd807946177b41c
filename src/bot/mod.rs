//! Bot layer - Discord-specific interface and command handlers
//!
//! This module provides the Discord interface for the workshop stock ledger,
//! including all slash commands, autocomplete handlers, and bot context management.

/// Discord command implementations (catalog, ledger, sales, reports, general)
pub mod commands;
/// Discord interaction handlers (autocomplete, etc.)
pub mod handlers;

use crate::{
    config::Settings,
    core::report,
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use tracing::{error, info, instrument};

/// Shared data available to all bot commands.
/// This structure holds the database connection and the workshop settings
/// that commands need to access.
pub struct BotData {
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Workshop settings loaded from config.toml
    pub settings: Settings,
}

impl BotData {
    /// Creates a new `BotData` instance with the given database connection and settings.
    #[must_use]
    pub const fn new(database: DatabaseConnection, settings: Settings) -> Self {
        Self { database, settings }
    }
}

/// Replies with a user-facing error, or propagates anything else to `on_error`.
pub async fn reject(ctx: poise::Context<'_, BotData, Error>, error: Error) -> Result<()> {
    if error.is_user_facing() {
        ctx.say(format!("❌ {error}")).await?;
        Ok(())
    } else {
        Err(error)
    }
}

/// Sends `message`, followed by the low-stock warning when any leaf is under its limit.
pub async fn say_with_low_stock(
    ctx: poise::Context<'_, BotData, Error>,
    message: String,
) -> Result<()> {
    let warning = report::low_stock_message(&ctx.data().database).await?;
    let text = match warning {
        Some(warning) => format!("{message}\n\n{warning}"),
        None => message,
    };
    ctx.say(text).await?;
    Ok(())
}

/// Display name for a Discord user ID: configured nickname, or the raw ID.
#[must_use]
pub fn operator_name(user_id: &str) -> String {
    crate::config::users::get_nickname(user_id).unwrap_or_else(|| format!("<@{user_id}>"))
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {error:?}");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {:?}", ctx.command().name, error);
            if let Err(e) = ctx.say(format!("An error occurred: {error}")).await {
                error!("Failed to send error message: {e}");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

/// Builds the poise framework, registers every command globally, and runs the
/// client until it stops.
#[instrument(skip(token, data))]
pub async fn run_bot(token: String, data: BotData) -> Result<()> {
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::Client::builder(&token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {e:?}"))?;

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {e:?}"))?;
    Ok(())
}
