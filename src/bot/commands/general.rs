//! General Discord commands - ping, help, and other utility commands.
//! This module contains simple commands that don't require database operations
//! and provide basic bot functionality and operator assistance.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**Workshop Stock Help**\n\
        Every command below updates the running totals automatically.\n\n\
        **Warehouse**\n\
        • `/receive <component> <quantity>` - Records components arriving.\n\
        • `/receive_edit <id> <quantity>` / `/receive_delete <id>` - Corrects a receipt.\n\n\
        **Production**\n\
        • `/produce <product> <quantity> [series]` - Records a batch and consumes its recipe.\n\
        • `/produce_edit <id> <quantity>` / `/produce_delete <id>` - Corrects a batch.\n\
        • `/batches <product>` - Lists batches that still have uncut units.\n\
        • `/cut <batch> <quantity> [session]` - Moves units from uncut to cut stock.\n\
        • `/cut_delete <id>` - Reverses a cutting.\n\n\
        **Sales**\n\
        • `/sell <buyer> <product> <quantity> [stage] [source] [seller]` - Starts a sale.\n\
        • `/sale_add`, `/sale_edit`, `/sale_remove`, `/sale_delete` - Changes a sale.\n\
        • `/pay <sale> <amount> [currency]` / `/pay_delete <id>` - Records or removes a payment.\n\
        • `/sale_show <sale>` - Shows a sale with its balance.\n\n\
        **Reports**\n\
        • `/stock`, `/low_stock`, `/products_report` - Current stock and value.\n\
        • `/sales_report [from] [to]`, `/receipts_report [from] [to]` - Period summaries.\n\
        • `/audit [repair]` - Checks totals against the ledger.\n\n\
        **Catalog**\n\
        • `/component <section|add|edit|delete|list>` - Manage components.\n\
        • `/product <section|add|edit|cost|delete|list>` - Manage products.\n\
        • `/recipe <set|remove|show>` - Manage bills of materials.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
