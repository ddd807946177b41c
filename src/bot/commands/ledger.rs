//! Ledger Discord commands - receipts, production batches and cutting.
//!
//! Every command here moves stock. Replies are followed by the low-stock
//! warning whenever a leaf has fallen under its notification limit.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, handlers::autocomplete, reject, say_with_low_stock},
        core::{catalog, cutting, production, receipt, report::format_number},
        errors::{Error, Result},
    };
    use std::fmt::Write;

    // -----------------------------------------------------------------------
    // Receipts
    // -----------------------------------------------------------------------

    /// Records a purchase of a component.
    #[poise::command(slash_command, prefix_command)]
    pub async fn receive(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Component that was bought"]
        #[autocomplete = "autocomplete::autocomplete_component"]
        component: String,
        #[description = "Quantity received"] quantity: f64,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let author_id = ctx.author().id.to_string();

        let component = match catalog::get_component_leaf_by_title(db, &component).await {
            Ok(component) => component,
            Err(e) => return reject(ctx, e).await,
        };

        match receipt::create_receipt(db, component.id, quantity, author_id).await {
            Ok(receipt) => {
                let message = format!(
                    "📥 Receipt #{}: {} {} of '{}' for {} {}.",
                    receipt.id,
                    format_number(receipt.quantity),
                    component.measurement,
                    component.title,
                    format_number(receipt.total_price),
                    component.currency
                );
                say_with_low_stock(ctx, message).await
            }
            Err(e) => reject(ctx, e).await,
        }
    }

    /// Corrects the quantity of a receipt.
    #[poise::command(slash_command, prefix_command)]
    pub async fn receive_edit(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Receipt number"] receipt_id: i64,
        #[description = "Corrected quantity"] quantity: f64,
    ) -> Result<()> {
        match receipt::update_receipt_quantity(&ctx.data().database, receipt_id, quantity).await {
            Ok(receipt) => {
                let message = format!(
                    "✏️ Receipt #{} now holds {} for {}.",
                    receipt.id,
                    format_number(receipt.quantity),
                    format_number(receipt.total_price)
                );
                say_with_low_stock(ctx, message).await
            }
            Err(e) => reject(ctx, e).await,
        }
    }

    /// Deletes a receipt and takes its quantity back out of stock.
    #[poise::command(slash_command, prefix_command)]
    pub async fn receive_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Receipt number"] receipt_id: i64,
    ) -> Result<()> {
        match receipt::delete_receipt(&ctx.data().database, receipt_id).await {
            Ok(()) => say_with_low_stock(ctx, format!("🗑️ Receipt #{receipt_id} deleted.")).await,
            Err(e) => reject(ctx, e).await,
        }
    }

    // -----------------------------------------------------------------------
    // Production
    // -----------------------------------------------------------------------

    /// Records a production batch, consuming components from the recipe.
    #[poise::command(slash_command, prefix_command)]
    pub async fn produce(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Product that was made"]
        #[autocomplete = "autocomplete::autocomplete_product"]
        product: String,
        #[description = "Units produced"] quantity: f64,
        #[description = "Batch series (defaults to today's date)"] series: Option<String>,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let settings = &ctx.data().settings;
        let author_id = ctx.author().id.to_string();

        let product = match catalog::get_product_leaf_by_title(db, &product).await {
            Ok(product) => product,
            Err(e) => return reject(ctx, e).await,
        };

        let batch = match production::create_production(
            db, settings, product.id, quantity, series, author_id,
        )
        .await
        {
            Ok(batch) => batch,
            Err(e) => return reject(ctx, e).await,
        };

        let mut message = format!(
            "🏭 Batch #{} ({}): {} {} of '{}' produced.",
            batch.id,
            batch.series,
            format_number(batch.quantity),
            product.measurement,
            product.title
        );
        let recipe = catalog::get_recipe(db, product.id).await?;
        if recipe.is_empty() {
            message.push_str("\nNo recipe set, so no components were consumed.");
        } else {
            message.push_str("\nConsumed:");
            for (line, component) in &recipe {
                write!(
                    message,
                    "\n• {} {} of {}",
                    format_number(line.quantity * batch.quantity),
                    component.measurement,
                    component.title
                )?;
            }
        }
        say_with_low_stock(ctx, message).await
    }

    /// Corrects the quantity of a production batch.
    #[poise::command(slash_command, prefix_command)]
    pub async fn produce_edit(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Batch number"] batch_id: i64,
        #[description = "Corrected quantity"] quantity: f64,
    ) -> Result<()> {
        let data = ctx.data();
        match production::update_production_quantity(
            &data.database,
            &data.settings,
            batch_id,
            quantity,
        )
        .await
        {
            Ok(batch) => {
                let message = format!(
                    "✏️ Batch #{} now holds {} units ({} cut, {} sold).",
                    batch.id,
                    format_number(batch.quantity),
                    format_number(batch.cut),
                    format_number(batch.sold)
                );
                say_with_low_stock(ctx, message).await
            }
            Err(e) => reject(ctx, e).await,
        }
    }

    /// Deletes an uncut production batch and returns its components to stock.
    #[poise::command(slash_command, prefix_command)]
    pub async fn produce_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Batch number"] batch_id: i64,
    ) -> Result<()> {
        let data = ctx.data();
        match production::delete_production(&data.database, &data.settings, batch_id).await {
            Ok(()) => say_with_low_stock(ctx, format!("🗑️ Batch #{batch_id} deleted.")).await,
            Err(e) => reject(ctx, e).await,
        }
    }

    /// Lists a product's batches that still have uncut units on hand.
    #[poise::command(slash_command, prefix_command)]
    pub async fn batches(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Product"]
        #[autocomplete = "autocomplete::autocomplete_product"]
        product: String,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let product = match catalog::get_product_leaf_by_title(db, &product).await {
            Ok(product) => product,
            Err(e) => return reject(ctx, e).await,
        };

        let open = production::get_open_batches(db, product.id).await?;
        if open.is_empty() {
            ctx.say(format!("No open batches for '{}'.", product.title))
                .await?;
            return Ok(());
        }

        let mut text = format!("**Open batches of {}**\n", product.title);
        for batch in &open {
            writeln!(
                text,
                "• #{} {} ({}): {} of {} uncut, {} cut, {} sold",
                batch.id,
                batch.series,
                batch.created_at.format("%Y-%m-%d"),
                format_number(batch.uncut()),
                format_number(batch.quantity),
                format_number(batch.cut),
                format_number(batch.sold)
            )?;
        }
        ctx.say(text).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Cutting
    // -----------------------------------------------------------------------

    /// Cuts units from a batch, in a new session or an existing one.
    #[poise::command(slash_command, prefix_command)]
    pub async fn cut(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Batch number"] batch_id: i64,
        #[description = "Units to cut"] quantity: f64,
        #[description = "Add to this cutting session instead of starting a new one"]
        session_id: Option<i64>,
    ) -> Result<()> {
        let db = &ctx.data().database;

        let result = match session_id {
            Some(session_id) => cutting::create_cutting(db, session_id, batch_id, quantity)
                .await
                .map(|line| (session_id, line)),
            None => cutting::create_cutting_run(
                db,
                ctx.author().id.to_string(),
                &[cutting::CuttingInput {
                    production_id: batch_id,
                    quantity,
                }],
            )
            .await
            .and_then(|(session, mut lines)| {
                lines
                    .pop()
                    .map(|line| (session.id, line))
                    .ok_or_else(|| Error::RecordNotFound {
                        kind: "cutting",
                        id: batch_id,
                    })
            }),
        };

        match result {
            Ok((session_id, line)) => {
                let batch = production::get_production_by_id(db, batch_id).await?;
                let remaining =
                    batch.as_ref().map_or(0.0, crate::entities::production::Model::uncut);
                let message = format!(
                    "✂️ Session #{session_id}, cutting #{}: {} cut from batch #{batch_id} ({} left uncut).",
                    line.id,
                    format_number(quantity),
                    format_number(remaining)
                );
                say_with_low_stock(ctx, message).await
            }
            Err(e) => reject(ctx, e).await,
        }
    }

    /// Deletes a cutting line, or a whole session when `session` is set.
    #[poise::command(slash_command, prefix_command)]
    pub async fn cut_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Cutting line number (or session number with `session`)"] id: i64,
        #[description = "Delete the whole session"] session: Option<bool>,
    ) -> Result<()> {
        let db = &ctx.data().database;

        let message = if session.unwrap_or(false) {
            match cutting::delete_cutting_session(db, id).await {
                Ok(()) => format!("🗑️ Cutting session #{id} deleted."),
                Err(e) => return reject(ctx, e).await,
            }
        } else {
            match cutting::delete_cutting(db, id).await {
                Ok(true) => format!(
                    "🗑️ Cutting #{id} deleted, its session is now empty and was removed."
                ),
                Ok(false) => format!("🗑️ Cutting #{id} deleted."),
                Err(e) => return reject(ctx, e).await,
            }
        };
        say_with_low_stock(ctx, message).await
    }
}

// Re-export all commands
pub use inner::*;
