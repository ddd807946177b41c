//! Sales Discord commands - sales, sale lines and payments.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, handlers::autocomplete, operator_name, reject, say_with_low_stock},
        core::{
            catalog,
            report::{self, format_amount, format_number, format_totals},
            sale::{self, SaleItemInput},
            stock::Stage,
        },
        entities::sale_item,
        errors::{Error, Result},
    };
    use std::fmt::Write;

    /// Resolves a product title and stage name into a sale line input.
    async fn line_input(
        ctx: poise::Context<'_, BotData, Error>,
        product: &str,
        stage: Option<&str>,
        quantity: f64,
        source_id: Option<i64>,
    ) -> Result<(SaleItemInput, String)> {
        let stage = stage.map_or(Ok(Stage::Uncut), str::parse::<Stage>)?;
        let product = catalog::get_product_leaf_by_title(&ctx.data().database, product).await?;
        Ok((
            SaleItemInput {
                product_id: product.id,
                stage,
                quantity,
                source_id,
            },
            product.title,
        ))
    }

    /// Appends one `• line #..` row per sale line to `message`.
    fn write_lines(message: &mut String, lines: &[sale_item::Model], title: &str) -> Result<()> {
        for line in lines {
            let source = match (line.production_id, line.cutting_id) {
                (Some(id), _) => format!("batch #{id}"),
                (None, Some(id)) => format!("cutting #{id}"),
                (None, None) => "no source".to_string(),
            };
            write!(
                message,
                "\n• line #{}: {} {} '{}' from {} × {} = {}",
                line.id,
                format_number(line.quantity),
                line.stage,
                title,
                source,
                format_number(line.unit_price),
                format_number(line.total_price)
            )?;
        }
        Ok(())
    }

    /// Records a sale of one product line. Use `/sale_add` for more lines.
    #[poise::command(slash_command, prefix_command)]
    pub async fn sell(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Buyer name"] buyer: String,
        #[description = "Product sold"]
        #[autocomplete = "autocomplete::autocomplete_product"]
        product: String,
        #[description = "Quantity sold"] quantity: f64,
        #[description = "Stock stage sold from (defaults to uncut)"]
        #[autocomplete = "autocomplete::autocomplete_stage"]
        stage: Option<String>,
        #[description = "Batch (uncut) or cutting (cut) to sell from, oldest by default"]
        source: Option<i64>,
        #[description = "Seller name (defaults to you)"] seller: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let author_id = ctx.author().id.to_string();
        let seller = seller.unwrap_or_else(|| operator_name(&author_id));

        let resolved = line_input(ctx, &product, stage.as_deref(), quantity, source).await;
        let (input, title) = match resolved {
            Ok(resolved) => resolved,
            Err(e) => return reject(ctx, e).await,
        };

        match sale::create_sale(
            &data.database,
            &data.settings,
            &buyer,
            &seller,
            author_id,
            &[input],
        )
        .await
        {
            Ok((sale, lines)) => {
                let mut message =
                    format!("🧾 Sale #{} to {} by {}", sale.id, sale.buyer, sale.seller);
                write_lines(&mut message, &lines, &title)?;
                say_with_low_stock(ctx, message).await
            }
            Err(e) => reject(ctx, e).await,
        }
    }

    /// Adds a product line to an existing sale.
    #[poise::command(slash_command, prefix_command)]
    pub async fn sale_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Sale number"] sale_id: i64,
        #[description = "Product sold"]
        #[autocomplete = "autocomplete::autocomplete_product"]
        product: String,
        #[description = "Quantity sold"] quantity: f64,
        #[description = "Stock stage sold from (defaults to uncut)"]
        #[autocomplete = "autocomplete::autocomplete_stage"]
        stage: Option<String>,
        #[description = "Batch (uncut) or cutting (cut) to sell from, oldest by default"]
        source: Option<i64>,
    ) -> Result<()> {
        let data = ctx.data();
        let resolved = line_input(ctx, &product, stage.as_deref(), quantity, source).await;
        let (input, title) = match resolved {
            Ok(resolved) => resolved,
            Err(e) => return reject(ctx, e).await,
        };

        match sale::add_sale_item(&data.database, &data.settings, sale_id, input).await {
            Ok(lines) => {
                let mut message = format!("🧾 Sale #{sale_id} updated");
                write_lines(&mut message, &lines, &title)?;
                say_with_low_stock(ctx, message).await
            }
            Err(e) => reject(ctx, e).await,
        }
    }

    /// Corrects the quantity of a sale line.
    #[poise::command(slash_command, prefix_command)]
    pub async fn sale_edit(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Sale line number"] line_id: i64,
        #[description = "Corrected quantity"] quantity: f64,
    ) -> Result<()> {
        match sale::update_sale_item_quantity(&ctx.data().database, line_id, quantity).await {
            Ok(line) => {
                let message = format!(
                    "✏️ Line #{} of sale #{} now holds {} for {}.",
                    line.id,
                    line.sale_id,
                    format_number(line.quantity),
                    format_number(line.total_price)
                );
                say_with_low_stock(ctx, message).await
            }
            Err(e) => reject(ctx, e).await,
        }
    }

    /// Removes a sale line and returns its quantity to stock.
    #[poise::command(slash_command, prefix_command)]
    pub async fn sale_remove(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Sale line number"] line_id: i64,
    ) -> Result<()> {
        let message = match sale::delete_sale_item(&ctx.data().database, line_id).await {
            Ok(true) => format!(
                "🗑️ Line #{line_id} removed. It was the last line, so the sale was deleted."
            ),
            Ok(false) => format!("🗑️ Line #{line_id} removed."),
            Err(e) => return reject(ctx, e).await,
        };
        say_with_low_stock(ctx, message).await
    }

    /// Deletes a whole sale with its lines and payments.
    #[poise::command(slash_command, prefix_command)]
    pub async fn sale_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Sale number"] sale_id: i64,
    ) -> Result<()> {
        match sale::delete_sale(&ctx.data().database, sale_id).await {
            Ok(()) => say_with_low_stock(ctx, format!("🗑️ Sale #{sale_id} deleted.")).await,
            Err(e) => reject(ctx, e).await,
        }
    }

    /// Records a payment against a sale.
    #[poise::command(slash_command, prefix_command)]
    pub async fn pay(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Sale number"] sale_id: i64,
        #[description = "Amount paid"] amount: f64,
        #[description = "Payment currency (defaults to the workshop currency)"]
        #[autocomplete = "autocomplete::autocomplete_currency"]
        currency: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let currency = currency.unwrap_or_else(|| data.settings.default_currency.clone());

        let payment = match sale::add_payment(&data.database, sale_id, amount, &currency).await {
            Ok(payment) => payment,
            Err(e) => return reject(ctx, e).await,
        };

        let detail = report::sale_detail(&data.database, sale_id).await?;
        let status = if detail.is_settled() {
            "settled".to_string()
        } else {
            format!("due {}", format_totals(&detail.balance))
        };
        ctx.say(format!(
            "💰 Payment #{} of {} on sale #{sale_id} ({status}).",
            payment.id,
            format_amount(payment.amount, &payment.currency)
        ))
        .await?;
        Ok(())
    }

    /// Deletes a payment.
    #[poise::command(slash_command, prefix_command)]
    pub async fn pay_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Payment number"] payment_id: i64,
    ) -> Result<()> {
        match sale::delete_payment(&ctx.data().database, payment_id).await {
            Ok(()) => {
                ctx.say(format!("🗑️ Payment #{payment_id} deleted.")).await?;
                Ok(())
            }
            Err(e) => reject(ctx, e).await,
        }
    }

    /// Shows a sale with its lines, payments and balance due.
    #[poise::command(slash_command, prefix_command)]
    pub async fn sale_show(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Sale number"] sale_id: i64,
    ) -> Result<()> {
        let data = ctx.data();
        let detail = match report::sale_detail(&data.database, sale_id).await {
            Ok(detail) => detail,
            Err(e) => return reject(ctx, e).await,
        };
        let payments = sale::get_payments(&data.database, sale_id).await?;

        let mut text = format!(
            "**Sale #{}** to {} by {} on {}\n",
            detail.sale.id,
            detail.sale.buyer,
            detail.sale.seller,
            detail.sale.created_at.format("%Y-%m-%d %H:%M")
        );
        for line in &detail.lines {
            writeln!(
                text,
                "• #{} {} {} {} × {} = {}",
                line.item.id,
                format_number(line.item.quantity),
                line.item.stage,
                line.product_title,
                format_number(line.item.unit_price),
                format_amount(line.item.total_price, &line.currency)
            )?;
        }
        writeln!(text, "Total: {}", format_totals(&detail.totals))?;
        for payment in &payments {
            writeln!(
                text,
                "💰 #{} {} on {}",
                payment.id,
                format_amount(payment.amount, &payment.currency),
                payment.paid_at.format("%Y-%m-%d")
            )?;
        }
        write!(text, "Paid: {}", format_totals(&detail.paid))?;
        if detail.is_settled() {
            text.push_str("\n✅ Settled");
        } else {
            write!(text, "\nDue: {}", format_totals(&detail.balance))?;
        }

        ctx.say(text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
