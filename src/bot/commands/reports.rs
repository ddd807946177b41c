//! Report Discord commands - stock, valuation, period summaries and audit.
//!
//! Reports are read-only, except `/audit repair:true`, which rewrites drifted
//! running totals from the ledger.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, reject},
        core::{
            audit,
            report::{self, format_amount, format_number, format_totals},
        },
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    /// Maximum embed fields Discord accepts
    const MAX_FIELDS: usize = 25;

    /// Shows every component with its stock and value.
    #[poise::command(slash_command, prefix_command)]
    pub async fn stock(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let stock = report::component_stock_report(&ctx.data().database).await?;
        if stock.lines.is_empty() {
            ctx.say("📦 No components yet. Use `/component add` to create one!")
                .await?;
            return Ok(());
        }

        let mut text = String::from("📦 **Component stock**\n");
        for line in &stock.lines {
            let c = &line.component;
            let marker = if c.is_low() { "🔴" } else { "•" };
            writeln!(
                text,
                "{marker} {}: {} {} = {}",
                c.title,
                format_number(c.total),
                c.measurement,
                format_amount(line.value, &c.currency)
            )?;
        }
        write!(text, "\n**Total value:** {}", format_totals(&stock.totals))?;

        ctx.say(text).await?;
        Ok(())
    }

    /// Lists every component and product under its notification limit.
    #[poise::command(slash_command, prefix_command)]
    pub async fn low_stock(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        match report::low_stock_message(&ctx.data().database).await? {
            Some(message) => ctx.say(message).await?,
            None => ctx.say("✅ All stock is above its limits.").await?,
        };
        Ok(())
    }

    /// Shows product stock, cost, revenue and profit.
    #[poise::command(slash_command, prefix_command)]
    pub async fn products_report(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let markup = ctx.data().settings.cost_markup;
        let products = report::product_report(&ctx.data().database, markup).await?;
        if products.lines.is_empty() {
            ctx.say("📊 No products yet. Use `/product add` to create one!")
                .await?;
            return Ok(());
        }

        let mut embed_fields = Vec::new();
        for line in products.lines.iter().take(MAX_FIELDS) {
            let p = &line.product;
            let mut field_value = String::new();
            writeln!(
                &mut field_value,
                "**Stock:** {} uncut / {} cut {}",
                format_number(p.total_new),
                format_number(p.total_cut),
                p.measurement
            )?;
            writeln!(
                &mut field_value,
                "**Unit cost:** {} · **price:** {}",
                format_amount(line.unit_cost, &p.currency),
                format_amount(p.price, &p.currency)
            )?;
            writeln!(
                &mut field_value,
                "**Value:** {} uncut / {} cut",
                format_number(line.uncut_value),
                format_number(line.cut_value)
            )?;
            write!(
                &mut field_value,
                "**Sold:** {} for {} ({} profit)",
                format_number(p.total_sold),
                format_amount(p.total_revenue, &p.currency),
                format_number(p.total_profit)
            )?;

            let status = if p.is_low() { "🔴 " } else { "" };
            embed_fields.push((format!("{status}{}", p.title), field_value, false));
        }

        let embed = serenity::CreateEmbed::default()
            .title("📊 Product Report")
            .description(format!("Costs include a ×{markup} markup"))
            .color(0x0034_98DB)
            .fields(embed_fields)
            .footer(serenity::CreateEmbedFooter::new(format!(
                "Stock value: {} | Revenue: {} | Profit: {}",
                format_totals(&products.stock_value),
                format_totals(&products.revenue),
                format_totals(&products.profit)
            )));

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    fn period_label(from: Option<&str>, to: Option<&str>) -> String {
        match (from, to) {
            (Some(from), Some(to)) => format!("{from} to {to}"),
            (Some(from), None) => format!("since {from}"),
            (None, Some(to)) => format!("until {to}"),
            (None, None) => "all time".to_string(),
        }
    }

    /// Summarizes sales in a date range.
    #[poise::command(slash_command, prefix_command)]
    pub async fn sales_report(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "First day (YYYY-MM-DD)"] from: Option<String>,
        #[description = "Last day, inclusive (YYYY-MM-DD)"] to: Option<String>,
    ) -> Result<()> {
        let (start, end) = match report::parse_date_range(from.as_deref(), to.as_deref()) {
            Ok(range) => range,
            Err(e) => return reject(ctx, e).await,
        };
        let summary = report::sales_summary(&ctx.data().database, start, end).await?;

        let mut text = format!(
            "🧾 **Sales, {}**\n",
            period_label(from.as_deref(), to.as_deref())
        );
        writeln!(text, "Sales: {}", summary.sale_count)?;
        writeln!(text, "Units sold: {}", format_number(summary.units))?;
        writeln!(text, "Revenue: {}", format_totals(&summary.revenue))?;
        writeln!(text, "Profit: {}", format_totals(&summary.profit))?;
        write!(text, "Paid: {}", format_totals(&summary.paid))?;

        ctx.say(text).await?;
        Ok(())
    }

    /// Summarizes component receipts in a date range.
    #[poise::command(slash_command, prefix_command)]
    pub async fn receipts_report(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "First day (YYYY-MM-DD)"] from: Option<String>,
        #[description = "Last day, inclusive (YYYY-MM-DD)"] to: Option<String>,
    ) -> Result<()> {
        let (start, end) = match report::parse_date_range(from.as_deref(), to.as_deref()) {
            Ok(range) => range,
            Err(e) => return reject(ctx, e).await,
        };
        let summary = report::receipt_summary(&ctx.data().database, start, end).await?;

        let mut text = format!(
            "📥 **Receipts, {}**\n",
            period_label(from.as_deref(), to.as_deref())
        );
        writeln!(text, "Receipts: {}", summary.count)?;
        for (title, quantity) in &summary.quantities {
            writeln!(text, "• {title}: {}", format_number(*quantity))?;
        }
        write!(text, "Spent: {}", format_totals(&summary.totals))?;

        ctx.say(text).await?;
        Ok(())
    }

    /// Checks the running totals against the ledger, optionally repairing them.
    #[poise::command(slash_command, prefix_command)]
    pub async fn audit(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Rewrite drifted totals from the ledger"] repair: Option<bool>,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let drifts = audit::find_drift(db).await?;
        if drifts.is_empty() {
            ctx.say("✅ All running totals match the ledger.").await?;
            return Ok(());
        }

        let mut text = format!("⚠️ **{} totals disagree with the ledger**\n", drifts.len());
        for drift in drifts.iter().take(MAX_FIELDS) {
            writeln!(
                text,
                "• {} #{} {}: stored {}, ledger {}",
                drift.kind,
                drift.id,
                drift.field,
                format_number(drift.recorded),
                format_number(drift.expected)
            )?;
        }

        if repair.unwrap_or(false) {
            let fixed = audit::rebuild_totals(db).await?;
            write!(text, "\n🔧 Repaired {fixed} rows.")?;
        } else {
            text.push_str("\nRun `/audit repair:true` to rewrite them.");
        }

        ctx.say(text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
