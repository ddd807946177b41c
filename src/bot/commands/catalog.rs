//! Catalog Discord commands - `component`, `product` and `recipe`.
//!
//! These commands manage the two catalog trees and the bills of materials that
//! link them. Running totals are never edited here.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, handlers::autocomplete, reject},
        core::{
            catalog::{self, CatalogBranch, CatalogEntryInput, CatalogEntryUpdate},
            pricing,
            report::format_number,
        },
        entities::{component, product},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    /// Maximum embed fields Discord accepts
    const MAX_FIELDS: usize = 25;

    fn branch_field<T>(
        branch: &CatalogBranch<T>,
        title: &str,
        line: impl Fn(&T) -> String,
    ) -> (String, String, bool)
    where
        T: catalog::StockEntry,
    {
        let name = if branch.is_highlighted() {
            format!("⚠️ {title}")
        } else {
            title.to_string()
        };
        let value = if branch.children.is_empty() {
            "(empty)".to_string()
        } else {
            branch.children.iter().map(line).collect::<Vec<_>>().join("\n")
        };
        (name, value, false)
    }

    fn component_line(c: &component::Model) -> String {
        let marker = if c.is_low() { "🔴" } else { "•" };
        format!(
            "{marker} {}: {} {} @ {} {}",
            c.title,
            format_number(c.total),
            c.measurement,
            format_number(c.price),
            c.currency
        )
    }

    fn product_line(p: &product::Model) -> String {
        let marker = if p.is_low() { "🔴" } else { "•" };
        format!(
            "{marker} {}: {} uncut / {} cut {} @ {} {}",
            p.title,
            format_number(p.total_new),
            format_number(p.total_cut),
            p.measurement,
            format_number(p.price),
            p.currency
        )
    }

    // -----------------------------------------------------------------------
    // Components
    // -----------------------------------------------------------------------

    /// Parent command for managing the component catalog.
    #[poise::command(
        slash_command,
        subcommands(
            "component_section",
            "component_add",
            "component_edit",
            "component_delete",
            "component_list"
        )
    )]
    pub async fn component(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Component management command. Available subcommands:\n\
            `/component section` - Create a section\n\
            `/component add` - Add a component to a section\n\
            `/component edit` - Change title, price or limit\n\
            `/component delete` - Delete an unused component or empty section\n\
            `/component list` - Show the component tree";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Creates a component section.
    #[poise::command(slash_command, rename = "section")]
    pub async fn component_section(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Section title (e.g., 'Raw materials')"] title: String,
    ) -> Result<()> {
        match catalog::create_component_section(&ctx.data().database, &title).await {
            Ok(section) => {
                ctx.say(format!("✅ Component section '{}' created.", section.title))
                    .await?;
                Ok(())
            }
            Err(e) => reject(ctx, e).await,
        }
    }

    /// Adds a component to a section.
    #[poise::command(slash_command, rename = "add")]
    pub async fn component_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Section to add the component to"]
        #[autocomplete = "autocomplete::autocomplete_component_section"]
        section: String,
        #[description = "Unique component title"] title: String,
        #[description = "Purchase price per unit"] price: f64,
        #[description = "Measurement unit"]
        #[autocomplete = "autocomplete::autocomplete_measurement"]
        measurement: String,
        #[description = "Price currency (defaults to the workshop currency)"]
        #[autocomplete = "autocomplete::autocomplete_currency"]
        currency: Option<String>,
        #[description = "Warn when stock drops under this amount"] notification_limit: Option<
            f64,
        >,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let settings = &ctx.data().settings;

        let parent = match catalog::get_component_by_title(db, &section).await? {
            Some(parent) => parent,
            None => {
                return reject(ctx, Error::ComponentNotFound { name: section }).await;
            }
        };

        let input = CatalogEntryInput {
            title,
            price,
            currency: currency.unwrap_or_else(|| settings.default_currency.clone()),
            measurement: measurement.trim().to_lowercase(),
            notification_limit: notification_limit
                .unwrap_or(settings.default_notification_limit),
        };

        match catalog::create_component(db, parent.id, input).await {
            Ok(component) => {
                ctx.say(format!(
                    "✅ Component '{}' added to '{}' at {} {} per {}.",
                    component.title,
                    parent.title,
                    format_number(component.price),
                    component.currency,
                    component.measurement
                ))
                .await?;
                Ok(())
            }
            Err(e) => reject(ctx, e).await,
        }
    }

    /// Changes a component's title, price or notification limit.
    #[poise::command(slash_command, rename = "edit")]
    pub async fn component_edit(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Component to edit"]
        #[autocomplete = "autocomplete::autocomplete_component"]
        component: String,
        #[description = "New title"] title: Option<String>,
        #[description = "New purchase price"] price: Option<f64>,
        #[description = "New notification limit"] notification_limit: Option<f64>,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let current = match catalog::get_component_leaf_by_title(db, &component).await {
            Ok(current) => current,
            Err(e) => return reject(ctx, e).await,
        };

        let changes = CatalogEntryUpdate {
            title,
            price,
            notification_limit,
        };
        match catalog::update_component(db, current.id, changes).await {
            Ok(updated) => {
                ctx.say(format!("✅ Component updated: {}", component_line(&updated)))
                    .await?;
                Ok(())
            }
            Err(e) => reject(ctx, e).await,
        }
    }

    /// Deletes a component with no history, or an empty section.
    #[poise::command(slash_command, rename = "delete")]
    pub async fn component_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Component or section title"] title: String,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let Some(target) = catalog::get_component_by_title(db, &title).await? else {
            return reject(ctx, Error::ComponentNotFound { name: title }).await;
        };

        match catalog::delete_component(db, target.id).await {
            Ok(()) => {
                ctx.say(format!("🗑️ Component '{}' deleted.", target.title))
                    .await?;
                Ok(())
            }
            Err(e) => reject(ctx, e).await,
        }
    }

    /// Shows the component tree with current stock.
    #[poise::command(slash_command, rename = "list")]
    pub async fn component_list(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let tree = catalog::component_tree(&ctx.data().database).await?;
        if tree.is_empty() {
            ctx.say("No components yet. Use `/component section` to create a section!")
                .await?;
            return Ok(());
        }

        let mut fields: Vec<_> = tree
            .branches
            .iter()
            .map(|branch| branch_field(branch, &branch.section.title, component_line))
            .collect();
        if !tree.orphans.is_empty() {
            let value = tree.orphans.iter().map(component_line).collect::<Vec<_>>().join("\n");
            fields.push(("No section".to_string(), value, false));
        }
        fields.truncate(MAX_FIELDS);

        let embed = serenity::CreateEmbed::default()
            .title("**Components**")
            .color(0x0058_65F2)
            .fields(fields);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Products
    // -----------------------------------------------------------------------

    /// Parent command for managing the product catalog.
    #[poise::command(
        slash_command,
        subcommands(
            "product_section",
            "product_add",
            "product_edit",
            "product_cost",
            "product_delete",
            "product_list"
        )
    )]
    pub async fn product(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Product management command. Available subcommands:\n\
            `/product section` - Create a section\n\
            `/product add` - Add a product to a section\n\
            `/product edit` - Change title, price or limit\n\
            `/product cost` - Set the purchase cost of a resold product\n\
            `/product delete` - Delete a product with no history or an empty section\n\
            `/product list` - Show the product tree";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Creates a product section.
    #[poise::command(slash_command, rename = "section")]
    pub async fn product_section(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Section title (e.g., 'Bread')"] title: String,
    ) -> Result<()> {
        match catalog::create_product_section(&ctx.data().database, &title).await {
            Ok(section) => {
                ctx.say(format!("✅ Product section '{}' created.", section.title))
                    .await?;
                Ok(())
            }
            Err(e) => reject(ctx, e).await,
        }
    }

    /// Adds a product to a section.
    #[poise::command(slash_command, rename = "add")]
    pub async fn product_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Section to add the product to"]
        #[autocomplete = "autocomplete::autocomplete_product_section"]
        section: String,
        #[description = "Unique product title"] title: String,
        #[description = "Selling price per unit"] price: f64,
        #[description = "Measurement unit"]
        #[autocomplete = "autocomplete::autocomplete_measurement"]
        measurement: String,
        #[description = "Price currency (defaults to the workshop currency)"]
        #[autocomplete = "autocomplete::autocomplete_currency"]
        currency: Option<String>,
        #[description = "Warn when stock drops under this amount"] notification_limit: Option<
            f64,
        >,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let settings = &ctx.data().settings;

        let Some(parent) = catalog::get_product_by_title(db, &section).await? else {
            return reject(ctx, Error::ProductNotFound { name: section }).await;
        };

        let input = CatalogEntryInput {
            title,
            price,
            currency: currency.unwrap_or_else(|| settings.default_currency.clone()),
            measurement: measurement.trim().to_lowercase(),
            notification_limit: notification_limit
                .unwrap_or(settings.default_notification_limit),
        };

        match catalog::create_product(db, parent.id, input).await {
            Ok(product) => {
                ctx.say(format!(
                    "✅ Product '{}' added to '{}' at {} {} per {}.",
                    product.title,
                    parent.title,
                    format_number(product.price),
                    product.currency,
                    product.measurement
                ))
                .await?;
                Ok(())
            }
            Err(e) => reject(ctx, e).await,
        }
    }

    /// Changes a product's title, price or notification limit.
    ///
    /// A new price only applies to sale lines recorded afterwards.
    #[poise::command(slash_command, rename = "edit")]
    pub async fn product_edit(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Product to edit"]
        #[autocomplete = "autocomplete::autocomplete_product"]
        product: String,
        #[description = "New title"] title: Option<String>,
        #[description = "New selling price"] price: Option<f64>,
        #[description = "New notification limit"] notification_limit: Option<f64>,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let current = match catalog::get_product_leaf_by_title(db, &product).await {
            Ok(current) => current,
            Err(e) => return reject(ctx, e).await,
        };

        let changes = CatalogEntryUpdate {
            title,
            price,
            notification_limit,
        };
        match catalog::update_product(db, current.id, changes).await {
            Ok(updated) => {
                ctx.say(format!("✅ Product updated: {}", product_line(&updated)))
                    .await?;
                Ok(())
            }
            Err(e) => reject(ctx, e).await,
        }
    }

    /// Sets the purchase cost of a product that is bought in for resale.
    ///
    /// Sales of a product without a recipe take their cost from this figure.
    #[poise::command(slash_command, rename = "cost")]
    pub async fn product_cost(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Product bought in for resale"]
        #[autocomplete = "autocomplete::autocomplete_product"]
        product: String,
        #[description = "Purchase cost per unit"] cost_price: f64,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let current = match catalog::get_product_leaf_by_title(db, &product).await {
            Ok(current) => current,
            Err(e) => return reject(ctx, e).await,
        };

        match catalog::set_product_cost_price(db, current.id, cost_price).await {
            Ok(updated) => {
                ctx.say(format!(
                    "✅ '{}' now costs {} {} per {} to buy in.",
                    updated.title,
                    format_number(updated.cost_price),
                    updated.currency,
                    updated.measurement
                ))
                .await?;
                Ok(())
            }
            Err(e) => reject(ctx, e).await,
        }
    }

    /// Deletes a product with no history, or an empty section.
    #[poise::command(slash_command, rename = "delete")]
    pub async fn product_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Product or section title"] title: String,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let Some(target) = catalog::get_product_by_title(db, &title).await? else {
            return reject(ctx, Error::ProductNotFound { name: title }).await;
        };

        match catalog::delete_product(db, target.id).await {
            Ok(()) => {
                ctx.say(format!("🗑️ Product '{}' deleted.", target.title))
                    .await?;
                Ok(())
            }
            Err(e) => reject(ctx, e).await,
        }
    }

    /// Shows the product tree with current stock.
    #[poise::command(slash_command, rename = "list")]
    pub async fn product_list(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let tree = catalog::product_tree(&ctx.data().database).await?;
        if tree.is_empty() {
            ctx.say("No products yet. Use `/product section` to create a section!")
                .await?;
            return Ok(());
        }

        let mut fields: Vec<_> = tree
            .branches
            .iter()
            .map(|branch| branch_field(branch, &branch.section.title, product_line))
            .collect();
        if !tree.orphans.is_empty() {
            let value = tree.orphans.iter().map(product_line).collect::<Vec<_>>().join("\n");
            fields.push(("No section".to_string(), value, false));
        }
        fields.truncate(MAX_FIELDS);

        let embed = serenity::CreateEmbed::default()
            .title("**Products**")
            .color(0x0058_65F2)
            .fields(fields);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Recipes
    // -----------------------------------------------------------------------

    /// Parent command for managing bills of materials.
    #[poise::command(
        slash_command,
        subcommands("recipe_set", "recipe_remove", "recipe_show")
    )]
    pub async fn recipe(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Recipe command. Available subcommands:\n\
            `/recipe set` - Set how much of a component one unit needs\n\
            `/recipe remove` - Remove a component from a recipe\n\
            `/recipe show` - Show a recipe with its unit cost";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Sets how much of a component one unit of a product needs.
    #[poise::command(slash_command, rename = "set")]
    pub async fn recipe_set(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Product"]
        #[autocomplete = "autocomplete::autocomplete_product"]
        product: String,
        #[description = "Component"]
        #[autocomplete = "autocomplete::autocomplete_component"]
        component: String,
        #[description = "Component quantity per unit of product"] quantity: f64,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let result = async {
            let product = catalog::get_product_leaf_by_title(db, &product).await?;
            let component = catalog::get_component_leaf_by_title(db, &component).await?;
            catalog::set_recipe_item(db, product.id, component.id, quantity).await?;
            Ok::<_, Error>((product, component))
        }
        .await;

        match result {
            Ok((product, component)) => {
                ctx.say(format!(
                    "✅ One {} of '{}' now uses {} {} of '{}'.",
                    product.measurement,
                    product.title,
                    format_number(quantity),
                    component.measurement,
                    component.title
                ))
                .await?;
                Ok(())
            }
            Err(e) => reject(ctx, e).await,
        }
    }

    /// Removes a component from a product's recipe.
    #[poise::command(slash_command, rename = "remove")]
    pub async fn recipe_remove(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Product"]
        #[autocomplete = "autocomplete::autocomplete_product"]
        product: String,
        #[description = "Component"]
        #[autocomplete = "autocomplete::autocomplete_component"]
        component: String,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let result = async {
            let product = catalog::get_product_leaf_by_title(db, &product).await?;
            let component = catalog::get_component_leaf_by_title(db, &component).await?;
            catalog::remove_recipe_item(db, product.id, component.id).await?;
            Ok::<_, Error>((product, component))
        }
        .await;

        match result {
            Ok((product, component)) => {
                ctx.say(format!(
                    "🗑️ '{}' removed from the recipe of '{}'.",
                    component.title, product.title
                ))
                .await?;
                Ok(())
            }
            Err(e) => reject(ctx, e).await,
        }
    }

    /// Shows a product's recipe and unit cost.
    #[poise::command(slash_command, rename = "show")]
    pub async fn recipe_show(
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

        let recipe = catalog::get_recipe(db, product.id).await?;
        if recipe.is_empty() {
            ctx.say(format!("'{}' has no recipe yet.", product.title))
                .await?;
            return Ok(());
        }

        let markup = ctx.data().settings.cost_markup;
        let raw_cost = pricing::recipe_unit_cost(&recipe);

        let mut text = format!("**Recipe of {}** (per {})\n", product.title, product.measurement);
        for (line, component) in &recipe {
            writeln!(
                text,
                "• {} {} of {} ({} {})",
                format_number(line.quantity),
                component.measurement,
                component.title,
                format_number(line.quantity * component.price),
                component.currency
            )?;
        }
        write!(
            text,
            "\nMaterial cost: {} · with markup ×{markup}: {} · price: {} {}",
            format_number(raw_cost),
            format_number(pricing::with_markup(raw_cost, markup)),
            format_number(product.price),
            product.currency
        )?;

        ctx.say(text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
