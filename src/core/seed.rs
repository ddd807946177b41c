//! Initial catalog seeding from config.toml.
//!
//! Sections, leaves and recipe lines that already exist are skipped, so seeding
//! can run on every start without overwriting changes made through the bot.

use crate::{
    config::catalog::{Config, ItemConfig, Settings},
    core::{
        catalog::{self, CatalogEntryInput},
        pricing,
    },
    errors::Result,
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{debug, info, instrument, warn};

/// Counts of rows created by a seeding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Sections created in either catalog
    pub sections: usize,
    /// Leaves created in either catalog
    pub leaves: usize,
    /// Recipe lines created
    pub recipe_lines: usize,
}

fn entry_input(item: &ItemConfig, settings: &Settings) -> CatalogEntryInput {
    CatalogEntryInput {
        title: item.title.clone(),
        price: item.price,
        currency: item
            .currency
            .clone()
            .unwrap_or_else(|| settings.default_currency.clone()),
        measurement: item.measurement.trim().to_lowercase(),
        notification_limit: item
            .notification_limit
            .unwrap_or(settings.default_notification_limit),
    }
}

/// Seeds both catalogs and the recipes described in `config`.
///
/// Runs in one transaction: an invalid entry aborts the whole run.
#[instrument(skip(db, config))]
pub async fn seed_catalog(db: &DatabaseConnection, config: &Config) -> Result<SeedSummary> {
    info!(
        "Seeding catalog: {} component sections, {} product sections, {} recipes",
        config.component_sections.len(),
        config.product_sections.len(),
        config.recipes.len()
    );

    let txn = db.begin().await?;
    let mut summary = SeedSummary::default();

    for section_cfg in &config.component_sections {
        let section = match catalog::get_component_by_title(&txn, &section_cfg.title).await? {
            Some(existing) => existing,
            None => {
                summary.sections += 1;
                catalog::create_component_section(&txn, &section_cfg.title).await?
            }
        };

        for item in &section_cfg.items {
            if catalog::get_component_by_title(&txn, &item.title).await?.is_some() {
                debug!("Component '{}' already exists. Skipping.", item.title);
                continue;
            }
            catalog::create_component(&txn, section.id, entry_input(item, &config.settings))
                .await?;
            summary.leaves += 1;
        }
    }

    for section_cfg in &config.product_sections {
        let section = match catalog::get_product_by_title(&txn, &section_cfg.title).await? {
            Some(existing) => existing,
            None => {
                summary.sections += 1;
                catalog::create_product_section(&txn, &section_cfg.title).await?
            }
        };

        for item in &section_cfg.items {
            if catalog::get_product_by_title(&txn, &item.title).await?.is_some() {
                debug!("Product '{}' already exists. Skipping.", item.title);
                continue;
            }
            let product =
                catalog::create_product(&txn, section.id, entry_input(item, &config.settings))
                    .await?;
            if let Some(cost_price) = item.cost_price {
                catalog::set_product_cost_price(&txn, product.id, cost_price).await?;
            }
            summary.leaves += 1;
        }
    }

    for recipe in &config.recipes {
        let product = catalog::get_product_leaf_by_title(&txn, &recipe.product).await?;
        let existing = pricing::load_recipe(&txn, product.id).await?;

        for line in &recipe.components {
            let component = catalog::get_component_leaf_by_title(&txn, &line.component).await?;
            if existing.iter().any(|(item, _)| item.component_id == component.id) {
                warn!(
                    "Recipe of '{}' already uses '{}'. Keeping the stored quantity.",
                    product.title, component.title
                );
                continue;
            }
            catalog::set_recipe_item(&txn, product.id, component.id, line.quantity).await?;
            summary.recipe_lines += 1;
        }
    }

    txn.commit().await?;

    info!(
        "Finished seeding catalog: {} sections, {} leaves, {} recipe lines created",
        summary.sections, summary.leaves, summary.recipe_lines
    );
    Ok(summary)
}
