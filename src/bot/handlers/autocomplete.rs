//! Autocomplete handlers for Discord slash command parameters.
//!
//! This module provides autocomplete functionality for command parameters like
//! component and product titles, so operators pick existing catalog entries
//! instead of typing them out.

use crate::{
    bot::BotData,
    core::{catalog, stock::Stage},
    errors::Error,
};
use std::collections::BTreeSet;

/// Discord autocomplete limit
const MAX_CHOICES: usize = 25;

/// Keeps titles containing `partial` (case-insensitive), sorted and capped at 25.
fn matching<I>(titles: I, partial: &str) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let partial_lower = partial.to_lowercase();
    let mut matching: Vec<String> = titles
        .into_iter()
        .filter(|title| title.to_lowercase().contains(&partial_lower))
        .collect();

    // Sort alphabetically for consistent UX
    matching.sort();
    matching.dedup();
    matching.truncate(MAX_CHOICES);
    matching
}

/// Suggests component leaves (stock items) by title.
pub async fn autocomplete_component(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let Ok(components) = catalog::get_component_leaves(&ctx.data().database).await else {
        return Vec::new();
    };
    matching(components.into_iter().map(|c| c.title), partial)
}

/// Suggests component sections by title.
pub async fn autocomplete_component_section(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let Ok(components) = catalog::get_all_components(&ctx.data().database).await else {
        return Vec::new();
    };
    matching(
        components
            .into_iter()
            .filter(|c| !c.is_leaf())
            .map(|c| c.title),
        partial,
    )
}

/// Suggests product leaves by title.
pub async fn autocomplete_product(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let Ok(products) = catalog::get_product_leaves(&ctx.data().database).await else {
        return Vec::new();
    };
    matching(products.into_iter().map(|p| p.title), partial)
}

/// Suggests product sections by title.
pub async fn autocomplete_product_section(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let Ok(products) = catalog::get_all_products(&ctx.data().database).await else {
        return Vec::new();
    };
    matching(
        products.into_iter().filter(|p| !p.is_leaf()).map(|p| p.title),
        partial,
    )
}

/// Suggests the currencies already used in the catalog plus the default one.
pub async fn autocomplete_currency(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let db = &ctx.data().database;
    let mut currencies = BTreeSet::from([ctx.data().settings.default_currency.clone()]);
    if let Ok(components) = catalog::get_component_leaves(db).await {
        currencies.extend(components.into_iter().map(|c| c.currency));
    }
    if let Ok(products) = catalog::get_product_leaves(db).await {
        currencies.extend(products.into_iter().map(|p| p.currency));
    }
    matching(currencies, partial)
}

/// Suggests the two stock stages.
#[allow(clippy::unused_async)] // poise awaits every autocomplete callback
pub async fn autocomplete_stage(
    _ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    matching(
        [Stage::Uncut, Stage::Cut].map(|stage| stage.as_str().to_string()),
        partial,
    )
}

/// Suggests the supported measurement units.
#[allow(clippy::unused_async)]
pub async fn autocomplete_measurement(
    _ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    matching(catalog::MEASUREMENTS.map(str::to_string), partial)
}
