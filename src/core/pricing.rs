//! Price and profit computation.
//!
//! Sale lines snapshot the product's selling price and its unit cost at the time
//! of sale. Unit cost is the recipe rollup (component quantity times component
//! price, summed over the bill of materials) multiplied by the workshop's cost
//! markup. The same markup is used for persisted profit and for reports.
//! Goods bought in for resale have no recipe and cost their `cost_price`.

use crate::{
    entities::{Component, RecipeItem, component, product, recipe_item},
    errors::Result,
};
use sea_orm::prelude::*;

/// `unit_price * quantity`
#[must_use]
pub fn line_total(unit_price: f64, quantity: f64) -> f64 {
    unit_price * quantity
}

/// Profit of a line: revenue minus cost of the units sold.
#[must_use]
pub fn line_profit(total_price: f64, unit_cost: f64, quantity: f64) -> f64 {
    total_price - unit_cost * quantity
}

/// Raw bill-of-materials cost of one unit, without markup.
#[must_use]
pub fn recipe_unit_cost(lines: &[(recipe_item::Model, component::Model)]) -> f64 {
    lines
        .iter()
        .map(|(line, component)| line.quantity * component.price)
        .sum()
}

/// Applies the workshop markup to a raw recipe cost.
#[must_use]
pub fn with_markup(raw_cost: f64, markup: f64) -> f64 {
    raw_cost * markup
}

/// Loads a product's recipe together with the referenced components.
pub async fn load_recipe<C>(
    db: &C,
    product_id: i64,
) -> Result<Vec<(recipe_item::Model, component::Model)>>
where
    C: ConnectionTrait,
{
    let rows = RecipeItem::find()
        .filter(recipe_item::Column::ProductId.eq(product_id))
        .find_also_related(Component)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(line, component)| component.map(|c| (line, c)))
        .collect())
}

/// Unit cost of a product, using current component prices.
///
/// A made product costs its recipe rollup with markup. A product without a
/// recipe costs its purchase `cost_price`, unmarked.
pub async fn product_unit_cost<C>(db: &C, product: &product::Model, markup: f64) -> Result<f64>
where
    C: ConnectionTrait,
{
    let recipe = load_recipe(db, product.id).await?;
    if recipe.is_empty() {
        return Ok(product.cost_price);
    }
    Ok(with_markup(recipe_unit_cost(&recipe), markup))
}
