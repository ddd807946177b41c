//! Running-total propagation - the only code that writes catalog totals.
//!
//! Every ledger operation funnels its effect through the functions in this module,
//! which run on the caller's open transaction. Each adjustment is a single
//! `UPDATE ... SET col = col + delta` statement, so concurrent writers cannot lose
//! updates, and each is checked first so that no total is ever taken below zero.
//! Totals are never clamped: an adjustment that would go negative fails with
//! [`Error::InsufficientStock`] and the surrounding transaction is dropped.

use crate::{
    entities::{Component, Cutting, Product, Production, component, cutting, product, production},
    errors::{Error, Result},
};
use sea_orm::{prelude::*, sea_query::Expr};
use std::{fmt, str::FromStr};
use tracing::debug;

/// Tolerance used when comparing floating-point stock quantities.
pub const EPSILON: f64 = 1e-9;

/// Stock stage of a product: freshly produced, or already cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Produced and not yet cut (`total_new`)
    Uncut,
    /// Moved to cut stock by a cutting run (`total_cut`)
    Cut,
}

impl Stage {
    /// Database representation of the stage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uncut => "uncut",
            Self::Cut => "cut",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "uncut" | "new" => Ok(Self::Uncut),
            "cut" => Ok(Self::Cut),
            other => Err(Error::Config {
                message: format!("Unknown stock stage '{other}', expected 'uncut' or 'cut'"),
            }),
        }
    }
}

/// Changes to apply to a product's running totals in one statement.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProductDelta {
    /// Change of uncut stock
    pub new: f64,
    /// Change of cut stock
    pub cut: f64,
    /// Change of sold quantity
    pub sold: f64,
    /// Change of revenue
    pub revenue: f64,
    /// Change of profit
    pub profit: f64,
}

impl ProductDelta {
    /// Delta that only touches the given stage's stock.
    #[must_use]
    pub fn stage(stage: Stage, quantity: f64) -> Self {
        match stage {
            Stage::Uncut => Self {
                new: quantity,
                ..Self::default()
            },
            Stage::Cut => Self {
                cut: quantity,
                ..Self::default()
            },
        }
    }

    /// The same movement in the opposite direction.
    #[must_use]
    pub fn reversed(self) -> Self {
        Self {
            new: -self.new,
            cut: -self.cut,
            sold: -self.sold,
            revenue: -self.revenue,
            profit: -self.profit,
        }
    }
}

/// Rejects quantities that are zero, negative, or not finite.
pub fn validate_quantity(quantity: f64) -> Result<()> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(Error::InvalidQuantity { quantity });
    }
    Ok(())
}

/// Fails with `InsufficientStock` when `available + delta` would drop below zero.
fn ensure_non_negative(item: &str, available: f64, delta: f64) -> Result<()> {
    if available + delta < -EPSILON {
        return Err(Error::InsufficientStock {
            item: item.to_string(),
            available,
            required: -delta,
        });
    }
    Ok(())
}

/// Loads a component leaf, failing if it is missing or a section.
pub async fn find_component_leaf<C>(db: &C, component_id: i64) -> Result<component::Model>
where
    C: ConnectionTrait,
{
    let component = Component::find_by_id(component_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::ComponentNotFound {
            name: component_id.to_string(),
        })?;

    if !component.is_leaf() {
        return Err(Error::NotALeaf {
            name: component.title,
        });
    }
    Ok(component)
}

/// Loads a product leaf, failing if it is missing or a section.
pub async fn find_product_leaf<C>(db: &C, product_id: i64) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    let product = Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::ProductNotFound {
            name: product_id.to_string(),
        })?;

    if !product.is_leaf() {
        return Err(Error::NotALeaf {
            name: product.title,
        });
    }
    Ok(product)
}

/// Atomically adds `delta` to a component leaf's running total.
///
/// When `allow_negative` is false the adjustment is refused if the total would
/// drop below zero.
pub async fn adjust_component_total<C>(
    db: &C,
    component_id: i64,
    delta: f64,
    allow_negative: bool,
) -> Result<component::Model>
where
    C: ConnectionTrait,
{
    let component = find_component_leaf(db, component_id).await?;
    if !allow_negative {
        ensure_non_negative(&component.title, component.total, delta)?;
    }

    debug!(
        "Component '{}' total {} -> {}",
        component.title,
        component.total,
        component.total + delta
    );

    Component::update_many()
        .col_expr(
            component::Column::Total,
            Expr::col(component::Column::Total).add(delta),
        )
        .filter(component::Column::Id.eq(component_id))
        .exec(db)
        .await?;

    find_component_leaf(db, component_id).await
}

/// Atomically applies a [`ProductDelta`] to a product leaf.
///
/// Uncut stock, cut stock and sold quantity must all stay non-negative.
pub async fn apply_product_delta<C>(
    db: &C,
    product_id: i64,
    delta: ProductDelta,
) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    let product = find_product_leaf(db, product_id).await?;
    ensure_non_negative(&product.title, product.total_new, delta.new)?;
    ensure_non_negative(&product.title, product.total_cut, delta.cut)?;
    ensure_non_negative(&product.title, product.total_sold, delta.sold)?;

    debug!("Product '{}' delta {:?}", product.title, delta);

    Product::update_many()
        .col_expr(
            product::Column::TotalNew,
            Expr::col(product::Column::TotalNew).add(delta.new),
        )
        .col_expr(
            product::Column::TotalCut,
            Expr::col(product::Column::TotalCut).add(delta.cut),
        )
        .col_expr(
            product::Column::TotalSold,
            Expr::col(product::Column::TotalSold).add(delta.sold),
        )
        .col_expr(
            product::Column::TotalRevenue,
            Expr::col(product::Column::TotalRevenue).add(delta.revenue),
        )
        .col_expr(
            product::Column::TotalProfit,
            Expr::col(product::Column::TotalProfit).add(delta.profit),
        )
        .filter(product::Column::Id.eq(product_id))
        .exec(db)
        .await?;

    find_product_leaf(db, product_id).await
}

/// Atomically adds `delta` to the cut counter of a production batch.
///
/// The counter must stay within `0..=quantity`.
pub async fn adjust_production_cut<C>(
    db: &C,
    production_id: i64,
    delta: f64,
) -> Result<production::Model>
where
    C: ConnectionTrait,
{
    let batch = find_production(db, production_id).await?;
    let label = format!("batch {}", batch.series);
    ensure_non_negative(&label, batch.cut, delta)?;
    ensure_non_negative(&label, batch.uncut(), -delta)?;

    Production::update_many()
        .col_expr(
            production::Column::Cut,
            Expr::col(production::Column::Cut).add(delta),
        )
        .filter(production::Column::Id.eq(production_id))
        .exec(db)
        .await?;

    find_production(db, production_id).await
}

/// Atomically adds `delta` to the sold counter of a production batch.
///
/// Uncut sale lines draw on a batch here. The counter may neither go negative
/// nor exceed the batch's unsold uncut units.
pub async fn adjust_production_sold<C>(
    db: &C,
    production_id: i64,
    delta: f64,
) -> Result<production::Model>
where
    C: ConnectionTrait,
{
    let batch = find_production(db, production_id).await?;
    let label = format!("batch {}", batch.series);
    ensure_non_negative(&label, batch.sold, delta)?;
    ensure_non_negative(&label, batch.uncut(), -delta)?;

    Production::update_many()
        .col_expr(
            production::Column::Sold,
            Expr::col(production::Column::Sold).add(delta),
        )
        .filter(production::Column::Id.eq(production_id))
        .exec(db)
        .await?;

    find_production(db, production_id).await
}

/// Atomically adds `delta` to the sold counter of a cutting run.
///
/// The counter must stay within `0..=quantity`.
pub async fn adjust_cutting_sold<C>(db: &C, cutting_id: i64, delta: f64) -> Result<cutting::Model>
where
    C: ConnectionTrait,
{
    let line = find_cutting(db, cutting_id).await?;
    let label = format!("cutting #{}", line.id);
    ensure_non_negative(&label, line.sold, delta)?;
    ensure_non_negative(&label, line.remaining(), -delta)?;

    Cutting::update_many()
        .col_expr(
            cutting::Column::Sold,
            Expr::col(cutting::Column::Sold).add(delta),
        )
        .filter(cutting::Column::Id.eq(cutting_id))
        .exec(db)
        .await?;

    find_cutting(db, cutting_id).await
}

/// Loads a cutting run by id.
pub async fn find_cutting<C>(db: &C, cutting_id: i64) -> Result<cutting::Model>
where
    C: ConnectionTrait,
{
    Cutting::find_by_id(cutting_id)
        .one(db)
        .await?
        .ok_or(Error::RecordNotFound {
            kind: "cutting",
            id: cutting_id,
        })
}

/// Loads a production batch by id.
pub async fn find_production<C>(db: &C, production_id: i64) -> Result<production::Model>
where
    C: ConnectionTrait,
{
    Production::find_by_id(production_id)
        .one(db)
        .await?
        .ok_or(Error::RecordNotFound {
            kind: "production",
            id: production_id,
        })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn test_stage_parsing() {
        assert_eq!("uncut".parse::<Stage>().unwrap(), Stage::Uncut);
        assert_eq!(" Cut ".parse::<Stage>().unwrap(), Stage::Cut);
        assert_eq!("new".parse::<Stage>().unwrap(), Stage::Uncut);
        assert!("sliced".parse::<Stage>().is_err());
        assert_eq!(Stage::Cut.to_string(), "cut");
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1.5).is_ok());
        assert!(matches!(
            validate_quantity(0.0),
            Err(Error::InvalidQuantity { quantity: 0.0 })
        ));
        assert!(validate_quantity(-3.0).is_err());
        assert!(validate_quantity(f64::NAN).is_err());
        assert!(validate_quantity(f64::INFINITY).is_err());
    }

    #[test]
    fn test_product_delta_reversed() {
        let delta = ProductDelta {
            new: -3.0,
            sold: 3.0,
            revenue: 15.0,
            profit: 4.0,
            ..ProductDelta::default()
        };
        let back = delta.reversed();
        assert_eq!(back.new, 3.0);
        assert_eq!(back.cut, 0.0);
        assert_eq!(back.sold, -3.0);
        assert_eq!(back.revenue, -15.0);
        assert_eq!(back.profit, -4.0);
        assert_eq!(ProductDelta::stage(Stage::Cut, 2.0).cut, 2.0);
    }

    #[tokio::test]
    async fn test_adjust_component_missing() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([Vec::<component::Model>::new()])
            .into_connection();

        let result = adjust_component_total(&db, 42, 5.0, false).await;
        assert!(matches!(result, Err(Error::ComponentNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_adjust_component_total() -> Result<()> {
        let (db, component) = setup_with_component().await?;

        let updated = adjust_component_total(&db, component.id, 12.5, false).await?;
        assert_eq!(updated.total, 12.5);

        let updated = adjust_component_total(&db, component.id, -2.5, false).await?;
        assert_eq!(updated.total, 10.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_adjust_component_refuses_negative() -> Result<()> {
        let (db, component) = setup_with_component().await?;
        adjust_component_total(&db, component.id, 3.0, false).await?;

        let result = adjust_component_total(&db, component.id, -4.0, false).await;
        assert!(matches!(
            result,
            Err(Error::InsufficientStock {
                available: 3.0,
                required: 4.0,
                ..
            })
        ));

        // Total untouched after the refusal
        let current = find_component_leaf(&db, component.id).await?;
        assert_eq!(current.total, 3.0);

        // Explicitly allowed negatives go through
        let negative = adjust_component_total(&db, component.id, -4.0, true).await?;
        assert_eq!(negative.total, -1.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_sections_cannot_carry_stock() -> Result<()> {
        let db = setup_test_db().await?;
        let section = create_test_component_section(&db, "Raw").await?;

        let result = adjust_component_total(&db, section.id, 1.0, false).await;
        assert!(matches!(result, Err(Error::NotALeaf { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_product_delta() -> Result<()> {
        let (db, product) = setup_with_product().await?;

        let updated =
            apply_product_delta(&db, product.id, ProductDelta::stage(Stage::Uncut, 10.0)).await?;
        assert_eq!(updated.total_new, 10.0);

        let sale = ProductDelta {
            new: -4.0,
            sold: 4.0,
            revenue: 20.0,
            profit: 6.0,
            ..ProductDelta::default()
        };
        let updated = apply_product_delta(&db, product.id, sale).await?;
        assert_eq!(updated.total_new, 6.0);
        assert_eq!(updated.total_sold, 4.0);
        assert_eq!(updated.total_revenue, 20.0);
        assert_eq!(updated.total_profit, 6.0);

        let result =
            apply_product_delta(&db, product.id, ProductDelta::stage(Stage::Cut, -1.0)).await;
        assert!(matches!(result, Err(Error::InsufficientStock { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_batch_sold_counter_bounds() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        let batch = create_test_production(&db, product.id, 10.0).await?;
        adjust_production_cut(&db, batch.id, 4.0).await?;

        let batch = adjust_production_sold(&db, batch.id, 6.0).await?;
        assert_eq!(batch.sold, 6.0);
        assert_eq!(batch.uncut(), 0.0);

        // Nothing uncut left to sell, and nothing left to cut either
        let result = adjust_production_sold(&db, batch.id, 1.0).await;
        assert!(matches!(result, Err(Error::InsufficientStock { .. })));
        let result = adjust_production_cut(&db, batch.id, 1.0).await;
        assert!(matches!(result, Err(Error::InsufficientStock { .. })));

        let result = adjust_production_sold(&db, batch.id, -7.0).await;
        assert!(matches!(result, Err(Error::InsufficientStock { .. })));
        assert_eq!(adjust_production_sold(&db, batch.id, -6.0).await?.uncut(), 6.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_cutting_sold_counter_bounds() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        let batch = create_test_production(&db, product.id, 10.0).await?;
        let line = create_test_cutting(&db, batch.id, 3.0).await?;

        assert_eq!(adjust_cutting_sold(&db, line.id, 3.0).await?.remaining(), 0.0);
        let result = adjust_cutting_sold(&db, line.id, 0.5).await;
        assert!(matches!(result, Err(Error::InsufficientStock { .. })));

        let result = adjust_cutting_sold(&db, 999, 1.0).await;
        assert!(matches!(result, Err(Error::RecordNotFound { kind: "cutting", .. })));
        Ok(())
    }
}
