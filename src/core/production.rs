//! Production business logic - Turning components into product batches.
//!
//! Recording a batch copies the product's recipe into usage rows and consumes
//! `per_unit * quantity` of every recipe component. Edits and deletes work from
//! that copy, never from the live recipe, so changing a recipe later does not
//! disturb stock already accounted for.

use crate::{
    config::Settings,
    core::{
        pricing,
        stock::{self, EPSILON, ProductDelta, Stage},
    },
    entities::{Production, ProductionUsage, production, production_usage},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Default batch label: the current UTC date.
fn default_series() -> String {
    Utc::now().format("%Y%m%d").to_string()
}

/// Applies `quantity` units worth of a batch's usage snapshot to component stock.
///
/// Positive `quantity` consumes components, negative returns them.
async fn consume_components<C>(
    db: &C,
    usages: &[production_usage::Model],
    quantity: f64,
    allow_negative: bool,
) -> Result<()>
where
    C: ConnectionTrait,
{
    for usage in usages {
        stock::adjust_component_total(
            db,
            usage.component_id,
            -usage.per_unit * quantity,
            allow_negative,
        )
        .await?;
    }
    Ok(())
}

/// Records a production batch.
///
/// # Arguments
/// * `settings` - Workshop settings; `allow_negative_components` decides whether
///   components may be consumed below zero
/// * `product_id` - Product leaf that was produced
/// * `quantity` - Units produced, must be positive
/// * `series` - Batch label; the current date is used when empty
/// * `user_id` - Discord user ID of the operator
pub async fn create_production(
    db: &DatabaseConnection,
    settings: &Settings,
    product_id: i64,
    quantity: f64,
    series: Option<String>,
    user_id: String,
) -> Result<production::Model> {
    stock::validate_quantity(quantity)?;

    let txn = db.begin().await?;

    let product = stock::find_product_leaf(&txn, product_id).await?;
    let recipe = pricing::load_recipe(&txn, product_id).await?;

    let series = series
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(default_series);

    let batch = production::ActiveModel {
        product_id: Set(product_id),
        series: Set(series),
        quantity: Set(quantity),
        cut: Set(0.0),
        sold: Set(0.0),
        created_at: Set(Utc::now()),
        created_by: Set(user_id),
        ..Default::default()
    };
    let batch = batch.insert(&txn).await?;

    let mut usages = Vec::with_capacity(recipe.len());
    for (line, _) in &recipe {
        let usage = production_usage::ActiveModel {
            production_id: Set(batch.id),
            component_id: Set(line.component_id),
            per_unit: Set(line.quantity),
            ..Default::default()
        };
        usages.push(usage.insert(&txn).await?);
    }

    consume_components(&txn, &usages, quantity, settings.allow_negative_components).await?;
    stock::apply_product_delta(&txn, product_id, ProductDelta::stage(Stage::Uncut, quantity))
        .await?;

    txn.commit().await?;

    info!(
        "Production #{} ({}): {} {} of '{}' using {} components",
        batch.id,
        batch.series,
        quantity,
        product.measurement,
        product.title,
        usages.len()
    );
    Ok(batch)
}

/// Retrieves a production batch by its unique ID.
pub async fn get_production_by_id(
    db: &DatabaseConnection,
    production_id: i64,
) -> Result<Option<production::Model>> {
    Production::find_by_id(production_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves all batches of a product, newest first.
pub async fn get_productions_for_product(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<Vec<production::Model>> {
    Production::find()
        .filter(production::Column::ProductId.eq(product_id))
        .order_by_desc(production::Column::CreatedAt)
        .order_by_desc(production::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves batches of a product that still have uncut units, oldest first.
///
/// Uncut sales draw on these batches in this order.
pub async fn get_open_batches<C>(db: &C, product_id: i64) -> Result<Vec<production::Model>>
where
    C: ConnectionTrait,
{
    let batches = Production::find()
        .filter(production::Column::ProductId.eq(product_id))
        .order_by_asc(production::Column::CreatedAt)
        .order_by_asc(production::Column::Id)
        .all(db)
        .await?;

    Ok(batches
        .into_iter()
        .filter(|batch| batch.uncut() > EPSILON)
        .collect())
}

/// Retrieves the component usage snapshot of a batch.
pub async fn get_usages<C>(db: &C, production_id: i64) -> Result<Vec<production_usage::Model>>
where
    C: ConnectionTrait,
{
    ProductionUsage::find()
        .filter(production_usage::Column::ProductionId.eq(production_id))
        .order_by_asc(production_usage::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Changes the quantity of a batch.
///
/// The new quantity may not be lower than what has already been cut from or
/// sold out of the batch. Components are consumed or returned according to the usage snapshot.
pub async fn update_production_quantity(
    db: &DatabaseConnection,
    settings: &Settings,
    production_id: i64,
    new_quantity: f64,
) -> Result<production::Model> {
    stock::validate_quantity(new_quantity)?;

    let txn = db.begin().await?;

    let existing = stock::find_production(&txn, production_id).await?;
    if new_quantity < existing.cut + existing.sold - EPSILON {
        return Err(Error::InUse {
            kind: "production",
            id: production_id,
            reason: format!("{} units already cut and {} sold", existing.cut, existing.sold),
        });
    }

    let delta = new_quantity - existing.quantity;
    let product_id = existing.product_id;
    let usages = get_usages(&txn, production_id).await?;

    let mut batch: production::ActiveModel = existing.into();
    batch.quantity = Set(new_quantity);
    let batch = batch.update(&txn).await?;

    consume_components(&txn, &usages, delta, settings.allow_negative_components).await?;
    stock::apply_product_delta(&txn, product_id, ProductDelta::stage(Stage::Uncut, delta))
        .await?;

    txn.commit().await?;

    info!("Production #{production_id} quantity changed by {delta}");
    Ok(batch)
}

/// Deletes a batch, returning its components and removing its units.
///
/// Refused once anything has been cut from the batch or sold out of it.
pub async fn delete_production(
    db: &DatabaseConnection,
    settings: &Settings,
    production_id: i64,
) -> Result<()> {
    let txn = db.begin().await?;

    let batch = stock::find_production(&txn, production_id).await?;
    if batch.cut > EPSILON || batch.sold > EPSILON {
        return Err(Error::InUse {
            kind: "production",
            id: production_id,
            reason: format!("{} units already cut and {} sold", batch.cut, batch.sold),
        });
    }

    let usages = get_usages(&txn, production_id).await?;
    let product_id = batch.product_id;
    let quantity = batch.quantity;

    stock::apply_product_delta(&txn, product_id, ProductDelta::stage(Stage::Uncut, -quantity))
        .await?;
    consume_components(&txn, &usages, -quantity, settings.allow_negative_components).await?;

    ProductionUsage::delete_many()
        .filter(production_usage::Column::ProductionId.eq(production_id))
        .exec(&txn)
        .await?;
    batch.delete(&txn).await?;

    txn.commit().await?;

    info!("Production #{production_id} deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::{audit, catalog, receipt};
    use crate::test_utils::*;

    /// Product with a two-component recipe and plenty of both components.
    async fn setup_bakery() -> Result<(DatabaseConnection, i64, i64, i64)> {
        let (db, product) = setup_with_product().await?;
        let flour = create_test_component(&db, "Flour").await?;
        let salt = create_test_component(&db, "Salt").await?;
        catalog::set_recipe_item(&db, product.id, flour.id, 0.5).await?;
        catalog::set_recipe_item(&db, product.id, salt.id, 0.1).await?;
        create_test_receipt(&db, flour.id, 100.0).await?;
        create_test_receipt(&db, salt.id, 10.0).await?;
        Ok((db, product.id, flour.id, salt.id))
    }

    #[tokio::test]
    async fn test_production_consumes_recipe() -> Result<()> {
        let (db, product_id, flour_id, salt_id) = setup_bakery().await?;

        let batch = create_production(
            &db,
            &test_settings(),
            product_id,
            20.0,
            Some("A-1".to_string()),
            "user1".to_string(),
        )
        .await?;
        assert_eq!(batch.series, "A-1");
        assert_eq!(batch.cut, 0.0);

        assert_eq!(total_of_component(&db, flour_id).await?, 90.0);
        assert!((total_of_component(&db, salt_id).await? - 8.0).abs() < EPSILON);
        assert_eq!(product_totals(&db, product_id).await?.total_new, 20.0);

        let usages = get_usages(&db, batch.id).await?;
        assert_eq!(usages.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_default_series_is_date() -> Result<()> {
        let (db, product_id, _, _) = setup_bakery().await?;
        let batch = create_production(
            &db,
            &test_settings(),
            product_id,
            1.0,
            Some("   ".to_string()),
            "u".to_string(),
        )
        .await?;
        assert_eq!(batch.series.len(), 8);
        assert!(batch.series.chars().all(|c| c.is_ascii_digit()));
        Ok(())
    }

    #[tokio::test]
    async fn test_production_refused_without_components() -> Result<()> {
        let (db, product_id, flour_id, _) = setup_bakery().await?;

        // 300 units need 150 kg of flour, only 100 on hand
        let result =
            create_production(&db, &test_settings(), product_id, 300.0, None, "u".into()).await;
        assert!(matches!(result, Err(Error::InsufficientStock { .. })));

        assert_eq!(total_of_component(&db, flour_id).await?, 100.0);
        assert_eq!(product_totals(&db, product_id).await?.total_new, 0.0);
        assert!(get_productions_for_product(&db, product_id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_production_with_negative_components_allowed() -> Result<()> {
        let (db, product_id, flour_id, _) = setup_bakery().await?;
        let settings = Settings {
            allow_negative_components: true,
            ..test_settings()
        };

        create_production(&db, &settings, product_id, 300.0, None, "u".into()).await?;
        assert_eq!(total_of_component(&db, flour_id).await?, -50.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_restores_exactly_after_recipe_change() -> Result<()> {
        let (db, product_id, flour_id, salt_id) = setup_bakery().await?;
        let settings = test_settings();

        let batch = create_production(&db, &settings, product_id, 10.0, None, "u".into()).await?;

        // Recipe changes after the batch was recorded
        catalog::set_recipe_item(&db, product_id, flour_id, 2.0).await?;
        catalog::remove_recipe_item(&db, product_id, salt_id).await?;

        delete_production(&db, &settings, batch.id).await?;

        assert_eq!(total_of_component(&db, flour_id).await?, 100.0);
        assert!((total_of_component(&db, salt_id).await? - 10.0).abs() < EPSILON);
        assert_eq!(product_totals(&db, product_id).await?.total_new, 0.0);
        assert!(get_usages(&db, batch.id).await?.is_empty());
        assert!(get_production_by_id(&db, batch.id).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_production_quantity() -> Result<()> {
        let (db, product_id, flour_id, _) = setup_bakery().await?;
        let settings = test_settings();
        let batch = create_production(&db, &settings, product_id, 10.0, None, "u".into()).await?;

        let batch = update_production_quantity(&db, &settings, batch.id, 30.0).await?;
        assert_eq!(batch.quantity, 30.0);
        assert_eq!(total_of_component(&db, flour_id).await?, 85.0);
        assert_eq!(product_totals(&db, product_id).await?.total_new, 30.0);

        update_production_quantity(&db, &settings, batch.id, 4.0).await?;
        assert_eq!(total_of_component(&db, flour_id).await?, 98.0);
        assert_eq!(product_totals(&db, product_id).await?.total_new, 4.0);

        assert!(audit::find_drift(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_cut_batch_is_protected() -> Result<()> {
        let (db, product_id, _, _) = setup_bakery().await?;
        let settings = test_settings();
        let batch = create_production(&db, &settings, product_id, 10.0, None, "u".into()).await?;
        create_test_cutting(&db, batch.id, 6.0).await?;

        let result = delete_production(&db, &settings, batch.id).await;
        assert!(matches!(result, Err(Error::InUse { .. })));

        let result = update_production_quantity(&db, &settings, batch.id, 5.0).await;
        assert!(matches!(result, Err(Error::InUse { .. })));

        // Shrinking down to the cut amount is fine
        let batch = update_production_quantity(&db, &settings, batch.id, 6.0).await?;
        assert_eq!(batch.uncut(), 0.0);
        assert!(get_open_batches(&db, product_id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_shrinking_sold_batch_is_refused() -> Result<()> {
        let (db, product_id, flour_id, _) = setup_bakery().await?;
        let settings = test_settings();
        let batch = create_production(&db, &settings, product_id, 10.0, None, "u".into()).await?;
        create_test_sale(&db, product_id, Stage::Uncut, 8.0).await?;

        // 8 of the batch's units are sold
        let result = update_production_quantity(&db, &settings, batch.id, 5.0).await;
        assert!(matches!(result, Err(Error::InUse { .. })));
        assert_eq!(total_of_component(&db, flour_id).await?, 95.0);

        let result = delete_production(&db, &settings, batch.id).await;
        assert!(matches!(result, Err(Error::InUse { .. })));

        let batch = update_production_quantity(&db, &settings, batch.id, 8.0).await?;
        assert_eq!(batch.sold, 8.0);
        assert_eq!(batch.uncut(), 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_sold_out_batch_leaves_open_batches() -> Result<()> {
        let (db, product_id, _, _) = setup_bakery().await?;
        let settings = test_settings();
        let first = create_production(&db, &settings, product_id, 10.0, None, "u".into()).await?;
        create_test_sale(&db, product_id, Stage::Uncut, 10.0).await?;

        assert_eq!(product_totals(&db, product_id).await?.total_new, 0.0);
        assert!(get_open_batches(&db, product_id).await?.is_empty());
        assert_eq!(stock::find_production(&db, first.id).await?.sold, 10.0);

        let second = create_production(&db, &settings, product_id, 4.0, None, "u".into()).await?;
        let open = get_open_batches(&db, product_id).await?;
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, second.id);

        let result = delete_production(&db, &settings, first.id).await;
        assert!(matches!(result, Err(Error::InUse { .. })));
        assert_eq!(product_totals(&db, product_id).await?.total_new, 4.0);

        // The next sale draws on the new batch
        let line = create_test_sale(&db, product_id, Stage::Uncut, 3.0).await?;
        assert_eq!(line.production_id, Some(second.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_production_without_recipe() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        let batch =
            create_production(&db, &test_settings(), product.id, 5.0, None, "u".into()).await?;
        assert!(get_usages(&db, batch.id).await?.is_empty());
        assert_eq!(product_totals(&db, product.id).await?.total_new, 5.0);

        // Unused receipts of other components are untouched
        let other = create_test_component(&db, "Other").await?;
        receipt::create_receipt(&db, other.id, 1.0, "u".into()).await?;
        assert_eq!(total_of_component(&db, other.id).await?, 1.0);
        Ok(())
    }
}
