//! Warehouse receipt business logic - Components arriving at the workshop.
//!
//! Creating a receipt adds its quantity to the component's running total, editing
//! it applies the difference, and deleting it takes the quantity back out. Each
//! of these runs in one database transaction together with the total update, so
//! the ledger and the total can never disagree. A receipt whose stock has
//! already been consumed by production cannot be reduced or deleted.

use crate::{
    core::{pricing, stock},
    entities::{Receipt, receipt},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Records components arriving at the warehouse and adds them to stock.
///
/// The component's current price is copied onto the receipt.
///
/// # Arguments
/// * `component_id` - Component leaf that arrived
/// * `quantity` - Amount in the component's measurement unit, must be positive
/// * `user_id` - Discord user ID of the operator
pub async fn create_receipt(
    db: &DatabaseConnection,
    component_id: i64,
    quantity: f64,
    user_id: String,
) -> Result<receipt::Model> {
    stock::validate_quantity(quantity)?;

    let txn = db.begin().await?;

    let component = stock::find_component_leaf(&txn, component_id).await?;

    let receipt = receipt::ActiveModel {
        component_id: Set(component_id),
        quantity: Set(quantity),
        unit_price: Set(component.price),
        total_price: Set(pricing::line_total(component.price, quantity)),
        created_at: Set(Utc::now()),
        created_by: Set(user_id),
        ..Default::default()
    };
    let receipt = receipt.insert(&txn).await?;

    stock::adjust_component_total(&txn, component_id, quantity, false).await?;

    txn.commit().await?;

    info!(
        "Receipt #{}: {} {} of '{}'",
        receipt.id, quantity, component.measurement, component.title
    );
    Ok(receipt)
}

/// Retrieves a receipt by its unique ID.
pub async fn get_receipt_by_id(
    db: &DatabaseConnection,
    receipt_id: i64,
) -> Result<Option<receipt::Model>> {
    Receipt::find_by_id(receipt_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves all receipts of a component, newest first.
pub async fn get_receipts_for_component(
    db: &DatabaseConnection,
    component_id: i64,
) -> Result<Vec<receipt::Model>> {
    Receipt::find()
        .filter(receipt::Column::ComponentId.eq(component_id))
        .order_by_desc(receipt::Column::CreatedAt)
        .order_by_desc(receipt::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves receipts recorded within an optional time range, newest first.
pub async fn get_receipts_between(
    db: &DatabaseConnection,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<Vec<receipt::Model>> {
    let mut query = Receipt::find();
    if let Some(from) = from {
        query = query.filter(receipt::Column::CreatedAt.gte(from));
    }
    if let Some(to) = to {
        query = query.filter(receipt::Column::CreatedAt.lt(to));
    }
    query
        .order_by_desc(receipt::Column::CreatedAt)
        .order_by_desc(receipt::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Changes the quantity of a receipt and applies the difference to stock.
///
/// `total_price` is recomputed from the unit price recorded on the receipt.
pub async fn update_receipt_quantity(
    db: &DatabaseConnection,
    receipt_id: i64,
    new_quantity: f64,
) -> Result<receipt::Model> {
    stock::validate_quantity(new_quantity)?;

    let txn = db.begin().await?;

    let existing = Receipt::find_by_id(receipt_id)
        .one(&txn)
        .await?
        .ok_or(Error::RecordNotFound {
            kind: "receipt",
            id: receipt_id,
        })?;

    let delta = new_quantity - existing.quantity;
    let component_id = existing.component_id;
    let unit_price = existing.unit_price;

    let mut receipt: receipt::ActiveModel = existing.into();
    receipt.quantity = Set(new_quantity);
    receipt.total_price = Set(pricing::line_total(unit_price, new_quantity));
    let receipt = receipt.update(&txn).await?;

    stock::adjust_component_total(&txn, component_id, delta, false).await?;

    txn.commit().await?;

    info!("Receipt #{receipt_id} quantity changed by {delta}");
    Ok(receipt)
}

/// Deletes a receipt and removes its quantity from stock.
pub async fn delete_receipt(db: &DatabaseConnection, receipt_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let receipt = Receipt::find_by_id(receipt_id)
        .one(&txn)
        .await?
        .ok_or(Error::RecordNotFound {
            kind: "receipt",
            id: receipt_id,
        })?;

    let component_id = receipt.component_id;
    let amount_to_reverse = -receipt.quantity;

    receipt.delete(&txn).await?;

    stock::adjust_component_total(&txn, component_id, amount_to_reverse, false).await?;

    txn.commit().await?;

    info!("Receipt #{receipt_id} deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::{audit, catalog};
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_receipt_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        for quantity in [0.0, -1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let result = create_receipt(&db, 1, quantity, "user1".to_string()).await;
            assert!(matches!(result, Err(Error::InvalidQuantity { .. })));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_receipt_lifecycle_keeps_total() -> Result<()> {
        let (db, component) = setup_with_component().await?;

        let receipt = create_receipt(&db, component.id, 10.0, "user1".to_string()).await?;
        assert_eq!(total_of_component(&db, component.id).await?, 10.0);
        assert_eq!(receipt.unit_price, component.price);
        assert_eq!(receipt.total_price, 10.0 * component.price);
        assert_eq!(receipt.created_by, "user1");

        let edited = update_receipt_quantity(&db, receipt.id, 6.0).await?;
        assert_eq!(edited.quantity, 6.0);
        assert_eq!(edited.total_price, 6.0 * component.price);
        assert_eq!(total_of_component(&db, component.id).await?, 6.0);

        delete_receipt(&db, receipt.id).await?;
        assert_eq!(total_of_component(&db, component.id).await?, 0.0);
        assert!(get_receipt_by_id(&db, receipt.id).await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_receipt_price_is_a_snapshot() -> Result<()> {
        let (db, component) = setup_with_component().await?;
        let receipt = create_receipt(&db, component.id, 2.0, "user1".to_string()).await?;

        catalog::update_component(
            &db,
            component.id,
            catalog::CatalogEntryUpdate {
                price: Some(99.0),
                ..Default::default()
            },
        )
        .await?;

        let edited = update_receipt_quantity(&db, receipt.id, 4.0).await?;
        assert_eq!(edited.unit_price, component.price);
        assert_eq!(edited.total_price, 4.0 * component.price);
        Ok(())
    }

    #[tokio::test]
    async fn test_total_matches_ledger_after_mixed_operations() -> Result<()> {
        let (db, component) = setup_with_component().await?;

        let a = create_receipt(&db, component.id, 5.0, "u".to_string()).await?;
        let b = create_receipt(&db, component.id, 7.5, "u".to_string()).await?;
        let c = create_receipt(&db, component.id, 2.0, "u".to_string()).await?;
        update_receipt_quantity(&db, b.id, 3.5).await?;
        delete_receipt(&db, a.id).await?;
        update_receipt_quantity(&db, c.id, 8.0).await?;

        let ledger_sum: f64 = get_receipts_for_component(&db, component.id)
            .await?
            .iter()
            .map(|r| r.quantity)
            .sum();
        assert_eq!(ledger_sum, 11.5);
        assert_eq!(total_of_component(&db, component.id).await?, 11.5);
        assert!(audit::find_drift(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_receipt_cannot_target_section() -> Result<()> {
        let db = setup_test_db().await?;
        let section = create_test_component_section(&db, "Raw").await?;

        let result = create_receipt(&db, section.id, 1.0, "u".to_string()).await;
        assert!(matches!(result, Err(Error::NotALeaf { .. })));

        // Nothing was written
        assert!(get_receipts_between(&db, None, None).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_consumed_receipt_cannot_be_deleted() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        let flour = create_test_component(&db, "Flour").await?;
        catalog::set_recipe_item(&db, product.id, flour.id, 1.0).await?;

        let receipt = create_receipt(&db, flour.id, 10.0, "u".to_string()).await?;
        create_test_production(&db, product.id, 6.0).await?;

        let result = delete_receipt(&db, receipt.id).await;
        assert!(matches!(
            result,
            Err(Error::InsufficientStock {
                available: 4.0,
                required: 10.0,
                ..
            })
        ));

        // The failed delete rolled back: receipt and total intact
        assert!(get_receipt_by_id(&db, receipt.id).await?.is_some());
        assert_eq!(total_of_component(&db, flour.id).await?, 4.0);

        let result = update_receipt_quantity(&db, receipt.id, 5.0).await;
        assert!(matches!(result, Err(Error::InsufficientStock { .. })));
        assert_eq!(get_receipt_by_id(&db, receipt.id).await?.unwrap().quantity, 10.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_receipts_between() -> Result<()> {
        let (db, component) = setup_with_component().await?;
        let before = Utc::now() - chrono::Duration::seconds(1);
        create_receipt(&db, component.id, 1.0, "u".to_string()).await?;
        create_receipt(&db, component.id, 2.0, "u".to_string()).await?;

        assert_eq!(get_receipts_between(&db, Some(before), None).await?.len(), 2);
        assert!(get_receipts_between(&db, None, Some(before)).await?.is_empty());

        let all = get_receipts_for_component(&db, component.id).await?;
        assert_eq!(all[0].quantity, 2.0);
        Ok(())
    }
}
