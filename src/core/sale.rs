//! Sales business logic - Selling products and recording payments.
//!
//! A sale is a header (buyer, seller) with one or more item lines. Every line
//! draws from one stock stage of one product and carries a price snapshot:
//! `unit_price` is the product's price and `unit_cost` its marked-up recipe cost
//! at the time the line was created. Quantity edits recompute the line from
//! that snapshot. A sale never exists without items: removing the last item
//! removes the sale together with its payments.
//!
//! Each line also names the stock it was sold from. Uncut lines draw on a
//! production batch and cut lines on a cutting run, oldest first unless the
//! caller picks one. A request larger than the oldest source splits into one
//! line per source.

use crate::{
    config::Settings,
    core::{
        pricing,
        production as batches,
        stock::{self, EPSILON, ProductDelta, Stage},
    },
    entities::{
        Cutting, Payment, Production, Sale, SaleItem, cutting, payment, product, production, sale,
        sale_item,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// One requested sale line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaleItemInput {
    /// Product leaf to sell
    pub product_id: i64,
    /// Stock stage to sell from
    pub stage: Stage,
    /// Units to sell
    pub quantity: f64,
    /// Batch (uncut) or cutting run (cut) to sell from; the oldest stock when
    /// None
    pub source_id: Option<i64>,
}

/// Stock a sale line draws on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    /// Uncut units of a production batch
    Batch(i64),
    /// Units of a cutting run
    Cutting(i64),
}

impl Source {
    fn of(item: &sale_item::Model) -> Result<Self> {
        match (item.production_id, item.cutting_id) {
            (Some(id), None) => Ok(Self::Batch(id)),
            (None, Some(id)) => Ok(Self::Cutting(id)),
            _ => Err(Error::Config {
                message: format!("Sale item #{} has no single stock source", item.id),
            }),
        }
    }

    const fn batch_id(self) -> Option<i64> {
        match self {
            Self::Batch(id) => Some(id),
            Self::Cutting(_) => None,
        }
    }

    const fn cutting_id(self) -> Option<i64> {
        match self {
            Self::Cutting(id) => Some(id),
            Self::Batch(_) => None,
        }
    }
}

/// Moves the sold counter of a line's source.
async fn adjust_source<C>(db: &C, source: Source, delta: f64) -> Result<()>
where
    C: ConnectionTrait,
{
    match source {
        Source::Batch(id) => {
            stock::adjust_production_sold(db, id, delta).await?;
        }
        Source::Cutting(id) => {
            stock::adjust_cutting_sold(db, id, delta).await?;
        }
    }
    Ok(())
}

/// Sources the product can still sell from in `stage`, oldest first, with the
/// units each has left.
async fn open_sources<C>(db: &C, product_id: i64, stage: Stage) -> Result<Vec<(Source, f64)>>
where
    C: ConnectionTrait,
{
    let sources = match stage {
        Stage::Uncut => batches::get_open_batches(db, product_id)
            .await?
            .into_iter()
            .map(|batch| (Source::Batch(batch.id), batch.uncut()))
            .collect(),
        Stage::Cut => Cutting::find()
            .inner_join(Production)
            .filter(production::Column::ProductId.eq(product_id))
            .order_by_asc(cutting::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .filter(|line| line.remaining() > EPSILON)
            .map(|line| (Source::Cutting(line.id), line.remaining()))
            .collect(),
    };
    Ok(sources)
}

/// Resolves a source picked by the caller, which must hold the product.
async fn named_source<C>(
    db: &C,
    product: &product::Model,
    stage: Stage,
    source_id: i64,
) -> Result<Source>
where
    C: ConnectionTrait,
{
    let (source, batch) = match stage {
        Stage::Uncut => (Source::Batch(source_id), stock::find_production(db, source_id).await?),
        Stage::Cut => {
            let line = stock::find_cutting(db, source_id).await?;
            (Source::Cutting(source_id), stock::find_production(db, line.production_id).await?)
        }
    };
    if batch.product_id != product.id {
        return Err(Error::Config {
            message: format!("{stage} stock #{source_id} does not hold '{}'", product.title),
        });
    }
    Ok(source)
}

/// Splits `quantity` over `sources` in order, taking each one up to what it has left.
fn allocate(item: &str, sources: &[(Source, f64)], quantity: f64) -> Result<Vec<(Source, f64)>> {
    let mut plan = Vec::new();
    let mut left = quantity;
    for &(source, available) in sources {
        if left <= EPSILON {
            break;
        }
        let take = available.min(left);
        plan.push((source, take));
        left -= take;
    }

    if left > EPSILON {
        return Err(Error::InsufficientStock {
            item: item.to_string(),
            available: sources.iter().map(|(_, available)| available).sum(),
            required: quantity,
        });
    }
    Ok(plan)
}

/// Capitalizes every word of a buyer or seller name.
#[must_use]
pub fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Product totals movement caused by selling `quantity` units of a line.
fn sale_delta(stage: Stage, quantity: f64, revenue: f64, profit: f64) -> ProductDelta {
    ProductDelta {
        sold: quantity,
        revenue,
        profit,
        ..ProductDelta::stage(stage, -quantity)
    }
}

async fn find_sale<C>(db: &C, sale_id: i64) -> Result<sale::Model>
where
    C: ConnectionTrait,
{
    Sale::find_by_id(sale_id)
        .one(db)
        .await?
        .ok_or(Error::RecordNotFound {
            kind: "sale",
            id: sale_id,
        })
}

async fn find_sale_item<C>(db: &C, item_id: i64) -> Result<sale_item::Model>
where
    C: ConnectionTrait,
{
    SaleItem::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or(Error::RecordNotFound {
            kind: "sale item",
            id: item_id,
        })
}

/// Adds `input.quantity` units drawn from one source to a sale.
///
/// If the sale already has a line for the same product, stage and source, that
/// line grows and keeps its original price snapshot.
async fn add_sourced_line<C>(
    db: &C,
    sale_id: i64,
    product: &product::Model,
    input: SaleItemInput,
    source: Source,
    unit_cost: f64,
) -> Result<sale_item::Model>
where
    C: ConnectionTrait,
{
    adjust_source(db, source, input.quantity).await?;

    let query = SaleItem::find()
        .filter(sale_item::Column::SaleId.eq(sale_id))
        .filter(sale_item::Column::ProductId.eq(product.id))
        .filter(sale_item::Column::Stage.eq(input.stage.as_str()));
    let query = match source {
        Source::Batch(id) => query.filter(sale_item::Column::ProductionId.eq(id)),
        Source::Cutting(id) => query.filter(sale_item::Column::CuttingId.eq(id)),
    };

    let item = if let Some(existing) = query.one(db).await? {
        let quantity = existing.quantity + input.quantity;
        let total_price = pricing::line_total(existing.unit_price, quantity);
        let profit = pricing::line_profit(total_price, existing.unit_cost, quantity);
        let delta = sale_delta(
            input.stage,
            input.quantity,
            total_price - existing.total_price,
            profit - existing.profit,
        );

        let mut item: sale_item::ActiveModel = existing.into();
        item.quantity = Set(quantity);
        item.total_price = Set(total_price);
        item.profit = Set(profit);
        let item = item.update(db).await?;

        stock::apply_product_delta(db, product.id, delta).await?;
        item
    } else {
        let total_price = pricing::line_total(product.price, input.quantity);
        let profit = pricing::line_profit(total_price, unit_cost, input.quantity);

        let item = sale_item::ActiveModel {
            sale_id: Set(sale_id),
            product_id: Set(product.id),
            stage: Set(input.stage.as_str().to_string()),
            production_id: Set(source.batch_id()),
            cutting_id: Set(source.cutting_id()),
            quantity: Set(input.quantity),
            unit_price: Set(product.price),
            unit_cost: Set(unit_cost),
            total_price: Set(total_price),
            profit: Set(profit),
            ..Default::default()
        };
        let item = item.insert(db).await?;

        stock::apply_product_delta(
            db,
            product.id,
            sale_delta(input.stage, input.quantity, total_price, profit),
        )
        .await?;
        item
    };

    Ok(item)
}

/// Adds a requested line to a sale inside the caller's transaction.
///
/// Returns one line per source the units were drawn from.
async fn add_item_in<C>(
    db: &C,
    settings: &Settings,
    sale_id: i64,
    input: SaleItemInput,
) -> Result<Vec<sale_item::Model>>
where
    C: ConnectionTrait,
{
    stock::validate_quantity(input.quantity)?;
    let product = stock::find_product_leaf(db, input.product_id).await?;

    let plan = match input.source_id {
        Some(source_id) => {
            let source = named_source(db, &product, input.stage, source_id).await?;
            vec![(source, input.quantity)]
        }
        None => {
            let sources = open_sources(db, product.id, input.stage).await?;
            allocate(&product.title, &sources, input.quantity)?
        }
    };

    let unit_cost = pricing::product_unit_cost(db, &product, settings.cost_markup).await?;
    let mut items = Vec::with_capacity(plan.len());
    for (source, quantity) in plan {
        let part = SaleItemInput { quantity, ..input };
        items.push(add_sourced_line(db, sale_id, &product, part, source, unit_cost).await?);
    }
    Ok(items)
}

/// Reverses a line's effect on its product's totals.
async fn reverse_item<C>(db: &C, item: &sale_item::Model) -> Result<()>
where
    C: ConnectionTrait,
{
    let stage: Stage = item.stage.parse()?;
    let delta = sale_delta(stage, item.quantity, item.total_price, item.profit).reversed();
    stock::apply_product_delta(db, item.product_id, delta).await?;
    adjust_source(db, Source::of(item)?, -item.quantity).await?;
    Ok(())
}

/// Records a sale with its lines in one transaction.
///
/// # Arguments
/// * `settings` - Workshop settings; `cost_markup` is applied to unit costs
/// * `buyer` - Buyer name, stored title-cased
/// * `seller` - Seller name
/// * `user_id` - Discord user ID of the operator
/// * `items` - At least one line
pub async fn create_sale(
    db: &DatabaseConnection,
    settings: &Settings,
    buyer: &str,
    seller: &str,
    user_id: String,
    items: &[SaleItemInput],
) -> Result<(sale::Model, Vec<sale_item::Model>)> {
    if items.is_empty() {
        return Err(Error::Config {
            message: "A sale needs at least one item".to_string(),
        });
    }
    let buyer = title_case(buyer);
    if buyer.is_empty() {
        return Err(Error::Config {
            message: "Buyer name cannot be empty".to_string(),
        });
    }

    let txn = db.begin().await?;

    let sale = sale::ActiveModel {
        buyer: Set(buyer),
        seller: Set(seller.trim().to_string()),
        created_at: Set(Utc::now()),
        created_by: Set(user_id),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut lines = Vec::with_capacity(items.len());
    for input in items {
        lines.extend(add_item_in(&txn, settings, sale.id, *input).await?);
    }

    txn.commit().await?;

    info!(
        "Sale #{} to '{}' recorded with {} items",
        sale.id,
        sale.buyer,
        lines.len()
    );
    Ok((sale, lines))
}

/// Adds a line to an existing sale.
///
/// Returns the lines the units landed on, one per source.
pub async fn add_sale_item(
    db: &DatabaseConnection,
    settings: &Settings,
    sale_id: i64,
    input: SaleItemInput,
) -> Result<Vec<sale_item::Model>> {
    let txn = db.begin().await?;
    find_sale(&txn, sale_id).await?;
    let items = add_item_in(&txn, settings, sale_id, input).await?;
    txn.commit().await?;

    info!(
        "Sale #{sale_id}: {} {} of product #{} added",
        input.quantity, input.stage, input.product_id
    );
    Ok(items)
}

/// Changes the quantity of a sale line.
///
/// Totals are recomputed from the line's price snapshot. The line keeps its
/// source, so it can only grow by what that source has left.
pub async fn update_sale_item_quantity(
    db: &DatabaseConnection,
    item_id: i64,
    new_quantity: f64,
) -> Result<sale_item::Model> {
    stock::validate_quantity(new_quantity)?;

    let txn = db.begin().await?;

    let existing = find_sale_item(&txn, item_id).await?;
    let stage: Stage = existing.stage.parse()?;
    let product_id = existing.product_id;
    adjust_source(&txn, Source::of(&existing)?, new_quantity - existing.quantity).await?;

    let total_price = pricing::line_total(existing.unit_price, new_quantity);
    let profit = pricing::line_profit(total_price, existing.unit_cost, new_quantity);
    let delta = sale_delta(
        stage,
        new_quantity - existing.quantity,
        total_price - existing.total_price,
        profit - existing.profit,
    );

    let mut item: sale_item::ActiveModel = existing.into();
    item.quantity = Set(new_quantity);
    item.total_price = Set(total_price);
    item.profit = Set(profit);
    let item = item.update(&txn).await?;

    stock::apply_product_delta(&txn, product_id, delta).await?;

    txn.commit().await?;

    info!("Sale item #{item_id} quantity set to {new_quantity}");
    Ok(item)
}

/// Deletes a sale line and returns its units to stock.
///
/// Deleting the last line of a sale deletes the sale and its payments.
/// Returns `true` if the sale was removed.
pub async fn delete_sale_item(db: &DatabaseConnection, item_id: i64) -> Result<bool> {
    let txn = db.begin().await?;

    let item = find_sale_item(&txn, item_id).await?;
    let sale_id = item.sale_id;

    reverse_item(&txn, &item).await?;
    item.delete(&txn).await?;

    let remaining = SaleItem::find()
        .filter(sale_item::Column::SaleId.eq(sale_id))
        .count(&txn)
        .await?;
    let sale_removed = remaining == 0;
    if sale_removed {
        Payment::delete_many()
            .filter(payment::Column::SaleId.eq(sale_id))
            .exec(&txn)
            .await?;
        Sale::delete_by_id(sale_id).exec(&txn).await?;
    }

    txn.commit().await?;

    info!("Sale item #{item_id} deleted");
    if sale_removed {
        info!("Sale #{sale_id} had no items left and has been removed");
    }
    Ok(sale_removed)
}

/// Deletes a sale, reversing every line and dropping its payments.
pub async fn delete_sale(db: &DatabaseConnection, sale_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let sale = find_sale(&txn, sale_id).await?;
    let items = SaleItem::find()
        .filter(sale_item::Column::SaleId.eq(sale_id))
        .all(&txn)
        .await?;

    for item in items {
        reverse_item(&txn, &item).await?;
        item.delete(&txn).await?;
    }
    Payment::delete_many()
        .filter(payment::Column::SaleId.eq(sale_id))
        .exec(&txn)
        .await?;
    sale.delete(&txn).await?;

    txn.commit().await?;

    info!("Sale #{sale_id} deleted");
    Ok(())
}

/// Records a payment against a sale.
pub async fn add_payment(
    db: &DatabaseConnection,
    sale_id: i64,
    amount: f64,
    currency: &str,
) -> Result<payment::Model> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    let currency = currency.trim().to_lowercase();
    if currency.is_empty() {
        return Err(Error::Config {
            message: "Payment currency cannot be empty".to_string(),
        });
    }

    find_sale(db, sale_id).await?;

    let payment = payment::ActiveModel {
        sale_id: Set(sale_id),
        amount: Set(amount),
        currency: Set(currency),
        paid_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(
        "Payment #{}: {} {} for sale #{}",
        payment.id, payment.amount, payment.currency, sale_id
    );
    Ok(payment)
}

/// Deletes a payment.
pub async fn delete_payment(db: &DatabaseConnection, payment_id: i64) -> Result<()> {
    let result = Payment::delete_by_id(payment_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::RecordNotFound {
            kind: "payment",
            id: payment_id,
        });
    }
    info!("Payment #{payment_id} deleted");
    Ok(())
}

/// Retrieves a sale by its unique ID.
pub async fn get_sale_by_id(db: &DatabaseConnection, sale_id: i64) -> Result<Option<sale::Model>> {
    Sale::find_by_id(sale_id).one(db).await.map_err(Into::into)
}

/// Retrieves sales within an optional time range, newest first.
pub async fn get_sales_between(
    db: &DatabaseConnection,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<Vec<sale::Model>> {
    let mut query = Sale::find();
    if let Some(from) = from {
        query = query.filter(sale::Column::CreatedAt.gte(from));
    }
    if let Some(to) = to {
        query = query.filter(sale::Column::CreatedAt.lt(to));
    }
    query
        .order_by_desc(sale::Column::CreatedAt)
        .order_by_desc(sale::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves the lines of a sale.
pub async fn get_sale_items(
    db: &DatabaseConnection,
    sale_id: i64,
) -> Result<Vec<sale_item::Model>> {
    SaleItem::find()
        .filter(sale_item::Column::SaleId.eq(sale_id))
        .order_by_asc(sale_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves the payments recorded against a sale.
pub async fn get_payments(db: &DatabaseConnection, sale_id: i64) -> Result<Vec<payment::Model>> {
    Payment::find()
        .filter(payment::Column::SaleId.eq(sale_id))
        .order_by_asc(payment::Column::PaidAt)
        .order_by_asc(payment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::{audit, catalog};
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn uncut(product_id: i64, quantity: f64) -> SaleItemInput {
        SaleItemInput {
            product_id,
            stage: Stage::Uncut,
            quantity,
            source_id: None,
        }
    }

    fn cut(product_id: i64, quantity: f64) -> SaleItemInput {
        SaleItemInput {
            stage: Stage::Cut,
            ..uncut(product_id, quantity)
        }
    }

    #[test]
    fn test_allocate_takes_oldest_first() {
        let sources = [(Source::Batch(1), 4.0), (Source::Batch(2), 10.0)];

        let plan = allocate("Bread", &sources, 3.0).unwrap();
        assert_eq!(plan, vec![(Source::Batch(1), 3.0)]);

        let plan = allocate("Bread", &sources, 6.0).unwrap();
        assert_eq!(plan, vec![(Source::Batch(1), 4.0), (Source::Batch(2), 2.0)]);

        let result = allocate("Bread", &sources, 15.0);
        assert!(matches!(
            result,
            Err(Error::InsufficientStock { available, required, .. })
                if available == 14.0 && required == 15.0
        ));
        assert!(allocate("Bread", &[], 1.0).is_err());
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("  john   SMITH "), "John Smith");
        assert_eq!(title_case("o'neil"), "O'neil");
        assert_eq!(title_case(""), "");
    }

    #[tokio::test]
    async fn test_create_sale_requires_items() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let result = create_sale(&db, &test_settings(), "Ann", "Bob", "u".into(), &[]).await;
        assert!(matches!(result, Err(Error::Config { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_payment_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        for amount in [0.0, -5.0, f64::NAN] {
            let result = add_payment(&db, 1, amount, "sum").await;
            assert!(matches!(result, Err(Error::InvalidAmount { .. })));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_sale_line_totals() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        create_test_production(&db, product.id, 10.0).await?;

        let (sale, items) = create_sale(
            &db,
            &test_settings(),
            "  jane doe",
            "Bob",
            "user1".into(),
            &[uncut(product.id, 3.0)],
        )
        .await?;
        assert_eq!(sale.buyer, "Jane Doe");

        // Test product price is 5.0
        let item = &items[0];
        assert_eq!(item.unit_price, 5.0);
        assert_eq!(item.total_price, 15.0);
        assert_eq!(item.profit, 15.0);
        assert_eq!(item.stage, "uncut");

        let totals = product_totals(&db, product.id).await?;
        assert_eq!(totals.total_new, 7.0);
        assert_eq!(totals.total_sold, 3.0);
        assert_eq!(totals.total_revenue, 15.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_profit_uses_marked_up_recipe_cost() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        let flour = create_custom_component(&db, "Flour", 2.0, "kg").await?;
        catalog::set_recipe_item(&db, product.id, flour.id, 1.0).await?;
        create_test_receipt(&db, flour.id, 10.0).await?;
        create_test_production(&db, product.id, 4.0).await?;

        let settings = Settings {
            cost_markup: 1.5,
            ..test_settings()
        };
        let (_, items) =
            create_sale(&db, &settings, "Ann", "Bob", "u".into(), &[uncut(product.id, 2.0)])
                .await?;

        // unit cost 2.0 * 1.5 = 3.0, revenue 10.0
        assert_eq!(items[0].unit_cost, 3.0);
        assert_eq!(items[0].profit, 4.0);
        assert_eq!(product_totals(&db, product.id).await?.total_profit, 4.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_oversell_leaves_totals_unchanged() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        create_test_production(&db, product.id, 2.0).await?;
        let settings = test_settings();

        let result = create_sale(
            &db,
            &settings,
            "Ann",
            "Bob",
            "u".into(),
            &[uncut(product.id, 1.0), uncut(product.id, 5.0)],
        )
        .await;
        assert!(matches!(result, Err(Error::InsufficientStock { .. })));

        let totals = product_totals(&db, product.id).await?;
        assert_eq!(totals.total_new, 2.0);
        assert_eq!(totals.total_sold, 0.0);
        assert_eq!(totals.total_revenue, 0.0);
        assert!(get_sales_between(&db, None, None).await?.is_empty());

        // Cut stock is separate from uncut stock
        let result = create_sale(
            &db,
            &settings,
            "Ann",
            "Bob",
            "u".into(),
            &[cut(product.id, 1.0)],
        )
        .await;
        assert!(matches!(result, Err(Error::InsufficientStock { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_same_product_and_stage_merge() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        create_test_production(&db, product.id, 10.0).await?;
        let settings = test_settings();
        let (sale, _) =
            create_sale(&db, &settings, "Ann", "Bob", "u".into(), &[uncut(product.id, 1.0)])
                .await?;

        let items = add_sale_item(&db, &settings, sale.id, uncut(product.id, 2.0)).await?;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 3.0);
        assert_eq!(items[0].total_price, 15.0);
        assert_eq!(get_sale_items(&db, sale.id).await?.len(), 1);
        assert_eq!(product_totals(&db, product.id).await?.total_sold, 3.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_price_snapshot_survives_price_change() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        create_test_production(&db, product.id, 10.0).await?;
        let (_, items) = create_sale(
            &db,
            &test_settings(),
            "Ann",
            "Bob",
            "u".into(),
            &[uncut(product.id, 2.0)],
        )
        .await?;

        catalog::update_product(
            &db,
            product.id,
            catalog::CatalogEntryUpdate {
                price: Some(50.0),
                ..Default::default()
            },
        )
        .await?;

        let item = update_sale_item_quantity(&db, items[0].id, 4.0).await?;
        assert_eq!(item.unit_price, 5.0);
        assert_eq!(item.total_price, 20.0);

        let totals = product_totals(&db, product.id).await?;
        assert_eq!(totals.total_new, 6.0);
        assert_eq!(totals.total_sold, 4.0);
        assert_eq!(totals.total_revenue, 20.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_deleting_last_item_deletes_sale() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        create_test_production(&db, product.id, 10.0).await?;
        let batch = create_test_production(&db, product.id, 5.0).await?;
        create_test_cutting(&db, batch.id, 5.0).await?;
        let settings = test_settings();

        let (sale, items) = create_sale(
            &db,
            &settings,
            "Ann",
            "Bob",
            "u".into(),
            &[uncut(product.id, 2.0), cut(product.id, 3.0)],
        )
        .await?;
        add_payment(&db, sale.id, 10.0, "SUM").await?;
        assert_eq!(get_payments(&db, sale.id).await?[0].currency, "sum");

        assert!(!delete_sale_item(&db, items[0].id).await?);
        assert!(get_sale_by_id(&db, sale.id).await?.is_some());

        assert!(delete_sale_item(&db, items[1].id).await?);
        assert!(get_sale_by_id(&db, sale.id).await?.is_none());
        assert!(get_payments(&db, sale.id).await?.is_empty());

        let totals = product_totals(&db, product.id).await?;
        assert_eq!(totals.total_new, 10.0);
        assert_eq!(totals.total_cut, 5.0);
        assert_eq!(totals.total_sold, 0.0);
        assert_eq!(totals.total_revenue, 0.0);
        assert!(audit::find_drift(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_sale_reverses_everything() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        create_test_production(&db, product.id, 10.0).await?;
        let settings = test_settings();
        let (sale, _) =
            create_sale(&db, &settings, "Ann", "Bob", "u".into(), &[uncut(product.id, 4.0)])
                .await?;
        let payment = add_payment(&db, sale.id, 5.0, "usd").await?;

        delete_sale(&db, sale.id).await?;

        let totals = product_totals(&db, product.id).await?;
        assert_eq!(totals.total_new, 10.0);
        assert_eq!(totals.total_sold, 0.0);
        assert!(get_sale_items(&db, sale.id).await?.is_empty());
        assert!(matches!(
            delete_payment(&db, payment.id).await,
            Err(Error::RecordNotFound { .. })
        ));
        assert!(matches!(
            delete_sale(&db, sale.id).await,
            Err(Error::RecordNotFound { kind: "sale", .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_sale_splits_over_oldest_batches() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        let old = create_test_production(&db, product.id, 4.0).await?;
        let new = create_test_production(&db, product.id, 10.0).await?;

        let (sale, items) = create_sale(
            &db,
            &test_settings(),
            "Ann",
            "Bob",
            "u".into(),
            &[uncut(product.id, 6.0)],
        )
        .await?;
        assert_eq!(items.len(), 2);
        assert_eq!((items[0].production_id, items[0].quantity), (Some(old.id), 4.0));
        assert_eq!((items[1].production_id, items[1].quantity), (Some(new.id), 2.0));
        assert!(items.iter().all(|item| item.cutting_id.is_none()));

        let open = batches::get_open_batches(&db, product.id).await?;
        assert_eq!(open.len(), 1);
        assert_eq!((open[0].id, open[0].uncut()), (new.id, 8.0));

        // Returning the old batch's units reopens it
        assert!(!delete_sale_item(&db, items[0].id).await?);
        assert_eq!(stock::find_production(&db, old.id).await?.sold, 0.0);
        assert_eq!(batches::get_open_batches(&db, product.id).await?.len(), 2);
        assert_eq!(get_sale_items(&db, sale.id).await?.len(), 1);
        assert!(audit::find_drift(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_sale_from_named_source() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        let old = create_test_production(&db, product.id, 4.0).await?;
        let new = create_test_production(&db, product.id, 10.0).await?;
        let line = create_test_cutting(&db, new.id, 5.0).await?;
        let settings = test_settings();

        let pick = |input: SaleItemInput, source_id| SaleItemInput {
            source_id: Some(source_id),
            ..input
        };
        let (sale, items) = create_sale(
            &db,
            &settings,
            "Ann",
            "Bob",
            "u".into(),
            &[pick(uncut(product.id, 3.0), new.id), pick(cut(product.id, 2.0), line.id)],
        )
        .await?;
        assert_eq!(items[0].production_id, Some(new.id));
        assert_eq!(items[1].cutting_id, Some(line.id));
        assert_eq!(stock::find_production(&db, old.id).await?.sold, 0.0);
        assert_eq!(stock::find_cutting(&db, line.id).await?.sold, 2.0);

        // Only 2 of the new batch's units are still uncut
        let result =
            add_sale_item(&db, &settings, sale.id, pick(uncut(product.id, 3.0), new.id)).await;
        assert!(matches!(result, Err(Error::InsufficientStock { .. })));

        let other = create_test_product(&db, "Rolls").await?;
        let result =
            add_sale_item(&db, &settings, sale.id, pick(uncut(other.id, 1.0), old.id)).await;
        assert!(matches!(result, Err(Error::Config { .. })));

        let result = add_sale_item(&db, &settings, sale.id, pick(cut(product.id, 1.0), 999)).await;
        assert!(matches!(result, Err(Error::RecordNotFound { kind: "cutting", .. })));
        assert!(audit::find_drift(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_line_grows_only_within_its_source() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        let first = create_test_production(&db, product.id, 3.0).await?;
        create_test_production(&db, product.id, 10.0).await?;

        let item = create_test_sale(&db, product.id, Stage::Uncut, 2.0).await?;
        assert_eq!(item.production_id, Some(first.id));

        // The product has 11 uncut units but the line's batch only 1 more
        let result = update_sale_item_quantity(&db, item.id, 4.0).await;
        assert!(matches!(result, Err(Error::InsufficientStock { .. })));

        let item = update_sale_item_quantity(&db, item.id, 3.0).await?;
        assert_eq!(stock::find_production(&db, first.id).await?.uncut(), 0.0);
        update_sale_item_quantity(&db, item.id, 1.0).await?;
        assert_eq!(stock::find_production(&db, first.id).await?.sold, 1.0);
        assert!(audit::find_drift(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_resold_product_profit_uses_cost_price() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        catalog::set_product_cost_price(&db, product.id, 3.0).await?;
        create_test_production(&db, product.id, 5.0).await?;

        let item = create_test_sale(&db, product.id, Stage::Uncut, 2.0).await?;

        // price 5.0, bought in at 3.0, no markup on a purchase cost
        assert_eq!(item.unit_cost, 3.0);
        assert_eq!(item.total_price, 10.0);
        assert_eq!(item.profit, 4.0);
        assert_eq!(product_totals(&db, product.id).await?.total_profit, 4.0);
        Ok(())
    }
}
