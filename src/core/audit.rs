//! Ledger audit - Recomputes running totals from the ledger rows.
//!
//! Running totals are maintained incrementally by every ledger operation. This
//! module derives the same figures from scratch, reports any mismatch, and can
//! rewrite the stored totals to match the ledger.

use crate::{
    core::stock::{EPSILON, Stage},
    entities::{
        Component, Cutting, Product, Production, ProductionUsage, Receipt, SaleItem, component,
        cutting, product, production,
    },
    errors::Result,
};
use sea_orm::{ActiveValue::Set, TransactionTrait, prelude::*};
use std::collections::HashMap;
use tracing::{info, warn};

/// A stored total that disagrees with the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Drift {
    /// Table the row lives in
    pub kind: &'static str,
    /// Primary key of the row
    pub id: i64,
    /// Column that disagrees
    pub field: &'static str,
    /// Value currently stored
    pub recorded: f64,
    /// Value derived from the ledger
    pub expected: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct ProductTotals {
    new: f64,
    cut: f64,
    sold: f64,
    revenue: f64,
    profit: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct BatchTotals {
    cut: f64,
    sold: f64,
}

/// Totals derived from the ledger.
#[derive(Debug, Default)]
struct Expected {
    components: HashMap<i64, f64>,
    products: HashMap<i64, ProductTotals>,
    batches: HashMap<i64, BatchTotals>,
    cuttings: HashMap<i64, f64>,
}

async fn expected_totals<C>(db: &C) -> Result<Expected>
where
    C: ConnectionTrait,
{
    let mut expected = Expected::default();

    for receipt in Receipt::find().all(db).await? {
        *expected.components.entry(receipt.component_id).or_default() += receipt.quantity;
    }

    let batches: HashMap<i64, production::Model> = Production::find()
        .all(db)
        .await?
        .into_iter()
        .map(|batch| (batch.id, batch))
        .collect();

    for usage in ProductionUsage::find().all(db).await? {
        if let Some(batch) = batches.get(&usage.production_id) {
            *expected.components.entry(usage.component_id).or_default() -=
                usage.per_unit * batch.quantity;
        }
    }

    for batch in batches.values() {
        expected.products.entry(batch.product_id).or_default().new += batch.quantity;
        expected.batches.entry(batch.id).or_default();
    }

    for line in Cutting::find().all(db).await? {
        expected.batches.entry(line.production_id).or_default().cut += line.quantity;
        expected.cuttings.entry(line.id).or_default();
        if let Some(batch) = batches.get(&line.production_id) {
            let totals = expected.products.entry(batch.product_id).or_default();
            totals.new -= line.quantity;
            totals.cut += line.quantity;
        }
    }

    for item in SaleItem::find().all(db).await? {
        let totals = expected.products.entry(item.product_id).or_default();
        match item.stage.parse::<Stage>()? {
            Stage::Uncut => totals.new -= item.quantity,
            Stage::Cut => totals.cut -= item.quantity,
        }
        if let Some(batch_id) = item.production_id {
            expected.batches.entry(batch_id).or_default().sold += item.quantity;
        }
        if let Some(cutting_id) = item.cutting_id {
            *expected.cuttings.entry(cutting_id).or_default() += item.quantity;
        }
        totals.sold += item.quantity;
        totals.revenue += item.total_price;
        totals.profit += item.profit;
    }

    Ok(expected)
}

fn check(
    drifts: &mut Vec<Drift>,
    kind: &'static str,
    id: i64,
    field: &'static str,
    recorded: f64,
    expected: f64,
) {
    if (recorded - expected).abs() > EPSILON {
        drifts.push(Drift {
            kind,
            id,
            field,
            recorded,
            expected,
        });
    }
}

async fn collect_drift<C>(db: &C) -> Result<Vec<Drift>>
where
    C: ConnectionTrait,
{
    let expected = expected_totals(db).await?;
    let mut drifts = Vec::new();

    for component in Component::find().all(db).await? {
        let total = expected.components.get(&component.id).copied().unwrap_or_default();
        check(&mut drifts, "component", component.id, "total", component.total, total);
    }

    for product in Product::find().all(db).await? {
        let totals = expected.products.get(&product.id).copied().unwrap_or_default();
        check(&mut drifts, "product", product.id, "total_new", product.total_new, totals.new);
        check(&mut drifts, "product", product.id, "total_cut", product.total_cut, totals.cut);
        check(&mut drifts, "product", product.id, "total_sold", product.total_sold, totals.sold);
        check(
            &mut drifts,
            "product",
            product.id,
            "total_revenue",
            product.total_revenue,
            totals.revenue,
        );
        check(
            &mut drifts,
            "product",
            product.id,
            "total_profit",
            product.total_profit,
            totals.profit,
        );
    }

    for batch in Production::find().all(db).await? {
        let totals = expected.batches.get(&batch.id).copied().unwrap_or_default();
        check(&mut drifts, "production", batch.id, "cut", batch.cut, totals.cut);
        check(&mut drifts, "production", batch.id, "sold", batch.sold, totals.sold);
    }

    for line in Cutting::find().all(db).await? {
        let sold = expected.cuttings.get(&line.id).copied().unwrap_or_default();
        check(&mut drifts, "cutting", line.id, "sold", line.sold, sold);
    }

    Ok(drifts)
}

/// Lists every stored total that disagrees with the ledger.
pub async fn find_drift(db: &DatabaseConnection) -> Result<Vec<Drift>> {
    let drifts = collect_drift(db).await?;
    for drift in &drifts {
        warn!(
            "{} #{} {} is {} but the ledger says {}",
            drift.kind, drift.id, drift.field, drift.recorded, drift.expected
        );
    }
    Ok(drifts)
}

/// Rewrites every drifted total from the ledger. Returns the number of rows fixed.
pub async fn rebuild_totals(db: &DatabaseConnection) -> Result<usize> {
    let txn = db.begin().await?;
    let expected = expected_totals(&txn).await?;
    let drifts = collect_drift(&txn).await?;

    let mut fixed = 0;
    for component in Component::find().all(&txn).await? {
        if !drifts.iter().any(|d| d.kind == "component" && d.id == component.id) {
            continue;
        }
        let total = expected.components.get(&component.id).copied().unwrap_or_default();
        let mut row: component::ActiveModel = component.into();
        row.total = Set(total);
        row.update(&txn).await?;
        fixed += 1;
    }

    for product in Product::find().all(&txn).await? {
        if !drifts.iter().any(|d| d.kind == "product" && d.id == product.id) {
            continue;
        }
        let totals = expected.products.get(&product.id).copied().unwrap_or_default();
        let mut row: product::ActiveModel = product.into();
        row.total_new = Set(totals.new);
        row.total_cut = Set(totals.cut);
        row.total_sold = Set(totals.sold);
        row.total_revenue = Set(totals.revenue);
        row.total_profit = Set(totals.profit);
        row.update(&txn).await?;
        fixed += 1;
    }

    for batch in Production::find().all(&txn).await? {
        if !drifts.iter().any(|d| d.kind == "production" && d.id == batch.id) {
            continue;
        }
        let totals = expected.batches.get(&batch.id).copied().unwrap_or_default();
        let mut row: production::ActiveModel = batch.into();
        row.cut = Set(totals.cut);
        row.sold = Set(totals.sold);
        row.update(&txn).await?;
        fixed += 1;
    }

    for line in Cutting::find().all(&txn).await? {
        if !drifts.iter().any(|d| d.kind == "cutting" && d.id == line.id) {
            continue;
        }
        let sold = expected.cuttings.get(&line.id).copied().unwrap_or_default();
        let mut row: cutting::ActiveModel = line.into();
        row.sold = Set(sold);
        row.update(&txn).await?;
        fixed += 1;
    }

    txn.commit().await?;

    info!("Rebuilt totals for {fixed} rows");
    Ok(fixed)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::{catalog, cutting, production as production_ops, receipt, sale};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_empty_ledger_has_no_drift() -> Result<()> {
        let (db, _) = setup_with_product().await?;
        assert!(find_drift(&db).await?.is_empty());
        assert_eq!(rebuild_totals(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_full_workflow_stays_consistent() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        let settings = test_settings();
        let flour = create_test_component(&db, "Flour").await?;
        catalog::set_recipe_item(&db, product.id, flour.id, 0.25).await?;

        let r = receipt::create_receipt(&db, flour.id, 40.0, "u".into()).await?;
        let a = production_ops::create_production(
            &db,
            &settings,
            product.id,
            20.0,
            None,
            "u".into(),
        )
        .await?;
        let b = production_ops::create_production(
            &db,
            &settings,
            product.id,
            8.0,
            None,
            "u".into(),
        )
        .await?;
        production_ops::update_production_quantity(&db, &settings, b.id, 12.0).await?;
        receipt::update_receipt_quantity(&db, r.id, 30.0).await?;

        let (_, cuts) = cutting::create_cutting_run(
            &db,
            "u".into(),
            &[cutting::CuttingInput {
                production_id: a.id,
                quantity: 15.0,
            }],
        )
        .await?;
        let (s, items) = sale::create_sale(
            &db,
            &settings,
            "Ann",
            "Bob",
            "u".into(),
            &[
                sale::SaleItemInput {
                    product_id: product.id,
                    stage: Stage::Cut,
                    quantity: 10.0,
                    source_id: None,
                },
                sale::SaleItemInput {
                    product_id: product.id,
                    stage: Stage::Uncut,
                    quantity: 7.0,
                    source_id: None,
                },
            ],
        )
        .await?;
        // 7 uncut units span the rest of batch a and the start of batch b
        assert_eq!(items.len(), 3);
        sale::update_sale_item_quantity(&db, items[0].id, 12.0).await?;
        sale::add_payment(&db, s.id, 50.0, "sum").await?;
        sale::delete_sale_item(&db, items[1].id).await?;
        sale::delete_sale_item(&db, items[2].id).await?;
        cutting::create_cutting(&db, cuts[0].session_id, b.id, 2.0).await?;

        assert!(find_drift(&db).await?.is_empty());

        let totals = product_totals(&db, product.id).await?;
        assert_eq!(totals.total_new, 32.0 - 17.0);
        assert_eq!(totals.total_cut, 17.0 - 12.0);
        assert_eq!(totals.total_sold, 12.0);
        assert_eq!(total_of_component(&db, flour.id).await?, 30.0 - 0.25 * 32.0);
        assert_eq!(Cutting::find_by_id(cuts[0].id).one(&db).await?.unwrap().sold, 12.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_sold_counters_are_audited() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        let batch = create_test_production(&db, product.id, 10.0).await?;
        let line = create_test_cutting(&db, batch.id, 4.0).await?;
        create_test_sale(&db, product.id, Stage::Uncut, 3.0).await?;
        create_test_sale(&db, product.id, Stage::Cut, 1.0).await?;
        assert!(find_drift(&db).await?.is_empty());

        Production::update_many()
            .col_expr(production::Column::Sold, sea_orm::sea_query::Expr::value(0.0))
            .exec(&db)
            .await?;
        Cutting::update_many()
            .col_expr(crate::entities::cutting::Column::Sold, sea_orm::sea_query::Expr::value(5.0))
            .exec(&db)
            .await?;

        let drifts = find_drift(&db).await?;
        assert_eq!(drifts.len(), 2);
        let drift = drifts.iter().find(|d| d.kind == "production").unwrap();
        assert_eq!((drift.id, drift.field, drift.expected), (batch.id, "sold", 3.0));
        let drift = drifts.iter().find(|d| d.kind == "cutting").unwrap();
        assert_eq!((drift.id, drift.field, drift.expected), (line.id, "sold", 1.0));

        assert_eq!(rebuild_totals(&db).await?, 2);
        assert!(find_drift(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_rebuild_repairs_tampered_totals() -> Result<()> {
        let (db, component) = setup_with_component().await?;
        receipt::create_receipt(&db, component.id, 5.0, "u".into()).await?;

        Component::update_many()
            .col_expr(component::Column::Total, sea_orm::sea_query::Expr::value(99.0))
            .filter(component::Column::Id.eq(component.id))
            .exec(&db)
            .await?;

        let drifts = find_drift(&db).await?;
        assert_eq!(drifts.len(), 1);
        assert_eq!(drifts[0].recorded, 99.0);
        assert_eq!(drifts[0].expected, 5.0);

        assert_eq!(rebuild_totals(&db).await?, 1);
        assert!(find_drift(&db).await?.is_empty());
        assert_eq!(total_of_component(&db, component.id).await?, 5.0);
        Ok(())
    }
}
