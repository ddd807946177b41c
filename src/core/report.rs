//! Report generation business logic.
//!
//! This module builds stock valuations, product performance figures, receipt
//! and sales summaries, and per-sale statements. All functions return
//! structured data that the bot layer formats; money is always grouped by
//! currency and never summed across currencies.

use crate::{
    core::{catalog, pricing, sale},
    entities::{Component, Product, Receipt, SaleItem, component, product, receipt, sale_item},
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{QueryOrder, prelude::*};
use std::{
    collections::{BTreeMap, HashMap},
    fmt::Write,
};

/// Money totals keyed by currency code.
pub type CurrencyTotals = BTreeMap<String, f64>;

/// One component leaf in the stock valuation.
#[derive(Debug, Clone)]
pub struct ComponentStockLine {
    /// The component
    pub component: component::Model,
    /// `total * price`
    pub value: f64,
}

/// Stock valuation of every component leaf.
#[derive(Debug, Clone, Default)]
pub struct ComponentStockReport {
    /// Leaves sorted by title
    pub lines: Vec<ComponentStockLine>,
    /// Sum of `value` per currency
    pub totals: CurrencyTotals,
}

/// One product leaf with its performance figures.
#[derive(Debug, Clone)]
pub struct ProductReportLine {
    /// The product (carries uncut, cut and sold counts, revenue and profit)
    pub product: product::Model,
    /// Recipe cost per unit including markup
    pub unit_cost: f64,
    /// `total_new * price`
    pub uncut_value: f64,
    /// `total_cut * price`
    pub cut_value: f64,
}

/// Performance of every product leaf.
#[derive(Debug, Clone, Default)]
pub struct ProductReport {
    /// Leaves sorted by title
    pub lines: Vec<ProductReportLine>,
    /// On-hand value per currency
    pub stock_value: CurrencyTotals,
    /// Revenue per currency
    pub revenue: CurrencyTotals,
    /// Profit per currency
    pub profit: CurrencyTotals,
}

/// Receipts within a period.
#[derive(Debug, Clone, Default)]
pub struct ReceiptSummary {
    /// Number of receipts
    pub count: usize,
    /// Quantity received per component title
    pub quantities: BTreeMap<String, f64>,
    /// Purchase value per currency
    pub totals: CurrencyTotals,
}

/// Sales within a period.
#[derive(Debug, Clone, Default)]
pub struct SalesSummary {
    /// Number of sales
    pub sale_count: usize,
    /// Units sold
    pub units: f64,
    /// Revenue per currency
    pub revenue: CurrencyTotals,
    /// Profit per currency
    pub profit: CurrencyTotals,
    /// Payments received per currency
    pub paid: CurrencyTotals,
}

/// A sale line with its product title.
#[derive(Debug, Clone)]
pub struct SaleDetailLine {
    /// The line
    pub item: sale_item::Model,
    /// Product title, or `#id` if the product no longer resolves
    pub product_title: String,
    /// Currency of the product price
    pub currency: String,
}

/// Full statement of one sale.
#[derive(Debug, Clone)]
pub struct SaleDetail {
    /// Header
    pub sale: crate::entities::sale::Model,
    /// Lines in insertion order
    pub lines: Vec<SaleDetailLine>,
    /// Amount owed per currency
    pub totals: CurrencyTotals,
    /// Amount paid per currency
    pub paid: CurrencyTotals,
    /// `totals - paid` per currency; negative means overpaid
    pub balance: CurrencyTotals,
}

impl SaleDetail {
    /// True when nothing is owed in any currency.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.balance.values().all(|owed| *owed <= 1e-6)
    }
}

fn add_to(totals: &mut CurrencyTotals, currency: &str, amount: f64) {
    *totals.entry(currency.to_string()).or_default() += amount;
}

/// Formats an amount with thousands separators and one decimal: `1,234.5 sum`.
#[must_use]
pub fn format_amount(amount: f64, currency: &str) -> String {
    format!("{} {currency}", format_number(amount))
}

/// Formats a number with thousands separators and one decimal.
#[must_use]
pub fn format_number(value: f64) -> String {
    let formatted = format!("{:.1}", value.abs());
    let (integer, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "0"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && formatted != "0.0" { "-" } else { "" };
    format!("{sign}{grouped}.{fraction}")
}

/// Formats per-currency totals as `1,000.0 sum, 20.0 usd`.
#[must_use]
pub fn format_totals(totals: &CurrencyTotals) -> String {
    if totals.is_empty() {
        return "0.0".to_string();
    }
    totals
        .iter()
        .map(|(currency, amount)| format_amount(*amount, currency))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Midnight UTC at the start of `day`.
fn day_start(day: NaiveDate) -> Result<DateTime<Utc>> {
    day.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .ok_or_else(|| Error::Config {
            message: format!("Invalid date {day}"),
        })
}

fn parse_day(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| Error::Config {
        message: format!("Invalid date '{value}', expected YYYY-MM-DD: {e}"),
    })
}

/// Turns an inclusive `YYYY-MM-DD` day range into a half-open UTC range.
///
/// Either end may be omitted.
pub fn parse_date_range(
    from: Option<&str>,
    to: Option<&str>,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
    let from_day = from.map(parse_day).transpose()?;
    let to_day = to.map(parse_day).transpose()?;

    if let (Some(start), Some(end)) = (from_day, to_day) {
        if start > end {
            return Err(Error::Config {
                message: format!("Start date {start} is after end date {end}"),
            });
        }
    }

    let start = from_day.map(day_start).transpose()?;
    let end = to_day
        .map(|day| {
            day.succ_opt().ok_or_else(|| Error::Config {
                message: format!("Date {day} is out of range"),
            })
        })
        .transpose()?
        .map(day_start)
        .transpose()?;
    Ok((start, end))
}

/// Stock valuation of all component leaves.
pub async fn component_stock_report(db: &DatabaseConnection) -> Result<ComponentStockReport> {
    let mut report = ComponentStockReport::default();
    for component in catalog::get_component_leaves(db).await? {
        let value = component.total * component.price;
        add_to(&mut report.totals, &component.currency, value);
        report.lines.push(ComponentStockLine { component, value });
    }
    Ok(report)
}

/// Performance of all product leaves.
pub async fn product_report(db: &DatabaseConnection, markup: f64) -> Result<ProductReport> {
    let mut report = ProductReport::default();
    for product in catalog::get_product_leaves(db).await? {
        let unit_cost = pricing::product_unit_cost(db, &product, markup).await?;
        let uncut_value = product.total_new * product.price;
        let cut_value = product.total_cut * product.price;

        add_to(&mut report.stock_value, &product.currency, uncut_value + cut_value);
        add_to(&mut report.revenue, &product.currency, product.total_revenue);
        add_to(&mut report.profit, &product.currency, product.total_profit);

        report.lines.push(ProductReportLine {
            product,
            unit_cost,
            uncut_value,
            cut_value,
        });
    }
    Ok(report)
}

/// Receipts recorded in `[from, to)`; either bound may be open.
pub async fn receipt_summary(
    db: &DatabaseConnection,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<ReceiptSummary> {
    let mut query = Receipt::find().find_also_related(Component);
    if let Some(from) = from {
        query = query.filter(receipt::Column::CreatedAt.gte(from));
    }
    if let Some(to) = to {
        query = query.filter(receipt::Column::CreatedAt.lt(to));
    }
    let rows = query.order_by_asc(receipt::Column::Id).all(db).await?;

    let mut summary = ReceiptSummary {
        count: rows.len(),
        ..ReceiptSummary::default()
    };
    for (receipt, component) in rows {
        let Some(component) = component else { continue };
        *summary.quantities.entry(component.title).or_default() += receipt.quantity;
        add_to(&mut summary.totals, &component.currency, receipt.total_price);
    }
    Ok(summary)
}

/// Sales recorded in `[from, to)`; either bound may be open.
pub async fn sales_summary(
    db: &DatabaseConnection,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<SalesSummary> {
    let sales = sale::get_sales_between(db, from, to).await?;
    let currencies = product_currencies(db).await?;

    let mut summary = SalesSummary {
        sale_count: sales.len(),
        ..SalesSummary::default()
    };
    for header in &sales {
        for item in sale::get_sale_items(db, header.id).await? {
            let currency = currencies
                .get(&item.product_id)
                .map_or("?", String::as_str);
            summary.units += item.quantity;
            add_to(&mut summary.revenue, currency, item.total_price);
            add_to(&mut summary.profit, currency, item.profit);
        }
        for payment in sale::get_payments(db, header.id).await? {
            add_to(&mut summary.paid, &payment.currency, payment.amount);
        }
    }
    Ok(summary)
}

async fn product_currencies(db: &DatabaseConnection) -> Result<HashMap<i64, String>> {
    Ok(Product::find()
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p.currency))
        .collect())
}

/// Statement of one sale: lines, totals, payments and balance due.
pub async fn sale_detail(db: &DatabaseConnection, sale_id: i64) -> Result<SaleDetail> {
    let header = sale::get_sale_by_id(db, sale_id)
        .await?
        .ok_or(Error::RecordNotFound {
            kind: "sale",
            id: sale_id,
        })?;

    let rows = SaleItem::find()
        .filter(sale_item::Column::SaleId.eq(sale_id))
        .find_also_related(Product)
        .order_by_asc(sale_item::Column::Id)
        .all(db)
        .await?;

    let mut totals = CurrencyTotals::new();
    let mut lines = Vec::with_capacity(rows.len());
    for (item, product) in rows {
        let (product_title, currency) = product.map_or_else(
            || (format!("#{}", item.product_id), "?".to_string()),
            |p| (p.title, p.currency),
        );
        add_to(&mut totals, &currency, item.total_price);
        lines.push(SaleDetailLine {
            item,
            product_title,
            currency,
        });
    }

    let mut paid = CurrencyTotals::new();
    for payment in sale::get_payments(db, sale_id).await? {
        add_to(&mut paid, &payment.currency, payment.amount);
    }

    let mut balance = totals.clone();
    for (currency, amount) in &paid {
        add_to(&mut balance, currency, -amount);
    }

    Ok(SaleDetail {
        sale: header,
        lines,
        totals,
        paid,
        balance,
    })
}

/// Warning text listing every low leaf, or `None` when all stock is healthy.
pub async fn low_stock_message(db: &DatabaseConnection) -> Result<Option<String>> {
    let components = catalog::low_stock_components(db).await?;
    let products = catalog::low_stock_products(db).await?;
    if components.is_empty() && products.is_empty() {
        return Ok(None);
    }

    let mut message = String::from("⚠️ **Low stock**\n");
    for c in &components {
        writeln!(
            message,
            "• {}: {} {} (limit {})",
            c.title,
            format_number(c.total),
            c.measurement,
            format_number(c.notification_limit)
        )?;
    }
    for p in &products {
        writeln!(
            message,
            "• {}: {} {} (limit {})",
            p.title,
            format_number(p.on_hand()),
            p.measurement,
            format_number(p.notification_limit)
        )?;
    }
    Ok(Some(message))
}
