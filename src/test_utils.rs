//! Shared test utilities for the workshop stock ledger.
//!
//! This module provides common helper functions for setting up test databases
//! and creating catalog entries and ledger rows with sensible defaults.

use crate::{
    config::Settings,
    core::{
        catalog::{self, CatalogEntryInput},
        cutting, production, receipt, sale,
        stock::{self, Stage},
    },
    entities,
    errors::Result,
};
use sea_orm::DatabaseConnection;

const TEST_COMPONENT_SECTION: &str = "Test Components";
const TEST_PRODUCT_SECTION: &str = "Test Products";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Default settings: markup 1.18, no negative components.
#[must_use]
pub fn test_settings() -> Settings {
    Settings::default()
}

/// Creates a component section.
pub async fn create_test_component_section(
    db: &DatabaseConnection,
    title: &str,
) -> Result<entities::component::Model> {
    catalog::create_component_section(db, title).await
}

async fn default_component_section(db: &DatabaseConnection) -> Result<i64> {
    match catalog::get_component_by_title(db, TEST_COMPONENT_SECTION).await? {
        Some(section) => Ok(section.id),
        None => Ok(create_test_component_section(db, TEST_COMPONENT_SECTION)
            .await?
            .id),
    }
}

/// Creates a component leaf with sensible defaults.
///
/// # Defaults
/// * section: "Test Components" (created on first use)
/// * price: 10.0 sum per kg
/// * `notification_limit`: 5.0
pub async fn create_test_component(
    db: &DatabaseConnection,
    title: &str,
) -> Result<entities::component::Model> {
    let section_id = default_component_section(db).await?;
    catalog::create_component(
        db,
        section_id,
        CatalogEntryInput {
            title: title.to_string(),
            price: 10.0,
            currency: "sum".to_string(),
            measurement: "kg".to_string(),
            notification_limit: 5.0,
        },
    )
    .await
}

/// Creates a component leaf with a custom price and measurement and no
/// notification limit.
pub async fn create_custom_component(
    db: &DatabaseConnection,
    title: &str,
    price: f64,
    measurement: &str,
) -> Result<entities::component::Model> {
    let section_id = default_component_section(db).await?;
    catalog::create_component(
        db,
        section_id,
        CatalogEntryInput {
            title: title.to_string(),
            price,
            currency: "sum".to_string(),
            measurement: measurement.to_string(),
            notification_limit: 0.0,
        },
    )
    .await
}

/// Creates a product section.
pub async fn create_test_product_section(
    db: &DatabaseConnection,
    title: &str,
) -> Result<entities::product::Model> {
    catalog::create_product_section(db, title).await
}

/// Creates a product leaf with sensible defaults.
///
/// # Defaults
/// * section: "Test Products" (created on first use)
/// * price: 5.0 sum per piece
/// * `notification_limit`: 0.0
pub async fn create_test_product(
    db: &DatabaseConnection,
    title: &str,
) -> Result<entities::product::Model> {
    create_custom_product(db, title, 5.0).await
}

/// Creates a product leaf with a custom price.
pub async fn create_custom_product(
    db: &DatabaseConnection,
    title: &str,
    price: f64,
) -> Result<entities::product::Model> {
    let section_id = match catalog::get_product_by_title(db, TEST_PRODUCT_SECTION).await? {
        Some(section) => section.id,
        None => create_test_product_section(db, TEST_PRODUCT_SECTION).await?.id,
    };
    catalog::create_product(
        db,
        section_id,
        CatalogEntryInput {
            title: title.to_string(),
            price,
            currency: "sum".to_string(),
            measurement: "pc".to_string(),
            notification_limit: 0.0,
        },
    )
    .await
}

/// Records a receipt by `test_user`.
pub async fn create_test_receipt(
    db: &DatabaseConnection,
    component_id: i64,
    quantity: f64,
) -> Result<entities::receipt::Model> {
    receipt::create_receipt(db, component_id, quantity, "test_user".to_string()).await
}

/// Records a production batch with the default settings and series.
pub async fn create_test_production(
    db: &DatabaseConnection,
    product_id: i64,
    quantity: f64,
) -> Result<entities::production::Model> {
    production::create_production(
        db,
        &test_settings(),
        product_id,
        quantity,
        None,
        "test_user".to_string(),
    )
    .await
}

/// Cuts from a batch in a fresh session.
pub async fn create_test_cutting(
    db: &DatabaseConnection,
    production_id: i64,
    quantity: f64,
) -> Result<entities::cutting::Model> {
    let (_, mut lines) = cutting::create_cutting_run(
        db,
        "test_user".to_string(),
        &[cutting::CuttingInput {
            production_id,
            quantity,
        }],
    )
    .await?;
    Ok(lines.remove(0))
}

/// Records a one-product sale from the oldest stock and returns its first line.
pub async fn create_test_sale(
    db: &DatabaseConnection,
    product_id: i64,
    stage: Stage,
    quantity: f64,
) -> Result<entities::sale_item::Model> {
    let (_, mut lines) = sale::create_sale(
        db,
        &test_settings(),
        "Test Buyer",
        "Test Seller",
        "test_user".to_string(),
        &[sale::SaleItemInput {
            product_id,
            stage,
            quantity,
            source_id: None,
        }],
    )
    .await?;
    Ok(lines.remove(0))
}

/// Current running total of a component leaf.
pub async fn total_of_component(db: &DatabaseConnection, component_id: i64) -> Result<f64> {
    Ok(stock::find_component_leaf(db, component_id).await?.total)
}

/// Current state of a product leaf, for checking its totals.
pub async fn product_totals(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<entities::product::Model> {
    stock::find_product_leaf(db, product_id).await
}

/// Sets up a test environment with one component leaf.
/// Returns (db, component).
pub async fn setup_with_component() -> Result<(DatabaseConnection, entities::component::Model)> {
    let db = setup_test_db().await?;
    let component = create_test_component(&db, "Test Component").await?;
    Ok((db, component))
}

/// Sets up a test environment with one product leaf.
/// Returns (db, product).
pub async fn setup_with_product() -> Result<(DatabaseConnection, entities::product::Model)> {
    let db = setup_test_db().await?;
    let product = create_test_product(&db, "Test Product").await?;
    Ok((db, product))
}
