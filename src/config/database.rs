//! Database configuration module for the workshop stock ledger.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs without hand-written SQL.

use crate::entities::{
    Component, Cutting, CuttingSession, Payment, Product, Production, ProductionUsage, Receipt,
    RecipeItem, Sale, SaleItem,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::path::Path;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/workshop_stock.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable or returns the
/// default local `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// File path of a `sqlite://path?options` URL, `None` for in-memory databases.
fn sqlite_file(url: &str) -> Option<&str> {
    let rest = url.strip_prefix("sqlite://")?;
    let path = rest.split('?').next().unwrap_or(rest);
    (!path.is_empty() && !path.starts_with(":memory:")).then_some(path)
}

/// Establishes a connection to the `SQLite` database named by [`get_database_url`].
///
/// The parent directory of a file-backed database is created when missing.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    if let Some(parent) = sqlite_file(&database_url).and_then(|path| Path::new(path).parent()) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    tracing::debug!("Connecting to database at {database_url}");
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table_for<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables that do not exist yet.
///
/// Parents are created before the tables whose foreign keys point at them.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table_for(db, &schema, Component).await?;
    create_table_for(db, &schema, Product).await?;
    create_table_for(db, &schema, RecipeItem).await?;
    create_table_for(db, &schema, Receipt).await?;
    create_table_for(db, &schema, Production).await?;
    create_table_for(db, &schema, ProductionUsage).await?;
    create_table_for(db, &schema, CuttingSession).await?;
    create_table_for(db, &schema, Cutting).await?;
    create_table_for(db, &schema, Sale).await?;
    create_table_for(db, &schema, SaleItem).await?;
    create_table_for(db, &schema, Payment).await?;

    Ok(())
}
