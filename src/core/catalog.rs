//! Catalog business logic - Components, products, and their recipes.
//!
//! Both catalogs are two-level trees: a section (no parent) groups leaves, and a
//! leaf's parent must be a section. Only leaves carry prices and running totals,
//! and only leaves can be referenced by receipts, recipes, productions or sales.
//! Totals are never written here; they belong to the ledger operations.

use crate::{
    entities::{
        Component, Product, Production, ProductionUsage, Receipt, RecipeItem, SaleItem, component,
        product, production, production_usage, receipt, recipe_item, sale_item,
    },
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Measurement units a catalog leaf may use.
pub const MEASUREMENTS: [&str; 4] = ["kg", "l", "m", "pc"];

/// Fields shared by new component and product leaves.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntryInput {
    /// Display title, unique within its catalog
    pub title: String,
    /// Purchase price (components) or selling price (products)
    pub price: f64,
    /// Currency code of the price
    pub currency: String,
    /// One of [`MEASUREMENTS`]
    pub measurement: String,
    /// Low-stock threshold
    pub notification_limit: f64,
}

/// Optional changes to an existing catalog leaf.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogEntryUpdate {
    /// New title
    pub title: Option<String>,
    /// New price
    pub price: Option<f64>,
    /// New low-stock threshold
    pub notification_limit: Option<f64>,
}

/// Common view over component and product rows for tree building.
pub trait StockEntry {
    /// Primary key
    fn entry_id(&self) -> i64;
    /// Section id, None for sections
    fn entry_parent(&self) -> Option<i64>;
    /// Whether the leaf is under its notification limit
    fn entry_is_low(&self) -> bool;
}

impl StockEntry for component::Model {
    fn entry_id(&self) -> i64 {
        self.id
    }

    fn entry_parent(&self) -> Option<i64> {
        self.parent_id
    }

    fn entry_is_low(&self) -> bool {
        self.is_low()
    }
}

impl StockEntry for product::Model {
    fn entry_id(&self) -> i64 {
        self.id
    }

    fn entry_parent(&self) -> Option<i64> {
        self.parent_id
    }

    fn entry_is_low(&self) -> bool {
        self.is_low()
    }
}

/// A section and its leaves.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogBranch<T> {
    /// The section row
    pub section: T,
    /// Leaves ordered by title
    pub children: Vec<T>,
}

impl<T: StockEntry> CatalogBranch<T> {
    /// A section is highlighted when any of its leaves is low on stock.
    #[must_use]
    pub fn is_highlighted(&self) -> bool {
        self.children.iter().any(StockEntry::entry_is_low)
    }
}

/// A whole catalog: sections with their leaves, then leaves whose section is gone.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogTree<T> {
    /// Sections ordered by title
    pub branches: Vec<CatalogBranch<T>>,
    /// Leaves pointing at a parent that no longer exists, ordered by title
    pub orphans: Vec<T>,
}

impl<T> CatalogTree<T> {
    /// Whether the catalog has no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty() && self.orphans.is_empty()
    }
}

/// Groups title-ordered rows into sections with their leaves.
fn build_tree<T: StockEntry>(entries: Vec<T>) -> CatalogTree<T> {
    let (sections, leaves): (Vec<T>, Vec<T>) =
        entries.into_iter().partition(|e| e.entry_parent().is_none());

    let mut branches: Vec<CatalogBranch<T>> = sections
        .into_iter()
        .map(|section| CatalogBranch {
            section,
            children: Vec::new(),
        })
        .collect();

    let mut orphans = Vec::new();
    for leaf in leaves {
        match branches
            .iter_mut()
            .find(|b| Some(b.section.entry_id()) == leaf.entry_parent())
        {
            Some(branch) => branch.children.push(leaf),
            None => orphans.push(leaf),
        }
    }
    CatalogTree { branches, orphans }
}

fn validate_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(Error::Config {
            message: "Title cannot be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn validate_price(price: f64) -> Result<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(Error::InvalidAmount { amount: price });
    }
    Ok(())
}

fn validate_limit(limit: f64) -> Result<()> {
    if !limit.is_finite() || limit < 0.0 {
        return Err(Error::InvalidQuantity { quantity: limit });
    }
    Ok(())
}

fn validate_entry(input: &CatalogEntryInput) -> Result<String> {
    let title = validate_title(&input.title)?;
    validate_price(input.price)?;
    validate_limit(input.notification_limit)?;
    if !MEASUREMENTS.contains(&input.measurement.as_str()) {
        return Err(Error::Config {
            message: format!(
                "Unknown measurement '{}', expected one of {}",
                input.measurement,
                MEASUREMENTS.join(", ")
            ),
        });
    }
    Ok(title)
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// Retrieves all components, sections and leaves, ordered by title.
pub async fn get_all_components(db: &DatabaseConnection) -> Result<Vec<component::Model>> {
    Component::find()
        .order_by_asc(component::Column::Title)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves component leaves only, ordered by title.
pub async fn get_component_leaves(db: &DatabaseConnection) -> Result<Vec<component::Model>> {
    Component::find()
        .filter(component::Column::ParentId.is_not_null())
        .order_by_asc(component::Column::Title)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a component by its unique ID.
pub async fn get_component_by_id(
    db: &DatabaseConnection,
    component_id: i64,
) -> Result<Option<component::Model>> {
    Component::find_by_id(component_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a component, section or leaf, by its exact title.
pub async fn get_component_by_title<C>(db: &C, title: &str) -> Result<Option<component::Model>>
where
    C: ConnectionTrait,
{
    Component::find()
        .filter(component::Column::Title.eq(title.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a component leaf by title, failing if it is missing or a section.
pub async fn get_component_leaf_by_title<C>(db: &C, title: &str) -> Result<component::Model>
where
    C: ConnectionTrait,
{
    let component = get_component_by_title(db, title)
        .await?
        .ok_or_else(|| Error::ComponentNotFound {
            name: title.to_string(),
        })?;
    if !component.is_leaf() {
        return Err(Error::NotALeaf {
            name: component.title,
        });
    }
    Ok(component)
}

/// Creates a top-level component section.
pub async fn create_component_section<C>(db: &C, title: &str) -> Result<component::Model>
where
    C: ConnectionTrait,
{
    let title = validate_title(title)?;
    if get_component_by_title(db, &title).await?.is_some() {
        return Err(Error::Config {
            message: format!("Component '{title}' already exists"),
        });
    }

    let section = component::ActiveModel {
        title: Set(title),
        parent_id: Set(None),
        price: Set(0.0),
        currency: Set(String::new()),
        measurement: Set(String::new()),
        total: Set(0.0),
        notification_limit: Set(0.0),
        ..Default::default()
    };
    let section = section.insert(db).await?;
    info!("Created component section '{}'", section.title);
    Ok(section)
}

/// Creates a component leaf under an existing section with a zero total.
pub async fn create_component<C>(
    db: &C,
    parent_id: i64,
    input: CatalogEntryInput,
) -> Result<component::Model>
where
    C: ConnectionTrait,
{
    let title = validate_entry(&input)?;

    let parent = Component::find_by_id(parent_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::ComponentNotFound {
            name: parent_id.to_string(),
        })?;
    if parent.is_leaf() {
        return Err(Error::InvalidParent { name: parent.title });
    }
    if get_component_by_title(db, &title).await?.is_some() {
        return Err(Error::Config {
            message: format!("Component '{title}' already exists"),
        });
    }

    let component = component::ActiveModel {
        title: Set(title),
        parent_id: Set(Some(parent_id)),
        price: Set(input.price),
        currency: Set(input.currency),
        measurement: Set(input.measurement),
        total: Set(0.0),
        notification_limit: Set(input.notification_limit),
        ..Default::default()
    };
    let component = component.insert(db).await?;
    info!(
        "Created component '{}' under '{}'",
        component.title, parent.title
    );
    Ok(component)
}

/// Updates title, price, or notification limit of a component leaf.
pub async fn update_component(
    db: &DatabaseConnection,
    component_id: i64,
    changes: CatalogEntryUpdate,
) -> Result<component::Model> {
    let current = crate::core::stock::find_component_leaf(db, component_id).await?;
    let mut component: component::ActiveModel = current.into();

    if let Some(title) = changes.title {
        let title = validate_title(&title)?;
        if get_component_by_title(db, &title)
            .await?
            .is_some_and(|other| other.id != component_id)
        {
            return Err(Error::Config {
                message: format!("Component '{title}' already exists"),
            });
        }
        component.title = Set(title);
    }
    if let Some(price) = changes.price {
        validate_price(price)?;
        component.price = Set(price);
    }
    if let Some(limit) = changes.notification_limit {
        validate_limit(limit)?;
        component.notification_limit = Set(limit);
    }

    component.update(db).await.map_err(Into::into)
}

/// Deletes a component that nothing references.
///
/// Sections must be empty; leaves must have no receipts, recipe lines, or
/// production usages.
pub async fn delete_component(db: &DatabaseConnection, component_id: i64) -> Result<()> {
    let component = get_component_by_id(db, component_id)
        .await?
        .ok_or_else(|| Error::ComponentNotFound {
            name: component_id.to_string(),
        })?;

    let children = Component::find()
        .filter(component::Column::ParentId.eq(component_id))
        .count(db)
        .await?;
    let receipts = Receipt::find()
        .filter(receipt::Column::ComponentId.eq(component_id))
        .count(db)
        .await?;
    let recipes = RecipeItem::find()
        .filter(recipe_item::Column::ComponentId.eq(component_id))
        .count(db)
        .await?;
    let usages = ProductionUsage::find()
        .filter(production_usage::Column::ComponentId.eq(component_id))
        .count(db)
        .await?;

    if children + receipts + recipes + usages > 0 {
        return Err(Error::InUse {
            kind: "component",
            id: component_id,
            reason: format!(
                "{children} child entries, {receipts} receipts, {recipes} recipe lines, {usages} production usages"
            ),
        });
    }

    component.delete(db).await?;
    Ok(())
}

/// Returns the component catalog as sections with their leaves.
pub async fn component_tree(
    db: &DatabaseConnection,
) -> Result<CatalogTree<component::Model>> {
    Ok(build_tree(get_all_components(db).await?))
}

/// Component leaves whose total is under their notification limit.
pub async fn low_stock_components(db: &DatabaseConnection) -> Result<Vec<component::Model>> {
    Ok(get_component_leaves(db)
        .await?
        .into_iter()
        .filter(component::Model::is_low)
        .collect())
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

/// Retrieves all products, sections and leaves, ordered by title.
pub async fn get_all_products(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    Product::find()
        .order_by_asc(product::Column::Title)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves product leaves only, ordered by title.
pub async fn get_product_leaves(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    Product::find()
        .filter(product::Column::ParentId.is_not_null())
        .order_by_asc(product::Column::Title)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a product by its unique ID.
pub async fn get_product_by_id(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<Option<product::Model>> {
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a product, section or leaf, by its exact title.
pub async fn get_product_by_title<C>(db: &C, title: &str) -> Result<Option<product::Model>>
where
    C: ConnectionTrait,
{
    Product::find()
        .filter(product::Column::Title.eq(title.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a product leaf by title, failing if it is missing or a section.
pub async fn get_product_leaf_by_title<C>(db: &C, title: &str) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    let product = get_product_by_title(db, title)
        .await?
        .ok_or_else(|| Error::ProductNotFound {
            name: title.to_string(),
        })?;
    if !product.is_leaf() {
        return Err(Error::NotALeaf {
            name: product.title,
        });
    }
    Ok(product)
}

/// Creates a top-level product section.
pub async fn create_product_section<C>(db: &C, title: &str) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    let title = validate_title(title)?;
    if get_product_by_title(db, &title).await?.is_some() {
        return Err(Error::Config {
            message: format!("Product '{title}' already exists"),
        });
    }

    let section = product::ActiveModel {
        title: Set(title),
        parent_id: Set(None),
        price: Set(0.0),
        currency: Set(String::new()),
        measurement: Set(String::new()),
        total_new: Set(0.0),
        total_cut: Set(0.0),
        total_sold: Set(0.0),
        total_revenue: Set(0.0),
        total_profit: Set(0.0),
        notification_limit: Set(0.0),
        cost_price: Set(0.0),
        ..Default::default()
    };
    let section = section.insert(db).await?;
    info!("Created product section '{}'", section.title);
    Ok(section)
}

/// Creates a product leaf under an existing section with zero totals.
pub async fn create_product<C>(
    db: &C,
    parent_id: i64,
    input: CatalogEntryInput,
) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    let title = validate_entry(&input)?;

    let parent = Product::find_by_id(parent_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::ProductNotFound {
            name: parent_id.to_string(),
        })?;
    if parent.is_leaf() {
        return Err(Error::InvalidParent { name: parent.title });
    }
    if get_product_by_title(db, &title).await?.is_some() {
        return Err(Error::Config {
            message: format!("Product '{title}' already exists"),
        });
    }

    let product = product::ActiveModel {
        title: Set(title),
        parent_id: Set(Some(parent_id)),
        price: Set(input.price),
        currency: Set(input.currency),
        measurement: Set(input.measurement),
        total_new: Set(0.0),
        total_cut: Set(0.0),
        total_sold: Set(0.0),
        total_revenue: Set(0.0),
        total_profit: Set(0.0),
        notification_limit: Set(input.notification_limit),
        cost_price: Set(0.0),
        ..Default::default()
    };
    let product = product.insert(db).await?;
    info!("Created product '{}' under '{}'", product.title, parent.title);
    Ok(product)
}

/// Updates title, price, or notification limit of a product leaf.
///
/// A new price only affects sale lines created afterwards.
pub async fn update_product(
    db: &DatabaseConnection,
    product_id: i64,
    changes: CatalogEntryUpdate,
) -> Result<product::Model> {
    let current = crate::core::stock::find_product_leaf(db, product_id).await?;
    let mut product: product::ActiveModel = current.into();

    if let Some(title) = changes.title {
        let title = validate_title(&title)?;
        if get_product_by_title(db, &title)
            .await?
            .is_some_and(|other| other.id != product_id)
        {
            return Err(Error::Config {
                message: format!("Product '{title}' already exists"),
            });
        }
        product.title = Set(title);
    }
    if let Some(price) = changes.price {
        validate_price(price)?;
        product.price = Set(price);
    }
    if let Some(limit) = changes.notification_limit {
        validate_limit(limit)?;
        product.notification_limit = Set(limit);
    }

    product.update(db).await.map_err(Into::into)
}

/// Sets the purchase cost of a product leaf that is bought in rather than made.
///
/// The cost only counts for sales while the product has no recipe, and only
/// for sale lines created afterwards.
pub async fn set_product_cost_price<C>(
    db: &C,
    product_id: i64,
    cost_price: f64,
) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    validate_price(cost_price)?;
    let current = crate::core::stock::find_product_leaf(db, product_id).await?;
    let mut product: product::ActiveModel = current.into();
    product.cost_price = Set(cost_price);
    let product = product.update(db).await?;
    info!("Cost price of '{}' set to {}", product.title, product.cost_price);
    Ok(product)
}

/// Deletes a product with no production or sales history, along with its recipe.
pub async fn delete_product(db: &DatabaseConnection, product_id: i64) -> Result<()> {
    let product = get_product_by_id(db, product_id)
        .await?
        .ok_or_else(|| Error::ProductNotFound {
            name: product_id.to_string(),
        })?;

    let children = Product::find()
        .filter(product::Column::ParentId.eq(product_id))
        .count(db)
        .await?;
    let productions = Production::find()
        .filter(production::Column::ProductId.eq(product_id))
        .count(db)
        .await?;
    let sale_items = SaleItem::find()
        .filter(sale_item::Column::ProductId.eq(product_id))
        .count(db)
        .await?;

    if children + productions + sale_items > 0 {
        return Err(Error::InUse {
            kind: "product",
            id: product_id,
            reason: format!(
                "{children} child entries, {productions} productions, {sale_items} sale items"
            ),
        });
    }

    let txn = db.begin().await?;
    RecipeItem::delete_many()
        .filter(recipe_item::Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?;
    product.delete(&txn).await?;
    txn.commit().await?;
    Ok(())
}

/// Returns the product catalog as sections with their leaves.
pub async fn product_tree(db: &DatabaseConnection) -> Result<CatalogTree<product::Model>> {
    Ok(build_tree(get_all_products(db).await?))
}

/// Product leaves whose on-hand stock is under their notification limit.
pub async fn low_stock_products(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    Ok(get_product_leaves(db)
        .await?
        .into_iter()
        .filter(product::Model::is_low)
        .collect())
}

// ---------------------------------------------------------------------------
// Recipes
// ---------------------------------------------------------------------------

/// Sets how much of a component one unit of a product needs.
///
/// Setting an existing (product, component) pair replaces its quantity. Batches
/// already produced keep their own usage snapshot.
pub async fn set_recipe_item<C>(
    db: &C,
    product_id: i64,
    component_id: i64,
    quantity: f64,
) -> Result<recipe_item::Model>
where
    C: ConnectionTrait,
{
    crate::core::stock::validate_quantity(quantity)?;
    crate::core::stock::find_product_leaf(db, product_id).await?;
    crate::core::stock::find_component_leaf(db, component_id).await?;

    let existing = RecipeItem::find()
        .filter(recipe_item::Column::ProductId.eq(product_id))
        .filter(recipe_item::Column::ComponentId.eq(component_id))
        .one(db)
        .await?;

    match existing {
        Some(line) => {
            let mut line: recipe_item::ActiveModel = line.into();
            line.quantity = Set(quantity);
            line.update(db).await.map_err(Into::into)
        }
        None => {
            let line = recipe_item::ActiveModel {
                product_id: Set(product_id),
                component_id: Set(component_id),
                quantity: Set(quantity),
                ..Default::default()
            };
            line.insert(db).await.map_err(Into::into)
        }
    }
}

/// Removes a component from a product's recipe.
pub async fn remove_recipe_item(
    db: &DatabaseConnection,
    product_id: i64,
    component_id: i64,
) -> Result<()> {
    let result = RecipeItem::delete_many()
        .filter(recipe_item::Column::ProductId.eq(product_id))
        .filter(recipe_item::Column::ComponentId.eq(component_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::RecordNotFound {
            kind: "recipe item",
            id: component_id,
        });
    }
    Ok(())
}

/// Returns a product's recipe lines with their components.
pub async fn get_recipe(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<Vec<(recipe_item::Model, component::Model)>> {
    crate::core::pricing::load_recipe(db, product_id).await
}
