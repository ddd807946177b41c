//! Product entity - Finished goods made in the workshop.
//!
//! Like components, products form a two-level section/leaf tree. A leaf tracks
//! stock in two stages (uncut `total_new` and cut `total_cut`) together with
//! cumulative sold quantity, revenue and profit.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display title of the product
    #[sea_orm(unique)]
    pub title: String,
    /// Section this leaf belongs to, None for sections themselves
    pub parent_id: Option<i64>,
    /// Selling price per unit
    pub price: f64,
    /// Purchase cost per unit of goods bought in for resale, used when the
    /// product has no recipe
    pub cost_price: f64,
    /// Currency code the price is expressed in
    pub currency: String,
    /// Measurement unit of the product
    pub measurement: String,
    /// Produced but not yet cut stock on hand
    pub total_new: f64,
    /// Cut stock on hand
    pub total_cut: f64,
    /// Cumulative quantity sold
    pub total_sold: f64,
    /// Cumulative revenue of all sale items
    pub total_revenue: f64,
    /// Cumulative profit of all sale items
    pub total_profit: f64,
    /// Stock level under which the leaf is reported as low
    pub notification_limit: f64,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Leaf products point at their section
    #[sea_orm(belongs_to = "Entity", from = "Column::ParentId", to = "Column::Id")]
    Parent,
    /// One product has many recipe items
    #[sea_orm(has_many = "super::recipe_item::Entity")]
    RecipeItems,
    /// One product has many production runs
    #[sea_orm(has_many = "super::production::Entity")]
    Productions,
    /// One product appears on many sale items
    #[sea_orm(has_many = "super::sale_item::Entity")]
    SaleItems,
}

impl Related<super::recipe_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecipeItems.def()
    }
}

impl Related<super::production::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Productions.def()
    }
}

impl Related<super::sale_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether this entry is a stock-carrying leaf rather than a section.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Uncut and cut stock together.
    #[must_use]
    pub fn on_hand(&self) -> f64 {
        self.total_new + self.total_cut
    }

    /// Whether the leaf has dropped under its notification limit.
    #[must_use]
    pub fn is_low(&self) -> bool {
        self.is_leaf() && self.on_hand() < self.notification_limit
    }
}
