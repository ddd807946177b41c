//! Component entity - Raw materials kept in the warehouse.
//!
//! Components form a two-level tree: top-level sections group leaf components.
//! Only leaves carry a meaningful price and running `total`; receipts add to the
//! total and production runs consume from it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Component database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "components")]
pub struct Model {
    /// Unique identifier for the component
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display title (e.g., "Flour", "Packaging film")
    #[sea_orm(unique)]
    pub title: String,
    /// Section this leaf belongs to, None for sections themselves
    pub parent_id: Option<i64>,
    /// Purchase price per measurement unit
    pub price: f64,
    /// Currency code the price is expressed in (e.g., "sum", "$")
    pub currency: String,
    /// Measurement unit: `"kg"`, `"l"`, `"m"` or `"pc"`
    pub measurement: String,
    /// Running stock on hand, maintained by ledger operations
    pub total: f64,
    /// Stock level under which the leaf is reported as low
    pub notification_limit: f64,
}

/// Defines relationships between Component and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Leaf components point at their section
    #[sea_orm(belongs_to = "Entity", from = "Column::ParentId", to = "Column::Id")]
    Parent,
    /// One component has many receipts
    #[sea_orm(has_many = "super::receipt::Entity")]
    Receipts,
    /// One component appears in many recipes
    #[sea_orm(has_many = "super::recipe_item::Entity")]
    RecipeItems,
}

impl Related<super::receipt::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Receipts.def()
    }
}

impl Related<super::recipe_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecipeItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether this entry is a stock-carrying leaf rather than a section.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Whether the leaf has dropped under its notification limit.
    #[must_use]
    pub fn is_low(&self) -> bool {
        self.is_leaf() && self.total < self.notification_limit
    }
}
