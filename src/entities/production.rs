//! Production entity - A batch of product made from components.
//!
//! A batch adds `quantity` to the product's uncut stock. `cut` counts how much of
//! the batch has since been moved to cut stock by cutting runs, `sold` how much
//! left the workshop uncut through sale lines.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Production database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "productions")]
pub struct Model {
    /// Unique identifier for the batch
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Product leaf that was produced
    pub product_id: i64,
    /// Free-form batch series label
    pub series: String,
    /// Units produced
    pub quantity: f64,
    /// Units of this batch moved to cut stock
    pub cut: f64,
    /// Units of this batch sold uncut
    pub sold: f64,
    /// When the batch was recorded
    pub created_at: DateTimeUtc,
    /// Discord user ID of the operator who recorded it
    pub created_by: String,
}

/// Defines relationships between Production and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each batch belongs to one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    /// Component usage snapshot of the batch
    #[sea_orm(has_many = "super::production_usage::Entity")]
    Usages,
    /// Cutting runs taken from the batch
    #[sea_orm(has_many = "super::cutting::Entity")]
    Cuttings,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::production_usage::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Usages.def()
    }
}

impl Related<super::cutting::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cuttings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Units of the batch still on hand uncut: neither cut nor sold.
    #[must_use]
    pub fn uncut(&self) -> f64 {
        self.quantity - self.cut - self.sold
    }
}
