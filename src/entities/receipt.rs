//! Receipt entity - Components arriving at the warehouse.
//!
//! Each receipt adds its `quantity` to the referenced component's running total.
//! `unit_price` is copied from the component when the receipt is created so the
//! recorded cost does not move when the catalog price changes later.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Receipt database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "receipts")]
pub struct Model {
    /// Unique identifier for the receipt
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Component leaf that arrived
    pub component_id: i64,
    /// Quantity received, in the component's measurement unit
    pub quantity: f64,
    /// Component price at the time of receipt
    pub unit_price: f64,
    /// `quantity * unit_price`
    pub total_price: f64,
    /// When the receipt was recorded
    pub created_at: DateTimeUtc,
    /// Discord user ID of the operator who recorded it
    pub created_by: String,
}

/// Defines relationships between Receipt and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each receipt belongs to one component
    #[sea_orm(
        belongs_to = "super::component::Entity",
        from = "Column::ComponentId",
        to = "super::component::Column::Id"
    )]
    Component,
}

impl Related<super::component::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Component.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
