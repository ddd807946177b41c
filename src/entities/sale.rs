//! Sale entity - One sale to a buyer, owning its line items and payments.
//!
//! A sale never exists without items: deleting the last item deletes the sale.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sale database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    /// Unique identifier for the sale
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Buyer name, title-cased
    pub buyer: String,
    /// Seller name as entered by the operator
    pub seller: String,
    /// When the sale was recorded
    pub created_at: DateTimeUtc,
    /// Discord user ID of the operator who recorded it
    pub created_by: String,
}

/// Defines relationships between Sale and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One sale has many line items
    #[sea_orm(has_many = "super::sale_item::Entity")]
    Items,
    /// One sale has many payments
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::sale_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
