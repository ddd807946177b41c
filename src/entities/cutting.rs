//! Cutting entity - Moves part of a production batch from uncut to cut stock.
//!
//! `sold` counts the units of this run that cut sale lines have drawn on.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cutting database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cuttings")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Session the run belongs to
    pub session_id: i64,
    /// Batch the units were cut from
    pub production_id: i64,
    /// Units cut
    pub quantity: f64,
    /// Units of this run sold
    pub sold: f64,
}

/// Defines relationships between Cutting and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each run belongs to one session
    #[sea_orm(
        belongs_to = "super::cutting_session::Entity",
        from = "Column::SessionId",
        to = "super::cutting_session::Column::Id"
    )]
    Session,
    /// Each run draws from one batch
    #[sea_orm(
        belongs_to = "super::production::Entity",
        from = "Column::ProductionId",
        to = "super::production::Column::Id"
    )]
    Production,
    /// Cut sale lines drawn from the run
    #[sea_orm(has_many = "super::sale_item::Entity")]
    SaleItems,
}

impl Related<super::cutting_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl Related<super::production::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Production.def()
    }
}

impl Related<super::sale_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Units of the run still on hand.
    #[must_use]
    pub fn remaining(&self) -> f64 {
        self.quantity - self.sold
    }
}
