//! Production usage entity - Recipe snapshot taken when a batch is produced.
//!
//! The batch consumed `per_unit * production.quantity` of the component. Keeping
//! the snapshot lets edits and deletes restore exactly what was taken, even after
//! the product's recipe has changed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Production usage database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "production_usages")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Batch the usage belongs to
    pub production_id: i64,
    /// Component consumed
    pub component_id: i64,
    /// Component quantity per produced unit
    pub per_unit: f64,
}

/// Defines relationships between `ProductionUsage` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each usage belongs to one batch
    #[sea_orm(
        belongs_to = "super::production::Entity",
        from = "Column::ProductionId",
        to = "super::production::Column::Id"
    )]
    Production,
    /// Each usage references one component
    #[sea_orm(
        belongs_to = "super::component::Entity",
        from = "Column::ComponentId",
        to = "super::component::Column::Id"
    )]
    Component,
}

impl Related<super::production::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Production.def()
    }
}

impl Related<super::component::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Component.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
