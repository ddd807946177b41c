//! Cutting session entity - Groups the cutting runs an operator records together.
//! A session is removed as soon as its last cutting run is deleted.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cutting session database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cutting_sessions")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// When the session was opened
    pub created_at: DateTimeUtc,
    /// Discord user ID of the operator
    pub created_by: String,
}

/// Defines relationships between `CuttingSession` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One session has many cutting runs
    #[sea_orm(has_many = "super::cutting::Entity")]
    Cuttings,
}

impl Related<super::cutting::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cuttings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
