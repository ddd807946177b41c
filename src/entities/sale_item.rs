//! Sale item entity - One product line of a sale.
//!
//! Prices are snapshots: `unit_price` and `unit_cost` are copied when the line is
//! created, and `total_price`/`profit` are recomputed from them on every save.
//!
//! Every line draws on exactly one source: an uncut line on a production batch
//! (`production_id`), a cut line on a cutting run (`cutting_id`).
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sale item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sale_items")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Sale the line belongs to
    pub sale_id: i64,
    /// Product leaf sold
    pub product_id: i64,
    /// Stock stage the units came from: `"uncut"` or `"cut"`
    pub stage: String,
    /// Batch an uncut line was sold from
    pub production_id: Option<i64>,
    /// Cutting run a cut line was sold from
    pub cutting_id: Option<i64>,
    /// Units sold
    pub quantity: f64,
    /// Product price at the time of sale
    pub unit_price: f64,
    /// Recipe cost (with markup) per unit at the time of sale
    pub unit_cost: f64,
    /// `unit_price * quantity`
    pub total_price: f64,
    /// `total_price - unit_cost * quantity`
    pub profit: f64,
}

/// Defines relationships between `SaleItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item belongs to one sale
    #[sea_orm(
        belongs_to = "super::sale::Entity",
        from = "Column::SaleId",
        to = "super::sale::Column::Id"
    )]
    Sale,
    /// Each item references one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    /// Batch an uncut line draws on
    #[sea_orm(
        belongs_to = "super::production::Entity",
        from = "Column::ProductionId",
        to = "super::production::Column::Id"
    )]
    Production,
    /// Cutting run a cut line draws on
    #[sea_orm(
        belongs_to = "super::cutting::Entity",
        from = "Column::CuttingId",
        to = "super::cutting::Column::Id"
    )]
    Cutting,
}

impl Related<super::sale::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sale.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::production::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Production.def()
    }
}

impl Related<super::cutting::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cutting.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
