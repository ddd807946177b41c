//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the catalog, the ledgers, and the sales tables.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod component;
pub mod cutting;
pub mod cutting_session;
pub mod payment;
pub mod product;
pub mod production;
pub mod production_usage;
pub mod receipt;
pub mod recipe_item;
pub mod sale;
pub mod sale_item;

// Re-export specific types to avoid conflicts
pub use component::{Column as ComponentColumn, Entity as Component, Model as ComponentModel};
pub use cutting::{Column as CuttingColumn, Entity as Cutting, Model as CuttingModel};
pub use cutting_session::{
    Column as CuttingSessionColumn, Entity as CuttingSession, Model as CuttingSessionModel,
};
pub use payment::{Column as PaymentColumn, Entity as Payment, Model as PaymentModel};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use production::{Column as ProductionColumn, Entity as Production, Model as ProductionModel};
pub use production_usage::{
    Column as ProductionUsageColumn, Entity as ProductionUsage, Model as ProductionUsageModel,
};
pub use receipt::{Column as ReceiptColumn, Entity as Receipt, Model as ReceiptModel};
pub use recipe_item::{Column as RecipeItemColumn, Entity as RecipeItem, Model as RecipeItemModel};
pub use sale::{Column as SaleColumn, Entity as Sale, Model as SaleModel};
pub use sale_item::{Column as SaleItemColumn, Entity as SaleItem, Model as SaleItemModel};
