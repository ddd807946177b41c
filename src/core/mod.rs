//! Core business logic - framework-agnostic ledger, catalog and reporting operations.
//!
//! Every function here takes a `SeaORM` connection and returns
//! [`crate::errors::Result`]; nothing depends on Discord.

/// Recomputing running totals from the ledger
pub mod audit;
/// Component and product catalogs, recipes, low-stock queries
pub mod catalog;
/// Cutting sessions: uncut to cut stock
pub mod cutting;
/// Line totals, profit and recipe cost rollups
pub mod pricing;
/// Production batches and their component usage
pub mod production;
/// Component receipts
pub mod receipt;
/// Stock valuations, summaries and sale statements
pub mod report;
/// Sales, sale items and payments
pub mod sale;
/// Catalog seeding from config.toml
pub mod seed;
/// Running-total propagation shared by all ledger operations
pub mod stock;
