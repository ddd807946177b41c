//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Component, product and recipe management commands
pub mod catalog;

/// General utility commands
pub mod general;

/// Receipt, production and cutting commands
pub mod ledger;

/// Stock and sales report commands
pub mod reports;

/// Sale and payment commands
pub mod sales;

// Export commands
pub use catalog::*;
pub use general::*;
pub use ledger::*;
pub use reports::*;
pub use sales::*;

use crate::{bot::BotData, errors::Error};

/// Every command the bot registers.
#[must_use]
pub fn all() -> Vec<poise::Command<BotData, Error>> {
    vec![
        ping(),
        help(),
        component(),
        product(),
        recipe(),
        receive(),
        receive_edit(),
        receive_delete(),
        produce(),
        produce_edit(),
        produce_delete(),
        batches(),
        cut(),
        cut_delete(),
        sell(),
        sale_add(),
        sale_edit(),
        sale_remove(),
        sale_delete(),
        pay(),
        pay_delete(),
        sale_show(),
        stock(),
        low_stock(),
        products_report(),
        sales_report(),
        receipts_report(),
        audit(),
    ]
}
