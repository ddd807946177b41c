//! Unified error type for the workshop stock ledger.
//!
//! Validation failures are reported before anything is written. Failures while
//! propagating running totals abort the surrounding database transaction and
//! come back to the caller through the same enum.

use poise::serenity_prelude as serenity;
use thiserror::Error;

/// Every error the library and the bot can produce.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying `SeaORM` failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Invalid configuration or malformed input that is not tied to a record
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description
        message: String,
    },

    /// No component leaf or section matched the given title or id
    #[error("Component '{name}' not found")]
    ComponentNotFound {
        /// Title or id that was looked up
        name: String,
    },

    /// No product leaf or section matched the given title or id
    #[error("Product '{name}' not found")]
    ProductNotFound {
        /// Title or id that was looked up
        name: String,
    },

    /// A ledger record (receipt, production, cutting, sale, ...) is missing
    #[error("{kind} #{id} not found")]
    RecordNotFound {
        /// Record kind, e.g. `"receipt"`
        kind: &'static str,
        /// Primary key that was looked up
        id: i64,
    },

    /// Quantity was zero, negative, or not a finite number
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity {
        /// The rejected quantity
        quantity: f64,
    },

    /// Price or payment amount was negative or not a finite number
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// The requested parent is not a top-level section
    #[error("'{name}' cannot be used as a parent section")]
    InvalidParent {
        /// Title of the rejected parent
        name: String,
    },

    /// Ledger rows may only reference leaf entries, never sections
    #[error("'{name}' is a section, not a stock item")]
    NotALeaf {
        /// Title of the section
        name: String,
    },

    /// The operation would take a running total below zero
    #[error("Insufficient stock of '{item}': available {available}, required {required}")]
    InsufficientStock {
        /// Title of the catalog entry or batch
        item: String,
        /// Quantity currently on hand
        available: f64,
        /// Quantity the operation needs
        required: f64,
    },

    /// The record is still referenced and cannot be changed or removed
    #[error("{kind} #{id} is in use: {reason}")]
    InUse {
        /// Record kind, e.g. `"production"`
        kind: &'static str,
        /// Primary key of the record
        id: i64,
        /// What still references it
        reason: String,
    },

    /// Discord framework failure
    #[error("Discord error: {0}")]
    Discord(Box<serenity::Error>),

    /// File system failure (config loading)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Failure while building a reply
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// Integer conversion failure
    #[error("Integer conversion error: {0}")]
    TryFromInt(#[from] std::num::TryFromIntError),
}

impl From<serenity::Error> for Error {
    fn from(value: serenity::Error) -> Self {
        Self::Discord(Box::new(value))
    }
}

impl Error {
    /// Whether the error describes bad input or a refused operation, as opposed
    /// to an infrastructure failure. User-facing errors are shown to the operator
    /// as-is and are not logged as failures.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            Self::Database(_)
                | Self::Discord(_)
                | Self::Io(_)
                | Self::EnvVar(_)
                | Self::Fmt(_)
                | Self::TryFromInt(_)
        )
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_errors() {
        let refused = Error::InsufficientStock {
            item: "Flour".to_string(),
            available: 2.0,
            required: 5.0,
        };
        assert!(refused.is_user_facing());
        assert_eq!(
            refused.to_string(),
            "Insufficient stock of 'Flour': available 2, required 5"
        );
        assert!(Error::RecordNotFound { kind: "sale", id: 3 }.is_user_facing());
        assert!(!Error::Database(sea_orm::DbErr::Custom("boom".to_string())).is_user_facing());
    }
}
