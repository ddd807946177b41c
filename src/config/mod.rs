/// Workshop settings and catalog seed loading from config.toml
pub mod catalog;

/// Database configuration and connection management
pub mod database;

/// Operator display names from environment variables
pub mod users;

pub use catalog::Settings;
