//! Workshop configuration loading from config.toml
//!
//! The file carries the workshop-wide [`Settings`] and, optionally, an initial
//! catalog (component and product sections with their leaves, plus recipes).
//! The catalog is used to seed an empty database on first run; entries that
//! already exist are left untouched.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Workshop-wide settings
    #[serde(default)]
    pub settings: Settings,
    /// Component sections to seed
    #[serde(default)]
    pub component_sections: Vec<SectionConfig>,
    /// Product sections to seed
    #[serde(default)]
    pub product_sections: Vec<SectionConfig>,
    /// Recipes to seed, keyed by product title
    #[serde(default)]
    pub recipes: Vec<RecipeConfig>,
}

/// Settings that shape pricing and stock policy.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Multiplier applied to the recipe cost rollup when computing unit cost
    pub cost_markup: f64,
    /// Currency used when a catalog entry or payment does not name one
    pub default_currency: String,
    /// Notification limit used when a leaf does not name one
    pub default_notification_limit: f64,
    /// Let production runs drive component totals below zero
    pub allow_negative_components: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cost_markup: 1.18,
            default_currency: "sum".to_string(),
            default_notification_limit: 500.0,
            allow_negative_components: false,
        }
    }
}

/// A catalog section and its leaves
#[derive(Debug, Deserialize, Clone)]
pub struct SectionConfig {
    /// Section title
    pub title: String,
    /// Leaves under the section
    #[serde(default)]
    pub items: Vec<ItemConfig>,
}

/// A single catalog leaf
#[derive(Debug, Deserialize, Clone)]
pub struct ItemConfig {
    /// Leaf title
    pub title: String,
    /// Purchase price (components) or selling price (products)
    pub price: f64,
    /// Measurement unit (`kg`, `l`, `m`, `pc`)
    pub measurement: String,
    /// Currency, defaults to `settings.default_currency`
    pub currency: Option<String>,
    /// Low-stock limit, defaults to `settings.default_notification_limit`
    pub notification_limit: Option<f64>,
    /// Purchase cost of a product bought in for resale
    pub cost_price: Option<f64>,
}

/// Bill of materials for one product
#[derive(Debug, Deserialize, Clone)]
pub struct RecipeConfig {
    /// Product leaf title
    pub product: String,
    /// Component lines
    pub components: Vec<RecipeLineConfig>,
}

/// One recipe line
#[derive(Debug, Deserialize, Clone)]
pub struct RecipeLineConfig {
    /// Component leaf title
    pub component: String,
    /// Component quantity per unit of product
    pub quantity: f64,
}

/// Loads workshop configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - `cost_markup` is negative or not finite
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    parse_config(&contents)
}

/// Parses workshop configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<Config> {
    let config: Config = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;

    if !config.settings.cost_markup.is_finite() || config.settings.cost_markup < 0.0 {
        return Err(Error::Config {
            message: format!(
                "cost_markup must be non-negative, got {}",
                config.settings.cost_markup
            ),
        });
    }

    Ok(config)
}

/// Loads configuration from `WORKSHOP_CONFIG`, or ./config.toml when unset.
///
/// A missing file is not an error: the defaults are returned and nothing is seeded.
pub fn load_default_config() -> Result<Config> {
    let path = std::env::var("WORKSHOP_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    if !Path::new(&path).exists() {
        tracing::warn!("Config file {path} not found, using default settings");
        return Ok(Config::default());
    }
    load_config(path)
}
