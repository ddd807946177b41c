//! Discord interaction handlers
//!
//! This module provides handlers for Discord interactions such as autocomplete.

/// Autocomplete handlers for component, product, stage, and currency parameters
pub mod autocomplete;
