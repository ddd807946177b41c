//! Operator configuration - friendly names for workshop staff.
//!
//! Ledger rows store the Discord user ID of whoever recorded them. The optional
//! `WORKSHOP_OPERATORS` environment variable maps those IDs to display names,
//! e.g. `WORKSHOP_OPERATORS="1234:Aziz,5678:Malika"`. The same names are used as
//! the default seller on new sales.

use std::collections::HashMap;

const OPERATORS_VAR: &str = "WORKSHOP_OPERATORS";

/// Parses a comma-separated list of `user_id:name` pairs.
///
/// Malformed entries and entries with an empty ID or name are ignored.
#[must_use]
pub fn parse_operators(value: &str) -> HashMap<String, String> {
    value
        .split(',')
        .filter_map(|entry| {
            let (id, name) = entry.split_once(':')?;
            let (id, name) = (id.trim(), name.trim());
            (!id.is_empty() && !name.is_empty()).then(|| (id.to_string(), name.to_string()))
        })
        .collect()
}

/// Gets the configured operator names keyed by Discord user ID.
#[must_use]
pub fn get_operator_names() -> HashMap<String, String> {
    std::env::var(OPERATORS_VAR)
        .map(|value| parse_operators(&value))
        .unwrap_or_default()
}

/// Gets the display name for a given user ID, if configured.
#[must_use]
pub fn get_nickname(user_id: &str) -> Option<String> {
    get_operator_names().remove(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_operators() {
        let names = parse_operators("1234:Aziz, 5678 : Malika");
        assert_eq!(names.len(), 2);
        assert_eq!(names.get("1234").map(String::as_str), Some("Aziz"));
        assert_eq!(names.get("5678").map(String::as_str), Some("Malika"));
    }

    #[test]
    fn test_parse_operators_skips_malformed_entries() {
        let names = parse_operators("1234,:nobody,99:,42:Ok,");
        assert_eq!(names.len(), 1);
        assert_eq!(names.get("42").map(String::as_str), Some("Ok"));
        assert!(parse_operators("").is_empty());
    }
}
