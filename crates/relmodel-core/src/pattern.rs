//! Cached regular expressions.
//!
//! Used for UUID validation in the payload mapper and for compiled `LIKE`
//! patterns in the in-memory evaluator, which would otherwise recompile the
//! same pattern once per record.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use regex::Regex;

/// Canonical 8-4-4-4-12 hex UUID.
pub const UUID_PATTERN: &str =
    r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$";

fn compiled() -> &'static RwLock<HashMap<String, Regex>> {
    static COMPILED: OnceLock<RwLock<HashMap<String, Regex>>> = OnceLock::new();
    COMPILED.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Compile `pattern`, reusing an earlier compilation of the same text.
pub fn cached_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let table = compiled();
    // A poisoned lock still holds valid compiled patterns.
    let hit = table
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(pattern)
        .cloned();
    if let Some(hit) = hit {
        return Ok(hit);
    }

    let fresh = Regex::new(pattern)?;
    table
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .entry(pattern.to_string())
        .or_insert_with(|| fresh.clone());
    Ok(fresh)
}

/// Does `value` match `pattern`? An invalid pattern matches nothing.
pub fn matches_pattern(value: &str, pattern: &str) -> bool {
    match cached_regex(pattern) {
        Ok(regex) => regex.is_match(value),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "Invalid regex pattern");
            false
        }
    }
}

/// Is `value` a canonical textual UUID?
pub fn is_uuid(value: &str) -> bool {
    matches_pattern(value, UUID_PATTERN)
}
