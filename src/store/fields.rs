//! Column value normalisation
//!
//! Write side: truncation and empty-to-NULL rules applied before binding.
//! Read side: coalescing of nullable columns into the values `Session`
//! exposes. Every getter goes through these so the rules live in one place.

use rusqlite::types::Type;
use std::collections::BTreeSet;

use crate::session::IssueType;

/// Maximum stored length, in characters, of caller-supplied strings.
pub const MAX_TEXT_CHARS: usize = 8000;

/// Cut `value` to at most [`MAX_TEXT_CHARS`] characters.
pub fn truncate(value: &str) -> &str {
    match value.char_indices().nth(MAX_TEXT_CHARS) {
        Some((byte_idx, _)) => &value[..byte_idx],
        None => value,
    }
}

/// Empty strings are stored as NULL
pub fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Zero sizes are stored as NULL
pub fn non_zero(value: u64) -> Option<u64> {
    if value == 0 {
        None
    } else {
        Some(value)
    }
}

pub fn text(value: Option<String>) -> String {
    value.unwrap_or_default()
}

pub fn size(value: Option<u64>) -> u64 {
    value.unwrap_or_default()
}

/// NULL and negative durations both read as zero.
pub fn duration(value: Option<i64>) -> u64 {
    value.map_or(0, |d| d.max(0) as u64)
}

/// Decode the `issue_types` column (a JSON array of tag names).
///
/// `column` is the result index, reported back on decode failure.
pub fn issue_types(column: usize, value: Option<String>) -> rusqlite::Result<BTreeSet<IssueType>> {
    match value.as_deref() {
        None | Some("") => Ok(BTreeSet::new()),
        Some(raw) => serde_json::from_str::<Vec<IssueType>>(raw)
            .map(|tags| tags.into_iter().collect())
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e))),
    }
}
