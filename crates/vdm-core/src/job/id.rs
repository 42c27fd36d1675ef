//! Job identifier derivation.
//!
//! Ids are `<kind>_<normalized name>_<created millis>`, so they are unique
//! within the store without a central sequence counter. The controller bumps
//! the timestamp on the rare same-millisecond collision.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as Unix milliseconds (job timestamps).
pub(crate) fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Lowercases ASCII alphanumerics and folds every other run of characters
/// into a single `_`, trimming leading/trailing underscores.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            prev_underscore = false;
        } else if !prev_underscore {
            out.push('_');
            prev_underscore = true;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Deterministic id for a job of `kind` named `name` created at `created_at`.
pub fn derive_job_id(kind: &str, name: &str, created_at: i64) -> String {
    format!("{}_{}_{}", kind, normalize_name(name), created_at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_punctuation_and_case() {
        assert_eq!(normalize_name("The Matrix: Reloaded!"), "the_matrix_reloaded");
        assert_eq!(normalize_name("  --Dune--  "), "dune");
        assert_eq!(normalize_name("Amélie"), "am_lie");
    }

    #[test]
    fn empty_after_normalization_gets_placeholder() {
        assert_eq!(normalize_name("???"), "untitled");
    }

    #[test]
    fn id_is_deterministic() {
        let a = derive_job_id("movie", "Heat (1995)", 1700000000000);
        let b = derive_job_id("movie", "Heat (1995)", 1700000000000);
        assert_eq!(a, b);
        assert_eq!(a, "movie_heat_1995_1700000000000");
        assert_ne!(a, derive_job_id("episode", "Heat (1995)", 1700000000000));
    }
}
