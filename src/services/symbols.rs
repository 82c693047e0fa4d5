//! Symbol normalization.
//!
//! Raw on-chain symbols arrive in mixed case and with stray whitespace. The
//! canonical form (trimmed, lowercase) is the aggregation key used everywhere
//! downstream; a token appearing on multiple chains under the same symbol is
//! deliberately merged.

/// Normalize a raw token symbol to its canonical form.
///
/// Pure and total: unrecognized input is returned trimmed and lowercased.
/// Idempotent by construction.
pub fn normalize(raw_symbol: &str) -> String {
    raw_symbol.trim().to_lowercase()
}
