//! Unit conversion helpers for raw token amounts.

use alloy::primitives::U256;

/// Format a U256 value with decimals to a human-readable string.
pub fn format_units(value: U256, decimals: u8) -> String {
    // Handle zero case explicitly
    if value == U256::ZERO {
        return "0".to_string();
    }

    let value_str = value.to_string();
    let decimals = decimals as usize;

    if decimals == 0 {
        return value_str;
    }

    let len = value_str.len();
    if len <= decimals {
        // Value is less than 1, pad with zeros
        let zeros = decimals - len;
        let decimal_part = value_str.trim_end_matches('0');
        if decimal_part.is_empty() {
            "0".to_string()
        } else {
            format!("0.{}{}", "0".repeat(zeros), decimal_part)
        }
    } else {
        // Split into integer and decimal parts
        let (integer, decimal) = value_str.split_at(len - decimals);
        let decimal = decimal.trim_end_matches('0');
        if decimal.is_empty() {
            integer.to_string()
        } else {
            format!("{}.{}", integer, decimal)
        }
    }
}

/// Convert a raw token amount to an `f64` count of whole tokens.
///
/// USD values downstream are display-grade floats; exactness is only required
/// for raw-amount sums, which stay in U256. Must not saturate for amounts far
/// beyond 2^63 (routes through the decimal string, so only f64 precision is
/// lost, never magnitude).
pub fn u256_to_f64(value: U256, decimals: u8) -> f64 {
    format_units(value, decimals).parse::<f64>().unwrap_or(0.0)
}
