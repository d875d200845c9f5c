//! Human readable quantities reported by the container runtime

use crate::errors::{SharedError, SharedResult};

/// Parse a byte quantity such as `10MiB`, `1.5kB` or `0B` into bytes
///
/// Usage pairs like `10MiB / 100MiB` are reduced to their first component.
/// Every unit is read as a power of 1024, decimal spellings included.
pub fn parse_byte_size(raw: &str) -> SharedResult<u64> {
    let invalid = || SharedError::InvalidByteSize {
        input: raw.to_string(),
    };

    let value = raw.split('/').next().unwrap_or_default().trim();
    let split_at = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split_at);

    let number: f64 = number.parse().map_err(|_| invalid())?;
    let exponent = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 0,
        "k" | "kb" | "kib" => 1,
        "m" | "mb" | "mib" => 2,
        "g" | "gb" | "gib" => 3,
        "t" | "tb" | "tib" => 4,
        "p" | "pb" | "pib" => 5,
        _ => return Err(invalid()),
    };

    Ok((number * 1024f64.powi(exponent)).round() as u64)
}

/// Parse a percentage such as `12.5%`
pub fn parse_percentage(raw: &str) -> Option<f64> {
    raw.trim().trim_end_matches('%').trim().parse().ok()
}
