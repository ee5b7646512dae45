//! Duration strings for the requested certificate TTL.
//!
//! Accepts the unit-suffixed form Vault and its clients use (`"90s"`,
//! `"30m"`, `"1h30m"`, `"1.5h"`). A bare number is rejected because the
//! unit is ambiguous.

use std::time::Duration;

use thiserror::Error;

/// Reasons a TTL string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TtlError {
    #[error("missing time unit in \"{0}\"")]
    MissingUnit(String),

    #[error("unknown time unit \"{unit}\" in \"{value}\"")]
    UnknownUnit { unit: String, value: String },

    #[error("invalid duration \"{0}\"")]
    Invalid(String),

    #[error("TTL must be at least one second, got \"{0}\"")]
    TooShort(String),

    #[error("duration \"{0}\" is out of range")]
    Overflow(String),
}

const NANOS_PER_SECOND: u128 = 1_000_000_000;

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(NANOS_PER_SECOND),
        "m" => Some(60 * NANOS_PER_SECOND),
        "h" => Some(3_600 * NANOS_PER_SECOND),
        _ => None,
    }
}

/// Parse a TTL such as `"1h"` or `"1h30m"` into a [`Duration`].
///
/// The result must be at least one second since Vault takes TTLs in whole
/// seconds.
pub fn parse_ttl(value: &str) -> Result<Duration, TtlError> {
    let trimmed = value.trim();
    let invalid = || TtlError::Invalid(value.to_string());

    let rest = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if rest.is_empty() || rest.starts_with('-') {
        return Err(invalid());
    }

    let mut total: u128 = 0;
    let mut remaining = rest;

    while !remaining.is_empty() {
        let number_len = remaining
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(remaining.len());
        let (number, after_number) = remaining.split_at(number_len);
        if number.is_empty() || number == "." {
            return Err(invalid());
        }

        let unit_len = after_number
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after_number.len());
        let (unit, after_unit) = after_number.split_at(unit_len);
        if unit.is_empty() {
            return Err(TtlError::MissingUnit(value.to_string()));
        }
        let scale = unit_nanos(unit).ok_or_else(|| TtlError::UnknownUnit {
            unit: unit.to_string(),
            value: value.to_string(),
        })?;

        let (whole, fraction) = match number.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (number, ""),
        };
        let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| invalid())? };
        let mut segment = whole
            .checked_mul(scale)
            .ok_or_else(|| TtlError::Overflow(value.to_string()))?;
        if !fraction.is_empty() {
            let fraction: f64 = format!("0.{fraction}").parse().map_err(|_| invalid())?;
            segment += (fraction * scale as f64) as u128;
        }

        total = total.checked_add(segment).ok_or_else(|| TtlError::Overflow(value.to_string()))?;
        remaining = after_unit;
    }

    if total > u64::MAX as u128 {
        return Err(TtlError::Overflow(value.to_string()));
    }
    if total < NANOS_PER_SECOND {
        return Err(TtlError::TooShort(value.to_string()));
    }

    Ok(Duration::from_nanos(total as u64))
}

/// Render a TTL the way the Vault API expects it.
pub fn format_ttl(ttl: Duration) -> String {
    format!("{}s", ttl.as_secs())
}
