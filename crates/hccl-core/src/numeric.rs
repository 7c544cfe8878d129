//! Text-cell number parsing shared by the upload readers.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Parse a spreadsheet number. Thousands separators are dropped, a trailing
/// `%` divides by 100, and scientific notation is accepted.
pub fn parse_number(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let (body, percent) = match trimmed.strip_suffix('%') {
        Some(body) => (body.trim(), true),
        None => (trimmed, false),
    };
    let cleaned: String = body
        .chars()
        .filter(|c| !matches!(c, ',' | '_' | ' '))
        .collect();

    let value = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()?;
    Some(if percent { value / dec!(100) } else { value })
}
