//! Euro amounts as they appear on the menu and the receipt
//!
//! Prices travel as display strings (`"€12,50"`: symbol prefix, decimal
//! comma). All arithmetic happens on [`Decimal`].

use rust_decimal::prelude::*;
use thiserror::Error;

/// Currency symbol used on receipts
pub const EURO: char = '€';

/// Largest unit price or line total accepted at intake (€100.000,00)
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(10_000_000, 0, 0, false, 2);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("empty price")]
    Empty,
    #[error("invalid price '{0}'")]
    Invalid(String),
    #[error("negative price '{0}'")]
    Negative(String),
}

/// Parse a display price such as `"€12,50"`, `"€ 4,50"`, `"12.50"` or `"€1.250,00"`
pub fn parse_price(raw: &str) -> Result<Decimal, MoneyError> {
    let s = raw.trim();
    let s = s.strip_prefix(EURO).unwrap_or(s).trim();
    if s.is_empty() {
        return Err(MoneyError::Empty);
    }

    // Decimal comma: dots are thousands separators
    let normalized = if s.contains(',') {
        s.replace('.', "").replace(',', ".")
    } else {
        s.to_string()
    };

    let value =
        Decimal::from_str(&normalized).map_err(|_| MoneyError::Invalid(raw.to_string()))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(MoneyError::Negative(raw.to_string()));
    }
    Ok(value)
}

/// Round to cents, half away from zero
pub fn to_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format as `€12,50`
pub fn format_euro(value: Decimal) -> String {
    let rounded = to_cents(value);
    let digits = format!("{:.2}", rounded.abs()).replace('.', ",");
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-{}{}", EURO, digits)
    } else {
        format!("{}{}", EURO, digits)
    }
}

/// Unit price times quantity, `None` when the product does not fit a `Decimal`
pub fn line_total(unit_price: Decimal, quantity: u32) -> Option<Decimal> {
    unit_price.checked_mul(Decimal::from(quantity))
}

/// Whether `value` is within the intake cap
pub fn within_cap(value: Decimal) -> bool {
    value <= MAX_AMOUNT
}
