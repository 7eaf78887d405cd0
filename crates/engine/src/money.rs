//! Money helpers.
//!
//! All balances and exchange amounts are stored as an `i64` number of
//! **minor units** of their currency to avoid floating-point drift in the
//! ledger. Floating point only enters at the single rate multiplication of
//! an exchange, and the result is rounded back to minor units immediately.

use crate::{Currency, EngineError, ResultEngine};

const fn pow10(digits: u8) -> i64 {
    let mut value = 1;
    let mut i = 0;
    while i < digits {
        value *= 10;
        i += 1;
    }
    value
}

/// The fixed exchange fee: one major unit of the source currency.
#[must_use]
pub const fn fee_minor(currency: Currency) -> i64 {
    pow10(currency.minor_units())
}

/// Parses a major-unit amount (`"50"`, `"50.00"`, `"50,5"`) into minor units.
///
/// Accepts `.` or `,` as decimal separator and rejects more fraction digits
/// than the currency carries.
pub fn parse_major(input: &str, currency: Currency) -> ResultEngine<i64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidAmount(
            "amount must not be empty".to_string(),
        ));
    }
    if trimmed.starts_with('-') {
        return Err(EngineError::InvalidAmount(
            "amount must be positive".to_string(),
        ));
    }

    let normalized = trimmed.replace(',', ".");
    let (whole, fraction) = match normalized.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (normalized.as_str(), ""),
    };

    let digits = currency.minor_units() as usize;
    if fraction.len() > digits {
        return Err(EngineError::InvalidAmount(format!(
            "{} allows at most {digits} decimal digits",
            currency.code()
        )));
    }
    if whole.is_empty() && fraction.is_empty() {
        return Err(EngineError::InvalidAmount(format!(
            "invalid amount: {input}"
        )));
    }
    // Digits only; `i64::parse` alone would accept a sign inside either part.
    if !whole.chars().all(|c| c.is_ascii_digit())
        || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(EngineError::InvalidAmount(format!(
            "invalid amount: {input}"
        )));
    }

    let whole_value: i64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| EngineError::InvalidAmount(format!("invalid amount: {input}")))?
    };
    let fraction_value: i64 = if fraction.is_empty() {
        0
    } else {
        fraction
            .parse()
            .map_err(|_| EngineError::InvalidAmount(format!("invalid amount: {input}")))?
    };

    let scale = pow10(currency.minor_units());
    let fraction_scale = pow10((digits - fraction.len()) as u8);

    whole_value
        .checked_mul(scale)
        .and_then(|v| v.checked_add(fraction_value * fraction_scale))
        .ok_or_else(|| EngineError::InvalidAmount(format!("amount out of range: {input}")))
}

/// Formats minor units as a major-unit decimal string, e.g. `104410` USD →
/// `"1044.10"`.
#[must_use]
pub fn format_minor(amount_minor: i64, currency: Currency) -> String {
    let digits = currency.minor_units();
    if digits == 0 {
        return amount_minor.to_string();
    }
    let scale = pow10(digits);
    let sign = if amount_minor < 0 { "-" } else { "" };
    let abs = amount_minor.unsigned_abs();
    let whole = abs / scale as u64;
    let fraction = abs % scale as u64;
    format!("{sign}{whole}.{fraction:0width$}", width = digits as usize)
}

/// Converts a source-currency minor amount into target-currency minor units
/// at `rate` (major units of target per major unit of source).
///
/// Rounds half away from zero at the last step.
pub fn convert_minor(
    amount_minor: i64,
    source: Currency,
    target: Currency,
    rate: f64,
) -> ResultEngine<i64> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(EngineError::RateUnavailable(format!(
            "invalid rate {rate} for {source}->{target}"
        )));
    }

    let source_scale = pow10(source.minor_units()) as f64;
    let target_scale = pow10(target.minor_units()) as f64;
    let converted = (amount_minor as f64 / source_scale * rate * target_scale).round();

    if !converted.is_finite() || converted < 0.0 || converted > i64::MAX as f64 {
        return Err(EngineError::InvalidAmount(format!(
            "converted amount out of range for {source}->{target}"
        )));
    }

    Ok(converted as i64)
}
