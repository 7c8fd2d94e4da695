use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("Empty amount")]
    Empty,
    #[error("Invalid amount: {0}")]
    Invalid(String),
}

/// Parses either a plain decimal (`-2.00`) or a French-locale amount
/// (`-1 234,56`) without rounding.
pub fn parse_amount(s: &str) -> Result<Decimal, AmountError> {
    let trimmed = s.trim();
    let normalized: String = trimmed
        .chars()
        .filter(|c| !is_group_separator(*c))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if normalized.is_empty() {
        return Err(AmountError::Empty);
    }

    Decimal::from_str_exact(&normalized).map_err(|_| AmountError::Invalid(trimmed.to_string()))
}

// Exports use a regular space, a no-break space or a narrow no-break space
// between thousands depending on the spreadsheet that touched the file.
fn is_group_separator(c: char) -> bool {
    matches!(c, ' ' | '\u{a0}' | '\u{202f}')
}

// Rounded to three decimal places, the amount is `mantissa * 10^-(3 - pad)`,
// so its milliunit value is the mantissa followed by `pad` zeros.
fn milliunit_parts(amount: Decimal) -> (i128, u32) {
    let rounded = amount.round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero);
    (rounded.mantissa(), 3 - rounded.scale())
}

/// Amount in thousandths of the currency unit, as the ledger API expects it.
/// `None` only when the value does not fit an `i64`.
pub fn to_milliunits(amount: Decimal) -> Option<i64> {
    let (mantissa, pad) = milliunit_parts(amount);
    let value = mantissa.checked_mul(10_i128.pow(pad))?;
    i64::try_from(value).ok()
}

/// Same value as [`to_milliunits`], rendered for the import identifier.
/// Never fails, whatever the magnitude.
pub(crate) fn milliunits_string(amount: Decimal) -> String {
    match milliunit_parts(amount) {
        (0, _) => "0".to_string(),
        (mantissa, pad) => format!("{mantissa}{}", "0".repeat(pad as usize)),
    }
}
