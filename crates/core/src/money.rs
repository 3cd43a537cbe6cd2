use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a bank-formatted amount string into a `Decimal`.
///
/// Bank exports are messy: currency symbols, thousands separators (comma,
/// dot or apostrophe depending on locale), accounting-style parentheses for
/// negatives, and the occasional Unicode minus. Empty or unparseable input
/// yields zero — an amount never rejects a row, only a missing date does.
pub fn parse_amount(raw: &str) -> Decimal {
    let s = raw.trim();
    if s.is_empty() {
        return Decimal::ZERO;
    }

    let (negative, s) = if s.starts_with('(') && s.ends_with(')') {
        (true, s[1..s.len() - 1].trim())
    } else {
        (false, s)
    };

    let s = s
        .replace(['$', '€', '£', '\'', ' ', '\u{a0}'], "")
        .replace('\u{2212}', "-");
    let s = normalize_separators(&s);

    let mut dec = Decimal::from_str(&s).unwrap_or(Decimal::ZERO);
    if negative {
        dec = -dec;
    }
    dec
}

/// Reduce locale-dependent separators to a single `.` decimal point.
///
/// When both `.` and `,` appear, whichever comes last is the decimal
/// separator. A lone comma followed by 1–2 digits is a decimal comma
/// (`80,00`); any other comma is a thousands separator. Multiple dots are
/// thousands dots.
fn normalize_separators(s: &str) -> String {
    let last_dot = s.rfind('.');
    let last_comma = s.rfind(',');

    match (last_dot, last_comma) {
        (Some(d), Some(c)) => {
            if c > d {
                s.replace('.', "").replace(',', ".")
            } else {
                s.replace(',', "")
            }
        }
        (None, Some(c)) => {
            let decimals = s.len() - c - 1;
            if s.matches(',').count() == 1 && (1..=2).contains(&decimals) {
                s.replace(',', ".")
            } else {
                s.replace(',', "")
            }
        }
        (Some(_), None) => {
            if s.matches('.').count() > 1 {
                s.replace('.', "")
            } else {
                s.to_string()
            }
        }
        (None, None) => s.to_string(),
    }
}

/// Convert a decimal amount to the budgeting service's integer minor units
/// (milliunits, amount × 1000), rounding to the nearest integer.
/// Saturates if the value leaves the i64 range.
pub fn to_milliunits(amount: Decimal) -> i64 {
    let saturated = if amount.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    };
    match amount.checked_mul(Decimal::from(1000)) {
        Some(milli) => milli.round().to_i64().unwrap_or(saturated),
        None => saturated,
    }
}
