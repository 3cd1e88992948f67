//! Numeric normalisation: canonical decimals and Brazilian display format.
//!
//! Monetary values arrive from the model as decimal strings that may use
//! either convention:
//!
//! * canonical — `.` as the fraction separator, no grouping (`1234.56`);
//! * localised — `,` as the fraction separator, `.` as the thousands
//!   separator (`1.234,56`).
//!
//! [`parse_amount`] accepts both and yields an exact [`Decimal`];
//! [`to_display`] renders the Brazilian convention with exactly two fraction
//! digits (`1234.5` → `"1.234,50"`). Both are total: unparseable input is
//! returned unchanged rather than raised or dropped, so a stray value like
//! `"isento"` survives into the export as-is.

use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a monetary string in either canonical or localised form.
///
/// A `,` anywhere marks the string as localised: all `.` are treated as
/// grouping and removed, then `,` becomes the fraction separator.
pub fn parse_amount(value: &str) -> Option<Decimal> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let canonical = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.to_string()
    };
    Decimal::from_str(&canonical).ok()
}

/// Convert a value string to its canonical decimal representation.
///
/// `"1.234,50"` → `"1234.50"`; canonical input passes through numerically
/// unchanged; anything unparseable is returned verbatim.
pub fn to_canonical(value: &str) -> String {
    match parse_amount(value) {
        Some(d) => d.to_string(),
        None => value.to_string(),
    }
}

/// Render a value in the Brazilian display convention.
///
/// `None` and empty strings map to the empty string. Parseable values are
/// formatted with exactly two fraction digits, `.` thousands grouping and
/// `,` as the fraction separator. Unparseable values are returned unchanged.
pub fn to_display(value: Option<&str>) -> String {
    let raw = match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => return String::new(),
    };
    match parse_amount(raw) {
        Some(d) => format_brl(d),
        None => raw.to_string(),
    }
}

/// Format a decimal as `1.234,56` with exactly two fraction digits.
fn format_brl(value: Decimal) -> String {
    let mut rounded = value.round_dp(2);
    rounded.rescale(2);

    let plain = rounded.to_string();
    let (sign, unsigned) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain.as_str()),
    };
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, "00"));

    format!("{sign}{},{frac_part}", group_thousands(int_part))
}

/// Insert `.` grouping separators every three digits from the right.
fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && i % 3 == offset % 3 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_and_localised() {
        assert_eq!(parse_amount("1234.56"), Some(Decimal::new(123456, 2)));
        assert_eq!(parse_amount("1.234,56"), Some(Decimal::new(123456, 2)));
        assert_eq!(parse_amount("1.234.567,89"), Some(Decimal::new(123456789, 2)));
        assert_eq!(parse_amount("0,5"), Some(Decimal::new(5, 1)));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("   "), None);
        assert_eq!(parse_amount("isento"), None);
    }

    #[test]
    fn canonicalises_localised_input() {
        assert_eq!(to_canonical("1.234,50"), "1234.50");
        assert_eq!(to_canonical("1500.00"), "1500.00");
        assert_eq!(to_canonical("não informado"), "não informado");
    }

    #[test]
    fn display_formats_brazilian_convention() {
        assert_eq!(to_display(Some("1234.5")), "1.234,50");
        assert_eq!(to_display(Some("1500.00")), "1.500,00");
        assert_eq!(to_display(Some("0.5")), "0,50");
        assert_eq!(to_display(Some("1234567.891")), "1.234.567,89");
        assert_eq!(to_display(Some("-1234.5")), "-1.234,50");
        assert_eq!(to_display(Some("12")), "12,00");
    }

    #[test]
    fn display_of_missing_or_empty_is_empty() {
        assert_eq!(to_display(None), "");
        assert_eq!(to_display(Some("")), "");
        assert_eq!(to_display(Some("  ")), "");
    }

    #[test]
    fn display_keeps_unparseable_input_verbatim() {
        assert_eq!(to_display(Some("R$ mil")), "R$ mil");
    }

    #[test]
    fn display_accepts_already_localised_input() {
        assert_eq!(to_display(Some("1.234,50")), "1.234,50");
    }

    #[test]
    fn canonical_is_idempotent_through_display() {
        for input in ["1234.5", "0.07", "999", "1234567.89", "1.234,50"] {
            let canonical = to_canonical(input);
            let display = to_display(Some(&canonical));
            let round_tripped = to_canonical(&display);
            assert_eq!(
                parse_amount(&round_tripped),
                parse_amount(&canonical),
                "round trip changed value for {input}"
            );
        }
    }
}
