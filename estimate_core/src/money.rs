//! Money helpers.
//!
//! All currency amounts are [`Decimal`]; nothing in this crate routes money
//! through binary floating point.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// Values at exactly 0.005 are rounded away from zero.
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use estimate_core::money::round_half_up;
///
/// assert_eq!(round_half_up(Decimal::new(123455, 3)), Decimal::new(12346, 2));
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Formats an amount with thousands separators and two decimal places.
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use estimate_core::money::format_money;
///
/// assert_eq!(format_money(Decimal::new(123450, 2)), "1,234.50");
/// assert_eq!(format_money(Decimal::ZERO), "0.00");
/// ```
pub fn format_money(value: Decimal) -> String {
    let mut rounded = round_half_up(value);
    rounded.rescale(2);

    let text = rounded.abs().to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn round_half_up_rounds_up_at_midpoint() {
        assert_eq!(round_half_up(dec!(10.005)), dec!(10.01));
    }

    #[test]
    fn round_half_up_rounds_down_below_midpoint() {
        assert_eq!(round_half_up(dec!(10.004)), dec!(10.00));
    }

    #[test]
    fn format_money_pads_to_two_places() {
        assert_eq!(format_money(dec!(400)), "400.00");
        assert_eq!(format_money(dec!(0.5)), "0.50");
    }

    #[test]
    fn format_money_groups_thousands() {
        assert_eq!(format_money(dec!(1234567.891)), "1,234,567.89");
        assert_eq!(format_money(dec!(100000)), "100,000.00");
    }

    #[test]
    fn format_money_keeps_sign() {
        assert_eq!(format_money(dec!(-1500.25)), "-1,500.25");
    }
}
