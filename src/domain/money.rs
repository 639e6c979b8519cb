//! Fixed-point money arithmetic.
//!
//! All monetary values are `BigDecimal`, never floats. Amounts and rates carry
//! 8 fractional digits; user-facing totals and fees are rounded to 2.

use bigdecimal::BigDecimal;
use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::Signed;

/// Scale used for amounts and exchange rates.
pub const AMOUNT_SCALE: i64 = 8;

/// Scale used for fees and user-facing totals.
pub const DISPLAY_SCALE: i64 = 2;

/// Rounds half-up (ties away from zero) at the given number of fractional
/// digits. bigdecimal 0.3 has no rounding-mode API, so this works on the
/// underlying integer representation.
pub fn round_half_up(value: &BigDecimal, scale: i64) -> BigDecimal {
    let (int_val, exp) = value.as_bigint_and_exponent();
    if exp <= scale {
        // No digits to drop; padding with zeros is exact.
        return value.with_scale(scale);
    }

    let digits_to_drop = (exp - scale) as u32;
    let pow = BigInt::from(10u32).pow(digits_to_drop);
    let half = &pow / BigInt::from(2u32);
    let (quot, rem) = int_val.div_rem(&pow);

    let rounded = if rem.abs() >= half {
        if int_val.sign() == Sign::Minus {
            quot - BigInt::from(1u32)
        } else {
            quot + BigInt::from(1u32)
        }
    } else {
        quot
    };

    BigDecimal::new(rounded, scale)
}

/// Rounds to amount precision (8 fractional digits).
pub fn to_amount(value: &BigDecimal) -> BigDecimal {
    round_half_up(value, AMOUNT_SCALE)
}

/// Rounds to display precision (2 fractional digits).
pub fn to_display(value: &BigDecimal) -> BigDecimal {
    round_half_up(value, DISPLAY_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    #[test]
    fn rounds_half_up_at_display_scale() {
        assert_eq!(to_display(&dec("3.204")), dec("3.20"));
        assert_eq!(to_display(&dec("3.205")), dec("3.21"));
        assert_eq!(to_display(&dec("3.2049999")), dec("3.20"));
        assert_eq!(to_display(&dec("0.005")), dec("0.01"));
    }

    #[test]
    fn rounds_half_up_at_amount_scale() {
        assert_eq!(to_amount(&dec("1.234567894")), dec("1.23456789"));
        assert_eq!(to_amount(&dec("1.234567895")), dec("1.23456790"));
    }

    #[test]
    fn ties_round_away_from_zero_for_negatives() {
        assert_eq!(to_display(&dec("-0.005")), dec("-0.01"));
        assert_eq!(to_display(&dec("-3.204")), dec("-3.20"));
        assert_eq!(to_display(&dec("-3.205")), dec("-3.21"));
    }

    #[test]
    fn padding_is_exact() {
        assert_eq!(to_amount(&dec("100")), dec("100.00000000"));
        assert_eq!(to_display(&dec("19.85")), dec("19.85"));
    }

    #[test]
    fn exact_values_pass_through() {
        assert_eq!(round_half_up(&dec("1985.00000000"), AMOUNT_SCALE), dec("1985.00000000"));
    }
}
