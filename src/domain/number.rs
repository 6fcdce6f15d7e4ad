//! Exact decimal parsing and percentage formatting for rationals.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, Zero};

/// Parse unsigned decimal text (`12`, `12.5`, `.5`) into an exact rational.
pub fn parse_decimal(text: &str) -> Option<BigRational> {
    let (whole, frac) = text.split_once('.').unwrap_or((text, ""));
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if text.contains('.') && frac.is_empty() {
        return None;
    }
    if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits = format!("{whole}{frac}");
    let numer: BigInt = digits.parse().ok()?;
    let denom = num_traits::pow(BigInt::from(10u8), frac.len());
    Some(BigRational::new(numer, denom))
}

/// `a/b` where each side is optional decimal text; empty numerator is 0 and
/// empty denominator is 1. None on malformed text or a zero denominator.
pub fn parse_ratio(text: &str) -> Option<BigRational> {
    let (numer, denom) = text.split_once('/')?;
    let numer = if numer.is_empty() {
        BigRational::zero()
    } else {
        parse_decimal(numer)?
    };
    let denom = if denom.is_empty() {
        BigRational::from_integer(1.into())
    } else {
        parse_decimal(denom)?
    };
    if denom.is_zero() {
        return None;
    }
    Some(numer / denom)
}

pub fn hundred() -> BigRational {
    BigRational::from_integer(100.into())
}

/// Round to `places` decimals, half away from zero, as plain text.
pub fn format_decimal(value: &BigRational, places: usize) -> String {
    let scale = num_traits::pow(BigInt::from(10u8), places);
    let scaled = value.abs() * BigRational::from_integer(scale.clone());
    let half = BigRational::new(1.into(), 2.into());
    let rounded = (scaled + half).floor().to_integer();
    let (int_part, frac_part) = (&rounded / &scale, &rounded % &scale);
    let sign = if value.is_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    if places == 0 {
        format!("{sign}{int_part}")
    } else {
        format!("{sign}{int_part}.{:0>places$}", frac_part.to_string())
    }
}

/// Nearest integer, ties to even.
pub fn round_half_even(value: &BigRational) -> BigInt {
    let floor = value.floor();
    let diff = value - &floor;
    let floor = floor.to_integer();
    let half = BigRational::new(1.into(), 2.into());
    let odd = !(&floor % BigInt::from(2)).is_zero();
    if diff > half || (diff == half && odd) {
        floor + 1
    } else {
        floor
    }
}

/// Fraction as a two-decimal percentage: 7/10 becomes `70.00%`.
pub fn format_percent(value: &BigRational) -> String {
    format!("{}%", format_decimal(&(value * hundred()), 2))
}
