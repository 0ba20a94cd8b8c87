//! Common utility functions for duty calculations.
//!
//! This module provides the rounding and bracket lookup shared by every step
//! of the duty calculator.

use rust_decimal::Decimal;

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// This follows standard financial rounding conventions where values at exactly
/// 0.005 are rounded up to 0.01 (away from zero).
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use duty_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46)); // Away from zero
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

/// Applies a rate to a base amount and rounds the product to cents.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use duty_core::calculations::common::apply_rate;
///
/// assert_eq!(apply_rate(dec!(18206.22), dec!(0.13)), dec!(2366.81));
/// ```
pub fn apply_rate(
    base: Decimal,
    rate: Decimal,
) -> Decimal {
    round_half_up(base * rate)
}

/// Like [`apply_rate`], but returns `None` if the product overflows.
///
/// ```
/// use rust_decimal::Decimal;
/// use rust_decimal_macros::dec;
/// use duty_core::calculations::common::checked_apply_rate;
///
/// assert_eq!(checked_apply_rate(dec!(11800), dec!(0.15)), Some(dec!(1770)));
/// assert_eq!(checked_apply_rate(Decimal::MAX, dec!(2)), None);
/// ```
pub fn checked_apply_rate(
    base: Decimal,
    rate: Decimal,
) -> Option<Decimal> {
    base.checked_mul(rate).map(round_half_up)
}

/// Sums `amounts`, returning `None` on overflow.
pub fn checked_sum(amounts: &[Decimal]) -> Option<Decimal> {
    amounts
        .iter()
        .try_fold(Decimal::ZERO, |total, amount| total.checked_add(*amount))
}

/// A table entry that starts at an inclusive lower bound.
pub trait Bracket {
    fn lower_bound(&self) -> Decimal;
}

/// Selects the bracket with the highest lower bound not exceeding `value`.
///
/// `brackets` must be sorted by ascending lower bound. Each bracket covers
/// `[lower_bound, next.lower_bound)`. Returns `None` when `value` is below
/// the first bound.
pub fn select_bracket<B: Bracket>(
    brackets: &[B],
    value: Decimal,
) -> Option<&B> {
    brackets
        .iter()
        .take_while(|b| b.lower_bound() <= value)
        .last()
}
