//! Rounding policy for money and rates.
//!
//! Money is rounded to cents and rates/LTV to 3 decimal places, both
//! round-half-up (midpoint away from zero). Arithmetic on request-supplied
//! amounts goes through the checked helpers so an overflow surfaces as
//! [`EngineError::CalculationError`] rather than a panic.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{EngineError, EngineResult};

/// Decimal places kept on monetary values.
pub const MONEY_DP: u32 = 2;

/// Decimal places kept on rates and LTV before table lookups.
pub const RATE_DP: u32 = 3;

/// Rounds a monetary value to cents, half-up.
///
/// # Examples
///
/// ```
/// use mortgage_engine::calculation::round_money;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(round_money(dec!(41.665)), dec!(41.67));
/// assert_eq!(round_money(dec!(916.6666)), dec!(916.67));
/// ```
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a rate or LTV percentage to 3 decimal places, half-up.
pub fn round_rate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(RATE_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Returns `percent` percent of `amount`, unrounded.
pub fn percent_of(amount: Decimal, percent: Decimal) -> Decimal {
    amount * percent / Decimal::ONE_HUNDRED
}

fn overflow(what: &str) -> EngineError {
    EngineError::CalculationError {
        message: format!("{} overflowed", what),
    }
}

/// Returns `percent` percent of `amount`, failing on overflow.
pub fn checked_percent_of(amount: Decimal, percent: Decimal, what: &str) -> EngineResult<Decimal> {
    amount
        .checked_mul(percent)
        .and_then(|product| product.checked_div(Decimal::ONE_HUNDRED))
        .ok_or_else(|| overflow(what))
}

/// Multiplies a monthly amount by a month count, failing on overflow.
pub fn checked_months(monthly: Decimal, months: u32, what: &str) -> EngineResult<Decimal> {
    monthly
        .checked_mul(Decimal::from(months))
        .ok_or_else(|| overflow(what))
}

/// Sums amounts, failing on overflow.
///
/// # Examples
///
/// ```
/// use mortgage_engine::calculation::checked_total;
/// use rust_decimal::Decimal;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(checked_total([dec!(2275.44), dec!(400.00)], "monthly").unwrap(), dec!(2675.44));
/// assert!(checked_total([Decimal::MAX, dec!(1)], "monthly").is_err());
/// ```
pub fn checked_total<I>(values: I, what: &str) -> EngineResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |total, value| total.checked_add(value))
        .ok_or_else(|| overflow(what))
}
