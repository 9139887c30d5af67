//! Principal and interest payment.
//!
//! Standard fixed-rate amortization:
//!
//! ```text
//! payment = P · r(1+r)^n / ((1+r)^n − 1)
//! ```
//!
//! with `r` the monthly rate, `n` the number of monthly payments and `P` the
//! total loan including financed fees. A zero rate pays `P / n`.

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;

use crate::error::{EngineError, EngineResult};
use crate::models::AuditStep;

use super::rounding::round_money;

/// The result of an amortization calculation.
#[derive(Debug, Clone)]
pub struct AmortizationResult {
    /// Monthly principal and interest, rounded to cents.
    pub monthly_payment: Decimal,
    /// Number of monthly payments.
    pub payments: u32,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates the monthly principal and interest payment.
///
/// # Arguments
///
/// * `principal` - The total loan amount
/// * `annual_rate` - Annual nominal rate in percent (`6.5` means 6.5%)
/// * `term_years` - Loan term in years
/// * `step_number` - The step number for audit trail sequencing
///
/// # Errors
///
/// Returns [`EngineError::CalculationError`] for a zero term or when
/// `(1+r)^n` overflows.
///
/// # Examples
///
/// ```
/// use mortgage_engine::calculation::calculate_amortization;
/// use rust_decimal_macros::dec;
///
/// let result = calculate_amortization(dec!(360000), dec!(6.5), 30, 1).unwrap();
/// assert_eq!(result.monthly_payment, dec!(2275.44));
/// ```
pub fn calculate_amortization(
    principal: Decimal,
    annual_rate: Decimal,
    term_years: u32,
    step_number: u32,
) -> EngineResult<AmortizationResult> {
    let payments = term_years
        .checked_mul(12)
        .filter(|n| *n > 0)
        .ok_or_else(|| EngineError::CalculationError {
            message: format!("invalid loan term of {} years", term_years),
        })?;
    let n = Decimal::from(payments);
    let monthly_rate = annual_rate / Decimal::from(12) / Decimal::ONE_HUNDRED;

    let unrounded = if monthly_rate.is_zero() {
        principal / n
    } else {
        let growth = (Decimal::ONE + monthly_rate)
            .checked_powu(u64::from(payments))
            .ok_or_else(|| EngineError::CalculationError {
                message: format!(
                    "compound factor overflowed for {}% over {} payments",
                    annual_rate, payments
                ),
            })?;
        principal * monthly_rate * growth / (growth - Decimal::ONE)
    };
    let monthly_payment = round_money(unrounded);

    let audit_step = AuditStep {
        step_number,
        rule_id: "amortization".to_string(),
        rule_name: "Principal and Interest".to_string(),
        input: serde_json::json!({
            "principal": principal.to_string(),
            "annual_rate": annual_rate.to_string(),
            "term_years": term_years
        }),
        output: serde_json::json!({
            "payments": payments,
            "monthly_payment": monthly_payment.to_string()
        }),
        reasoning: if monthly_rate.is_zero() {
            format!(
                "${} / {} payments at 0% = ${}",
                principal.normalize(),
                payments,
                monthly_payment
            )
        } else {
            format!(
                "${} at {}% over {} payments = ${}/month",
                principal.normalize(),
                annual_rate.normalize(),
                payments,
                monthly_payment
            )
        },
    };

    Ok(AmortizationResult {
        monthly_payment,
        payments,
        audit_step,
    })
}
