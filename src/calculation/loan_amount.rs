//! Loan amount and LTV resolution.
//!
//! Resolves the down payment into dollars and percent, derives the base
//! loan, adds the financed fee to get the total loan, and computes the base
//! LTV used for reporting and for PMI/MIP category selection.

use rust_decimal::Decimal;

use crate::config::RateTableConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, AuditWarning, DownPayment, LoanRequest};

use super::financed_fee::calculate_financed_fee;
use super::rounding::{percent_of, round_money, round_rate};

/// The resolved loan amounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanAmounts {
    /// Purchase price (appraised value for a refinance).
    pub purchase_price: Decimal,
    /// Down payment in dollars.
    pub down_payment: Decimal,
    /// Down payment in percent of the purchase price.
    pub down_payment_percent: Decimal,
    /// Purchase price less down payment.
    pub base_loan: Decimal,
    /// Upfront fee added to the principal.
    pub financed_fees: Decimal,
    /// Base loan plus financed fees.
    pub total_loan: Decimal,
    /// `base_loan / purchase_price × 100`, rounded to 3 decimal places.
    pub base_ltv: Decimal,
}

/// The result of loan resolution, including the financed fee audit.
#[derive(Debug, Clone)]
pub struct LoanResolution {
    /// The resolved amounts.
    pub amounts: LoanAmounts,
    /// Warnings raised while pricing the financed fee.
    pub warnings: Vec<AuditWarning>,
    /// Audit steps: financed fee, then loan resolution.
    pub audit_steps: Vec<AuditStep>,
}

/// Resolves base loan, financed fees, total loan and base LTV.
///
/// # Arguments
///
/// * `request` - The validated loan request
/// * `config` - The rate tables
/// * `step_number` - The first step number; two steps are recorded
///
/// # Examples
///
/// ```
/// use mortgage_engine::calculation::resolve_loan;
/// use mortgage_engine::config::ConfigLoader;
/// use mortgage_engine::models::{DownPayment, LoanRequest, LoanType};
/// use rust_decimal_macros::dec;
///
/// let config = ConfigLoader::load("./config/rate_tables.yaml").unwrap().into_config();
/// let request = LoanRequest::new(
///     dec!(400000),
///     DownPayment::Percent(dec!(10)),
///     dec!(6.5),
///     30,
///     LoanType::Conventional,
/// );
///
/// let resolution = resolve_loan(&request, &config, 1).unwrap();
/// assert_eq!(resolution.amounts.base_loan, dec!(360000));
/// assert_eq!(resolution.amounts.base_ltv, dec!(90.000));
/// ```
pub fn resolve_loan(
    request: &LoanRequest,
    config: &RateTableConfig,
    step_number: u32,
) -> EngineResult<LoanResolution> {
    let purchase_price = request.purchase_price;
    if purchase_price <= Decimal::ZERO {
        return Err(EngineError::CalculationError {
            message: "purchase price must be positive".to_string(),
        });
    }

    let (down_payment, down_payment_percent) = match request.down_payment {
        DownPayment::Amount(amount) => (
            round_money(amount),
            round_rate(amount / purchase_price * Decimal::ONE_HUNDRED),
        ),
        DownPayment::Percent(percent) => (round_money(percent_of(purchase_price, percent)), percent),
    };

    let base_loan = purchase_price - down_payment;
    let base_ltv = round_rate(base_loan / purchase_price * Decimal::ONE_HUNDRED);

    let fee = calculate_financed_fee(
        request.loan_type,
        base_loan,
        down_payment_percent,
        &request.va,
        config,
        step_number,
    )?;
    let total_loan = base_loan + fee.amount;

    let audit_step = AuditStep {
        step_number: step_number + 1,
        rule_id: "loan_resolution".to_string(),
        rule_name: "Loan Amount and LTV".to_string(),
        input: serde_json::json!({
            "purchase_price": purchase_price.to_string(),
            "down_payment": down_payment.to_string(),
            "down_payment_percent": down_payment_percent.to_string()
        }),
        output: serde_json::json!({
            "base_loan": base_loan.to_string(),
            "financed_fees": fee.amount.to_string(),
            "total_loan": total_loan.to_string(),
            "base_ltv": base_ltv.to_string()
        }),
        reasoning: format!(
            "${} - ${} down = ${} base loan ({}% LTV); + ${} financed = ${}",
            purchase_price.normalize(),
            down_payment.normalize(),
            base_loan.normalize(),
            base_ltv.normalize(),
            fee.amount.normalize(),
            total_loan.normalize()
        ),
    };

    Ok(LoanResolution {
        amounts: LoanAmounts {
            purchase_price,
            down_payment,
            down_payment_percent,
            base_loan,
            financed_fees: fee.amount,
            total_loan,
            base_ltv,
        },
        warnings: fee.warnings,
        audit_steps: vec![fee.audit_step, audit_step],
    })
}
