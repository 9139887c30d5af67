//! Financed fee calculation.
//!
//! Government programs charge a one-time fee that is added to the loan
//! principal rather than paid at closing:
//!
//! - **FHA:** upfront MIP, `base_loan × upfront_mip_rate`
//! - **VA:** funding fee from the service × down payment × usage matrix,
//!   waived for disability-exempt borrowers
//! - **USDA:** upfront guarantee fee, `base_loan × upfront_fee_rate`
//! - **Conventional:** none

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::config::{DownPaymentBracket, RateTableConfig};
use crate::error::EngineResult;
use crate::models::{AuditStep, AuditWarning, LoanType, VaDetails, VaService, VaUsage, WarningSeverity};

use super::lookup::{CellLookup, lookup_cell};
use super::rounding::{percent_of, round_money};

/// VA funding fee used when neither the requested cell nor the
/// first-use/active/<5% cell is configured.
pub const DEFAULT_VA_FUNDING_FEE_RATE: Decimal = dec!(2.15);

/// Warning code raised when the VA funding fee cell is missing.
pub const VA_FUNDING_FEE_DEFAULTED: &str = "VA_FUNDING_FEE_DEFAULTED";

/// The result of a financed fee calculation.
#[derive(Debug, Clone)]
pub struct FinancedFeeResult {
    /// Fee added to the principal, rounded to cents.
    pub amount: Decimal,
    /// The fee rate applied, in percent of the base loan.
    pub rate: Decimal,
    /// Warnings raised by fallback lookups.
    pub warnings: Vec<AuditWarning>,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates the one-time fee financed into the loan.
///
/// # Arguments
///
/// * `loan_type` - The loan program
/// * `base_loan` - Purchase price less down payment
/// * `down_payment_percent` - Down payment in percent, selects the VA bracket
/// * `va` - VA service category, usage and exemption
/// * `config` - The rate tables
/// * `step_number` - The step number for audit trail sequencing
///
/// # Errors
///
/// Returns [`crate::error::EngineError::Configuration`] only when the whole
/// program section (`fha`, `va` or `usda`) is absent. A missing VA matrix
/// cell falls back to the first-use/active/<5% cell, then to
/// [`DEFAULT_VA_FUNDING_FEE_RATE`], with a warning.
///
/// # Examples
///
/// ```
/// use mortgage_engine::calculation::calculate_financed_fee;
/// use mortgage_engine::config::ConfigLoader;
/// use mortgage_engine::models::{LoanType, VaDetails};
/// use rust_decimal_macros::dec;
///
/// let config = ConfigLoader::load("./config/rate_tables.yaml").unwrap().into_config();
/// let result = calculate_financed_fee(
///     LoanType::Fha,
///     dec!(386000),
///     dec!(3.5),
///     &VaDetails::default(),
///     &config,
///     1,
/// )
/// .unwrap();
/// assert_eq!(result.amount, dec!(6755.00));
/// ```
pub fn calculate_financed_fee(
    loan_type: LoanType,
    base_loan: Decimal,
    down_payment_percent: Decimal,
    va: &VaDetails,
    config: &RateTableConfig,
    step_number: u32,
) -> EngineResult<FinancedFeeResult> {
    let mut warnings = Vec::new();

    let (rate, reasoning) = match loan_type {
        LoanType::Conventional => (
            Decimal::ZERO,
            "Conventional loans have no financed fee".to_string(),
        ),
        LoanType::Fha => {
            let rate = config.fha()?.upfront_mip_rate;
            (rate, format!("FHA upfront MIP at {}% of base loan", rate))
        }
        LoanType::Va if va.disability_exempt => (
            Decimal::ZERO,
            "VA funding fee waived for disability-exempt borrower".to_string(),
        ),
        LoanType::Va => {
            let bracket = DownPaymentBracket::for_percent(down_payment_percent);
            let lookup = va_funding_fee_rate(config, va, bracket)?;
            if lookup.is_degraded() {
                warnings.push(AuditWarning::new(
                    VA_FUNDING_FEE_DEFAULTED,
                    format!(
                        "No VA funding fee configured for {:?}/{:?}/{:?}; fallback rate used",
                        va.service, bracket, va.usage
                    ),
                    WarningSeverity::Medium,
                ));
            }
            let rate = lookup.into_value();
            (
                rate,
                format!(
                    "VA funding fee at {}% ({:?}, {:?} down, {:?})",
                    rate, va.service, bracket, va.usage
                ),
            )
        }
        LoanType::Usda => {
            let rate = config.usda()?.upfront_fee_rate;
            (rate, format!("USDA upfront guarantee fee at {}% of base loan", rate))
        }
    };

    let amount = round_money(percent_of(base_loan, rate));

    let audit_step = AuditStep {
        step_number,
        rule_id: "financed_fee".to_string(),
        rule_name: "Financed Fee".to_string(),
        input: serde_json::json!({
            "loan_type": loan_type.code(),
            "base_loan": base_loan.to_string(),
            "down_payment_percent": down_payment_percent.to_string(),
            "va_disability_exempt": va.disability_exempt
        }),
        output: serde_json::json!({
            "rate": rate.to_string(),
            "amount": amount.to_string()
        }),
        reasoning,
    };

    Ok(FinancedFeeResult {
        amount,
        rate,
        warnings,
        audit_step,
    })
}

fn va_funding_fee_rate(
    config: &RateTableConfig,
    va: &VaDetails,
    bracket: DownPaymentBracket,
) -> EngineResult<CellLookup<Decimal>> {
    let matrix = &config.va()?.funding_fee;
    let cell = |service: VaService, bracket: DownPaymentBracket, usage: VaUsage| {
        matrix
            .get(&service)
            .and_then(|by_bracket| by_bracket.get(&bracket))
            .and_then(|by_usage| by_usage.get(&usage))
            .copied()
    };

    Ok(lookup_cell(
        cell(va.service, bracket, va.usage),
        cell(VaService::Active, DownPaymentBracket::LessThan5, VaUsage::FirstUse),
        DEFAULT_VA_FUNDING_FEE_RATE,
        "va.funding_fee",
        &format!("{:?}/{:?}/{:?}", va.service, bracket, va.usage),
    ))
}
