//! Recurring mortgage insurance calculation.
//!
//! Each program prices its monthly insurance or guarantee fee differently:
//!
//! | Program      | Rate source                                    | Charged on   |
//! |--------------|------------------------------------------------|--------------|
//! | Conventional | PMI LTV tier + credit score adjustment (>80%)  | total loan   |
//! | FHA          | annual MIP `[term][amount]` cell, LTV tier     | total loan   |
//! | VA           | none                                           | n/a          |
//! | USDA         | annual guarantee fee                           | base loan    |
//!
//! FHA categories are selected from the base loan and base LTV. A missing
//! FHA cell falls back to 0.55% (long term) or 0.40% (short term).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::warn;

use crate::config::{AmountCategory, CreditScoreBand, FhaTable, PmiTable, RateTableConfig, TermCategory};
use crate::error::EngineResult;
use crate::models::{AuditStep, AuditWarning, LoanType, WarningSeverity};

use super::loan_amount::LoanAmounts;
use super::lookup::{lookup_cell, tiered_lookup};
use super::rounding::{percent_of, round_money, round_rate};

/// LTV at or below which conventional loans carry no PMI.
pub const PMI_LTV_THRESHOLD: Decimal = dec!(80);

/// Annual MIP used when a long-term FHA cell is missing.
pub const FHA_LONG_TERM_DEFAULT_MIP: Decimal = dec!(0.55);

/// Annual MIP used when a short-term FHA cell is missing.
pub const FHA_SHORT_TERM_DEFAULT_MIP: Decimal = dec!(0.40);

/// Warning code raised when an FHA annual MIP cell is missing.
pub const FHA_MIP_DEFAULTED: &str = "FHA_MIP_DEFAULTED";

/// Warning code raised when no credit score band covers the borrower.
pub const PMI_CREDIT_ADJUSTMENT_MISSING: &str = "PMI_CREDIT_ADJUSTMENT_MISSING";

/// The result of a mortgage insurance calculation.
#[derive(Debug, Clone)]
pub struct MortgageInsuranceResult {
    /// Monthly premium, rounded to cents.
    pub monthly_premium: Decimal,
    /// Annual rate applied, in percent.
    pub annual_rate: Decimal,
    /// Warnings raised by fallback lookups.
    pub warnings: Vec<AuditWarning>,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

struct Premium {
    annual_rate: Decimal,
    charged_on: Decimal,
    reasoning: String,
    warning: Option<AuditWarning>,
}

/// Calculates the monthly mortgage insurance premium.
///
/// # Arguments
///
/// * `loan_type` - The loan program
/// * `amounts` - The resolved loan amounts and base LTV
/// * `term_years` - Loan term, selects the FHA term category
/// * `credit_score` - Borrower score for the conventional PMI adjustment
/// * `config` - The rate tables
/// * `step_number` - The step number for audit trail sequencing
///
/// # Errors
///
/// Returns [`crate::error::EngineError::Configuration`] when the program's
/// section is absent, or when a PMI LTV schedule has no tier for the LTV.
pub fn calculate_mortgage_insurance(
    loan_type: LoanType,
    amounts: &LoanAmounts,
    term_years: u32,
    credit_score: u16,
    config: &RateTableConfig,
    step_number: u32,
) -> EngineResult<MortgageInsuranceResult> {
    let premium = match loan_type {
        LoanType::Conventional if amounts.base_ltv <= PMI_LTV_THRESHOLD => Premium {
            annual_rate: Decimal::ZERO,
            charged_on: amounts.total_loan,
            reasoning: format!(
                "LTV {}% is at or below {}%, no PMI required",
                amounts.base_ltv.normalize(),
                PMI_LTV_THRESHOLD
            ),
            warning: None,
        },
        LoanType::Conventional => conventional_pmi(config.pmi()?, amounts, credit_score)?,
        LoanType::Fha => fha_annual_mip(config.fha()?, amounts, term_years)?,
        LoanType::Va => Premium {
            annual_rate: Decimal::ZERO,
            charged_on: amounts.total_loan,
            reasoning: "VA loans carry no monthly mortgage insurance".to_string(),
            warning: None,
        },
        LoanType::Usda => {
            let rate = config.usda()?.annual_fee_rate;
            Premium {
                annual_rate: rate,
                charged_on: amounts.base_loan,
                reasoning: format!("USDA annual guarantee fee {}% on base loan", rate),
                warning: None,
            }
        }
    };

    let monthly_premium = round_money(percent_of(premium.charged_on, premium.annual_rate) / Decimal::from(12));

    let audit_step = AuditStep {
        step_number,
        rule_id: "mortgage_insurance".to_string(),
        rule_name: "Mortgage Insurance".to_string(),
        input: serde_json::json!({
            "loan_type": loan_type.code(),
            "base_ltv": amounts.base_ltv.to_string(),
            "charged_on": premium.charged_on.to_string(),
            "term_years": term_years,
            "credit_score": credit_score
        }),
        output: serde_json::json!({
            "annual_rate": premium.annual_rate.to_string(),
            "monthly_premium": monthly_premium.to_string()
        }),
        reasoning: premium.reasoning,
    };

    Ok(MortgageInsuranceResult {
        monthly_premium,
        annual_rate: premium.annual_rate,
        warnings: premium.warning.into_iter().collect(),
        audit_step,
    })
}

fn conventional_pmi(pmi: &PmiTable, amounts: &LoanAmounts, credit_score: u16) -> EngineResult<Premium> {
    let base_rate = tiered_lookup(&pmi.ltv_tiers, amounts.base_ltv, "pmi.ltv_tiers")?.rate;

    let (adjustment, warning) = match credit_score_adjustment(&pmi.credit_score_adjustments, credit_score) {
        Some(band) => (band.adjustment, None),
        None => {
            warn!(credit_score, "No PMI credit score band covers score, no adjustment applied");
            (
                Decimal::ZERO,
                Some(AuditWarning::new(
                    PMI_CREDIT_ADJUSTMENT_MISSING,
                    format!("No PMI credit score band covers {}; no adjustment applied", credit_score),
                    WarningSeverity::Low,
                )),
            )
        }
    };

    let annual_rate = round_rate(base_rate + adjustment);
    Ok(Premium {
        annual_rate,
        charged_on: amounts.total_loan,
        reasoning: format!(
            "LTV {}% -> {}% PMI, score {} adjusts {}% = {}% annual",
            amounts.base_ltv.normalize(),
            base_rate,
            credit_score,
            adjustment,
            annual_rate
        ),
        warning,
    })
}

/// Returns the band with the highest `min_score` at or below `credit_score`.
fn credit_score_adjustment(bands: &[CreditScoreBand], credit_score: u16) -> Option<&CreditScoreBand> {
    bands
        .iter()
        .filter(|band| band.min_score <= credit_score)
        .max_by_key(|band| band.min_score)
}

/// Only an absent `[term][amount]` cell falls back to the default; a cell
/// whose schedule covers no LTV is a configuration error.
fn fha_annual_mip(fha: &FhaTable, amounts: &LoanAmounts, term_years: u32) -> EngineResult<Premium> {
    let term = if term_years > fha.long_term_threshold_years {
        TermCategory::LongTerm
    } else {
        TermCategory::ShortTerm
    };
    let amount = if amounts.base_loan > fha.high_balance_threshold {
        AmountCategory::HighBalance
    } else {
        AmountCategory::Standard
    };
    let default = match term {
        TermCategory::LongTerm => FHA_LONG_TERM_DEFAULT_MIP,
        TermCategory::ShortTerm => FHA_SHORT_TERM_DEFAULT_MIP,
    };

    let cell = match fha.annual_mip.get(&term).and_then(|by_amount| by_amount.get(&amount)) {
        Some(tiers) => Some(tiered_lookup(tiers, amounts.base_ltv, "fha.annual_mip")?.rate),
        None => None,
    };
    let key = format!("{:?}/{:?}/ltv {}", term, amount, amounts.base_ltv);
    let lookup = lookup_cell(cell, None, default, "fha.annual_mip", &key);

    let warning = lookup.is_degraded().then(|| {
        AuditWarning::new(
            FHA_MIP_DEFAULTED,
            format!("No FHA annual MIP configured for {}; using {}%", key, default),
            WarningSeverity::Medium,
        )
    });
    let annual_rate = lookup.into_value();

    Ok(Premium {
        annual_rate,
        charged_on: amounts.total_loan,
        reasoning: format!(
            "FHA {:?}/{:?} at {}% LTV -> {}% annual MIP on total loan",
            term,
            amount,
            amounts.base_ltv.normalize(),
            annual_rate
        ),
        warning,
    })
}
