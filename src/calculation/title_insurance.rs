//! Title insurance premiums.
//!
//! The combined premium is priced off the purchase price plus a flat
//! issuance fee. The lender's policy is priced off the loan at the
//! simultaneous-issue rate, and the owner's policy is whatever remains of the
//! combined premium. Declining the owner's policy raises the lender's rate by
//! the configured multiplier.

use rust_decimal::Decimal;

use crate::config::RateTableConfig;
use crate::error::EngineResult;
use crate::models::{AuditStep, TitleInsurance};

use super::lookup::tiered_lookup;
use super::rounding::{percent_of, round_money};

/// The result of a title insurance calculation.
#[derive(Debug, Clone)]
pub struct TitleInsuranceResult {
    /// The premiums.
    pub title_insurance: TitleInsurance,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates the total, lender's and owner's title premiums.
///
/// # Arguments
///
/// * `purchase_price` - Selects the combined-premium tier
/// * `loan_amount` - Selects the lender's simultaneous-issue tier
/// * `owners_policy_included` - Whether the borrower buys the owner's policy
/// * `config` - The rate tables
/// * `step_number` - The step number for audit trail sequencing
///
/// # Examples
///
/// ```
/// use mortgage_engine::calculation::calculate_title_insurance;
/// use mortgage_engine::config::ConfigLoader;
/// use rust_decimal_macros::dec;
///
/// let config = ConfigLoader::load("./config/rate_tables.yaml").unwrap().into_config();
/// let result = calculate_title_insurance(dec!(400000), dec!(360000), true, &config, 1).unwrap();
/// let title = result.title_insurance;
/// assert_eq!(title.total_premium, dec!(1975.00));
/// assert_eq!(title.lender_premium, dec!(792.00));
/// assert_eq!(title.owners_premium, dec!(1183.00));
/// ```
pub fn calculate_title_insurance(
    purchase_price: Decimal,
    loan_amount: Decimal,
    owners_policy_included: bool,
    config: &RateTableConfig,
    step_number: u32,
) -> EngineResult<TitleInsuranceResult> {
    let table = config.title_insurance()?;

    let total_rate = tiered_lookup(&table.total_rates_tiers, purchase_price, "title_insurance.total_rates_tiers")?.rate;
    let total_premium = round_money(percent_of(purchase_price, total_rate) + table.issuance_fee);

    let simultaneous_rate = tiered_lookup(
        &table.lender_rates_simultaneous_tiers,
        loan_amount,
        "title_insurance.lender_rates_simultaneous_tiers",
    )?
    .rate;

    let (lender_rate, lender_premium, owners_premium) = if owners_policy_included {
        let lender_premium = round_money(percent_of(loan_amount, simultaneous_rate));
        let owners_premium = (total_premium - lender_premium).max(Decimal::ZERO);
        (simultaneous_rate, lender_premium, owners_premium)
    } else {
        let lender_rate = simultaneous_rate * table.no_owners_title_multiplier;
        (lender_rate, round_money(percent_of(loan_amount, lender_rate)), Decimal::ZERO)
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "title_insurance".to_string(),
        rule_name: "Title Insurance".to_string(),
        input: serde_json::json!({
            "purchase_price": purchase_price.to_string(),
            "loan_amount": loan_amount.to_string(),
            "owners_policy_included": owners_policy_included
        }),
        output: serde_json::json!({
            "total_rate": total_rate.to_string(),
            "lender_rate": lender_rate.to_string(),
            "total_premium": total_premium.to_string(),
            "lender_premium": lender_premium.to_string(),
            "owners_premium": owners_premium.to_string()
        }),
        reasoning: if owners_policy_included {
            format!(
                "Total {}% + ${} issuance = ${}; lender {}% = ${}; owner's residual ${}",
                total_rate, table.issuance_fee, total_premium, lender_rate, lender_premium, owners_premium
            )
        } else {
            format!(
                "Owner's policy declined: lender {}% × {} = ${}",
                simultaneous_rate, table.no_owners_title_multiplier, lender_premium
            )
        },
    };

    Ok(TitleInsuranceResult {
        title_insurance: TitleInsurance {
            total_premium,
            lender_premium,
            owners_premium,
            owners_policy_included,
        },
        audit_step,
    })
}
