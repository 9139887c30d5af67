//! Prepaid items and the initial escrow deposit.
//!
//! Prepaid interest covers the closing day through the end of its month at
//! a per-diem rate on a 360-day year. Prepaid tax and insurance, and the
//! escrow deposit, are whole months of the monthly amounts; prepaid months
//! and escrow months are configured independently.
//!
//! Every line item is rounded to cents and totals are sums of the rounded
//! items.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use tracing::info;

use crate::config::RateTableConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, AuditWarning, EscrowDeposit, LoanRequest, PrepaidItems, WarningSeverity};

use super::loan_amount::LoanAmounts;
use super::rounding::{checked_months, checked_percent_of, checked_total, percent_of, round_money};

/// Warning code raised when no closing date is given.
pub const INTEREST_DAYS_DEFAULTED: &str = "INTEREST_DAYS_DEFAULTED";

/// Prepaid interest line item.
pub const PREPAID_INTEREST: &str = "prepaid_interest";
/// Property tax line item, in both prepaids and escrow.
pub const PROPERTY_TAX: &str = "property_tax";
/// Hazard insurance line item, in both prepaids and escrow.
pub const HOME_INSURANCE: &str = "home_insurance";

/// The result of a prepaid and escrow calculation.
#[derive(Debug, Clone)]
pub struct PrepaidEscrowResult {
    /// Prepaid interest, tax and insurance.
    pub prepaid_items: PrepaidItems,
    /// Initial escrow deposit.
    pub escrow_deposit: EscrowDeposit,
    /// Monthly property tax, rounded.
    pub monthly_property_tax: Decimal,
    /// Monthly hazard insurance, rounded.
    pub monthly_home_insurance: Decimal,
    /// Warnings raised when a default was used.
    pub warnings: Vec<AuditWarning>,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Counts days from `date` through the last day of its month, inclusive.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use mortgage_engine::calculation::days_through_month_end;
///
/// let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
/// assert_eq!(days_through_month_end(date).unwrap(), 22);
/// ```
pub fn days_through_month_end(date: NaiveDate) -> EngineResult<u32> {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    let last_day = NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .ok_or_else(|| EngineError::CalculationError {
            message: format!("cannot determine month end for {}", date),
        })?;
    Ok(last_day.day() - date.day() + 1)
}

/// Calculates prepaid items and the initial escrow deposit.
///
/// # Arguments
///
/// * `request` - Supplies the rate, tax and insurance rates, and closing date
/// * `amounts` - Supplies the purchase price and total loan
/// * `config` - The rate tables
/// * `step_number` - The step number for audit trail sequencing
///
/// # Errors
///
/// Returns [`EngineError::Configuration`] when the `prepaids` section is
/// absent or its day basis is zero.
pub fn calculate_prepaids_and_escrow(
    request: &LoanRequest,
    amounts: &LoanAmounts,
    config: &RateTableConfig,
    step_number: u32,
) -> EngineResult<PrepaidEscrowResult> {
    let table = config.prepaids()?;
    if table.interest_day_basis == 0 {
        return Err(EngineError::Configuration {
            section: "prepaids".to_string(),
            message: "interest_day_basis must be positive".to_string(),
        });
    }

    let mut warnings = Vec::new();
    let interest_days = match request.closing_date {
        Some(date) => days_through_month_end(date)?,
        None => {
            info!(
                days = table.default_interest_days,
                "No closing date supplied, using default prepaid interest days"
            );
            warnings.push(AuditWarning::new(
                INTEREST_DAYS_DEFAULTED,
                format!(
                    "No closing date; prepaid interest assumes {} days",
                    table.default_interest_days
                ),
                WarningSeverity::Low,
            ));
            table.default_interest_days
        }
    };

    let unrounded_daily = percent_of(amounts.total_loan, request.interest_rate)
        / Decimal::from(table.interest_day_basis);
    let daily_interest = round_money(unrounded_daily);
    let prepaid_interest = round_money(unrounded_daily * Decimal::from(interest_days));

    let twelve = Decimal::from(12);
    let monthly_property_tax = round_money(
        checked_percent_of(amounts.purchase_price, request.property_tax_rate, "property tax")? / twelve,
    );
    let monthly_home_insurance = round_money(
        checked_percent_of(amounts.purchase_price, request.insurance_rate, "home insurance")? / twelve,
    );

    let prepaid = BTreeMap::from([
        (PREPAID_INTEREST.to_string(), prepaid_interest),
        (
            PROPERTY_TAX.to_string(),
            checked_months(monthly_property_tax, table.months_tax_prepaid, "prepaid property tax")?,
        ),
        (
            HOME_INSURANCE.to_string(),
            checked_months(monthly_home_insurance, table.months_insurance_prepaid, "prepaid insurance")?,
        ),
    ]);
    let escrow = BTreeMap::from([
        (
            PROPERTY_TAX.to_string(),
            checked_months(monthly_property_tax, table.months_tax_escrow, "escrowed property tax")?,
        ),
        (
            HOME_INSURANCE.to_string(),
            checked_months(monthly_home_insurance, table.months_insurance_escrow, "escrowed insurance")?,
        ),
    ]);
    let prepaid_total = checked_total(prepaid.values().copied(), "prepaid total")?;
    let escrow_total = checked_total(escrow.values().copied(), "escrow total")?;

    let audit_step = AuditStep {
        step_number,
        rule_id: "prepaid_escrow".to_string(),
        rule_name: "Prepaids and Escrow".to_string(),
        input: serde_json::json!({
            "total_loan": amounts.total_loan.to_string(),
            "interest_rate": request.interest_rate.to_string(),
            "closing_date": request.closing_date.map(|d| d.to_string()),
            "property_tax_rate": request.property_tax_rate.to_string(),
            "insurance_rate": request.insurance_rate.to_string()
        }),
        output: serde_json::json!({
            "interest_days": interest_days,
            "daily_interest": daily_interest.to_string(),
            "prepaid_total": prepaid_total.to_string(),
            "escrow_total": escrow_total.to_string()
        }),
        reasoning: format!(
            "{} days × ${}/day = ${} interest; tax {}+{} months, insurance {}+{} months (prepaid+escrow)",
            interest_days,
            daily_interest,
            prepaid_interest,
            table.months_tax_prepaid,
            table.months_tax_escrow,
            table.months_insurance_prepaid,
            table.months_insurance_escrow
        ),
    };

    Ok(PrepaidEscrowResult {
        prepaid_items: PrepaidItems {
            items: prepaid,
            interest_days,
            daily_interest,
            total: prepaid_total,
        },
        escrow_deposit: EscrowDeposit {
            items: escrow,
            total: escrow_total,
        },
        monthly_property_tax,
        monthly_home_insurance,
        warnings,
        audit_step,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PrepaidTable;
    use crate::models::{DownPayment, LoanType};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_test_config() -> RateTableConfig {
        RateTableConfig {
            prepaids: Some(PrepaidTable {
                months_tax_prepaid: 2,
                months_insurance_prepaid: 12,
                months_tax_escrow: 3,
                months_insurance_escrow: 2,
                interest_day_basis: 360,
                default_interest_days: 30,
            }),
            ..RateTableConfig::default()
        }
    }

    fn create_test_request(closing_date: Option<NaiveDate>) -> (LoanRequest, LoanAmounts) {
        let mut request = LoanRequest::new(
            dec!(375000),
            DownPayment::Amount(dec!(75000)),
            dec!(5.0),
            30,
            LoanType::Conventional,
        );
        request.property_tax_rate = dec!(1.2);
        request.insurance_rate = dec!(0.35);
        request.closing_date = closing_date;

        let amounts = LoanAmounts {
            purchase_price: dec!(375000),
            down_payment: dec!(75000),
            down_payment_percent: dec!(20),
            base_loan: dec!(300000),
            financed_fees: Decimal::ZERO,
            total_loan: dec!(300000),
            base_ltv: dec!(80),
        };
        (request, amounts)
    }

    #[test]
    fn test_days_through_month_end() {
        assert_eq!(days_through_month_end(date(2025, 3, 10)).unwrap(), 22);
        assert_eq!(days_through_month_end(date(2025, 3, 31)).unwrap(), 1);
        assert_eq!(days_through_month_end(date(2025, 2, 1)).unwrap(), 28);
        assert_eq!(days_through_month_end(date(2024, 2, 15)).unwrap(), 15);
        assert_eq!(days_through_month_end(date(2025, 12, 1)).unwrap(), 31);
    }

    #[test]
    fn test_prepaid_interest_from_closing_date() {
        let (request, amounts) = create_test_request(Some(date(2025, 3, 10)));
        let result = calculate_prepaids_and_escrow(&request, &amounts, &create_test_config(), 1).unwrap();
        let prepaid = &result.prepaid_items;

        assert_eq!(prepaid.interest_days, 22);
        assert_eq!(prepaid.daily_interest, dec!(41.67));
        // 41.6666... × 22 rounded once, not 41.67 × 22 = 916.74
        assert_eq!(prepaid.items[PREPAID_INTEREST], dec!(916.67));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_missing_closing_date_defaults_to_thirty_days() {
        let (request, amounts) = create_test_request(None);
        let result = calculate_prepaids_and_escrow(&request, &amounts, &create_test_config(), 1).unwrap();

        assert_eq!(result.prepaid_items.interest_days, 30);
        assert_eq!(result.prepaid_items.items[PREPAID_INTEREST], dec!(1250.00));
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].code, INTEREST_DAYS_DEFAULTED);
    }

    #[test]
    fn test_prepaid_and_escrow_months_are_independent() {
        let (request, amounts) = create_test_request(Some(date(2025, 3, 10)));
        let result = calculate_prepaids_and_escrow(&request, &amounts, &create_test_config(), 1).unwrap();

        // 375000 × 1.2% / 12 = 375.00; 375000 × 0.35% / 12 = 109.375 -> 109.38
        assert_eq!(result.monthly_property_tax, dec!(375.00));
        assert_eq!(result.monthly_home_insurance, dec!(109.38));

        assert_eq!(result.prepaid_items.items[PROPERTY_TAX], dec!(750.00));
        assert_eq!(result.prepaid_items.items[HOME_INSURANCE], dec!(1312.56));
        assert_eq!(result.escrow_deposit.items[PROPERTY_TAX], dec!(1125.00));
        assert_eq!(result.escrow_deposit.items[HOME_INSURANCE], dec!(218.76));
    }

    #[test]
    fn test_totals_are_sums_of_rounded_items() {
        let (request, amounts) = create_test_request(Some(date(2025, 3, 10)));
        let result = calculate_prepaids_and_escrow(&request, &amounts, &create_test_config(), 1).unwrap();

        assert_eq!(result.prepaid_items.total, dec!(916.67) + dec!(750.00) + dec!(1312.56));
        assert_eq!(result.escrow_deposit.total, dec!(1343.76));
    }

    #[test]
    fn test_zero_day_basis_is_configuration_error() {
        let mut config = create_test_config();
        if let Some(prepaids) = config.prepaids.as_mut() {
            prepaids.interest_day_basis = 0;
        }
        let (request, amounts) = create_test_request(None);
        let result = calculate_prepaids_and_escrow(&request, &amounts, &config, 1);
        assert!(matches!(result, Err(EngineError::Configuration { .. })));
    }
}
