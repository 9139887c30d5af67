//! Result assembly.
//!
//! Runs every calculator for a validated request in pipeline order and
//! merges the sub-results, audit steps and warnings into one
//! [`CalculationResult`].

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::RateTableConfig;
use crate::error::EngineResult;
use crate::models::{
    AuditStep, AuditTrace, AuditWarning, CalculationResult, LoanDetails, LoanRequest, MonthlyPayment,
    WarningSeverity,
};

use super::amortization::calculate_amortization;
use super::closing_costs::calculate_closing_costs;
use super::contribution_limit::calculate_contribution_limit;
use super::loan_amount::resolve_loan;
use super::mortgage_insurance::calculate_mortgage_insurance;
use super::prepaid_escrow::calculate_prepaids_and_escrow;
use super::rounding::{checked_total, round_money};
use super::title_insurance::calculate_title_insurance;
use super::validation::validate_request;

/// Warning code raised when VA seller concessions exceed the concession cap.
pub const VA_CONCESSION_CAP_EXCEEDED: &str = "VA_CONCESSION_CAP_EXCEEDED";

/// Calculates the full breakdown for a validated loan request.
///
/// The result is a pure function of `request` and `config`; neither is
/// modified.
///
/// # Errors
///
/// Returns [`crate::error::EngineError::Configuration`] when a rate table
/// section the request needs is absent, and
/// [`crate::error::EngineError::CalculationError`] for arithmetic failures.
///
/// # Examples
///
/// ```
/// use mortgage_engine::calculation::calculate_loan;
/// use mortgage_engine::config::ConfigLoader;
/// use mortgage_engine::models::{DownPayment, LoanRequest, LoanType};
/// use rust_decimal_macros::dec;
///
/// let config = ConfigLoader::load("./config/rate_tables.yaml").unwrap().into_config();
/// let request = LoanRequest::new(
///     dec!(400000),
///     DownPayment::Percent(dec!(20)),
///     dec!(6.5),
///     30,
///     LoanType::Conventional,
/// );
///
/// let result = calculate_loan(&request, &config).unwrap();
/// assert_eq!(result.loan_details.total_loan_amount, dec!(320000.00));
/// assert_eq!(result.monthly_payment.mortgage_insurance, dec!(0));
/// ```
pub fn calculate_loan(request: &LoanRequest, config: &RateTableConfig) -> EngineResult<CalculationResult> {
    let mut all_audit_steps: Vec<AuditStep> = Vec::new();
    let mut all_warnings: Vec<AuditWarning> = Vec::new();
    let mut step_number: u32 = 1;

    // Loan amounts (financed fee + resolution)
    let resolution = resolve_loan(request, config, step_number)?;
    step_number += resolution.audit_steps.len() as u32;
    all_audit_steps.extend(resolution.audit_steps);
    all_warnings.extend(resolution.warnings);
    let amounts = resolution.amounts;

    let amortization = calculate_amortization(amounts.total_loan, request.interest_rate, request.term_years, step_number)?;
    all_audit_steps.push(amortization.audit_step);
    step_number += 1;

    let insurance = calculate_mortgage_insurance(
        request.loan_type,
        &amounts,
        request.term_years,
        request.credit_score,
        config,
        step_number,
    )?;
    all_audit_steps.push(insurance.audit_step);
    all_warnings.extend(insurance.warnings);
    step_number += 1;

    let prepaids = calculate_prepaids_and_escrow(request, &amounts, config, step_number)?;
    all_audit_steps.push(prepaids.audit_step);
    all_warnings.extend(prepaids.warnings);
    step_number += 1;

    let title = calculate_title_insurance(
        amounts.purchase_price,
        amounts.total_loan,
        request.owners_title_included(),
        config,
        step_number,
    )?;
    all_audit_steps.push(title.audit_step);
    step_number += 1;

    let contribution = calculate_contribution_limit(
        request.loan_type,
        amounts.purchase_price,
        amounts.base_ltv,
        request.occupancy,
        config,
        step_number,
    )?;
    all_audit_steps.push(contribution.audit_step);
    all_warnings.extend(contribution.warnings);
    step_number += 1;

    let closing = calculate_closing_costs(
        request,
        &amounts,
        &title.title_insurance,
        &contribution.limits,
        config,
        step_number,
    )?;
    all_audit_steps.push(closing.audit_step);
    all_warnings.extend(closing.warnings);
    step_number += 1;

    // VA concessions are seller-paid prepaids and points, capped separately
    if let Some(concession_cap) = contribution.limits.concession_cap {
        let seller_paid = checked_total(
            [prepaids.prepaid_items.total, closing.discount_points_amount],
            "VA concessions",
        )?;
        let concessions = request.seller_credit.min(seller_paid);
        if concessions > concession_cap {
            warn!(%concessions, %concession_cap, "VA seller concessions exceed cap");
            all_warnings.push(AuditWarning::new(
                VA_CONCESSION_CAP_EXCEEDED,
                format!(
                    "Seller concessions of ${} exceed the VA concession cap of ${}",
                    concessions, concession_cap
                ),
                WarningSeverity::High,
            ));
        }
    }

    let principal_and_interest = amortization.monthly_payment;
    let hoa = round_money(request.hoa_monthly);
    let monthly_total = checked_total(
        [
            principal_and_interest,
            prepaids.monthly_property_tax,
            prepaids.monthly_home_insurance,
            insurance.monthly_premium,
            hoa,
        ],
        "monthly payment",
    )?;
    let total_cash_needed = checked_total(
        [
            amounts.down_payment,
            closing.closing_costs.total,
            prepaids.prepaid_items.total,
            prepaids.escrow_deposit.total,
        ],
        "cash to close",
    )?;

    all_audit_steps.push(AuditStep {
        step_number,
        rule_id: "result_assembly".to_string(),
        rule_name: "Monthly Payment and Cash to Close".to_string(),
        input: serde_json::json!({
            "principal_and_interest": principal_and_interest.to_string(),
            "property_tax": prepaids.monthly_property_tax.to_string(),
            "home_insurance": prepaids.monthly_home_insurance.to_string(),
            "mortgage_insurance": insurance.monthly_premium.to_string(),
            "hoa": hoa.to_string()
        }),
        output: serde_json::json!({
            "monthly_total": monthly_total.to_string(),
            "total_cash_needed": total_cash_needed.to_string()
        }),
        reasoning: format!(
            "Monthly ${}; cash to close ${} down + ${} closing + ${} prepaids + ${} escrow = ${}",
            monthly_total,
            amounts.down_payment,
            closing.closing_costs.total,
            prepaids.prepaid_items.total,
            prepaids.escrow_deposit.total,
            total_cash_needed
        ),
    });

    debug!(
        loan_type = request.loan_type.code(),
        total_loan = %amounts.total_loan,
        monthly_total = %monthly_total,
        warnings = all_warnings.len(),
        "Loan calculation assembled"
    );

    Ok(CalculationResult {
        loan_details: LoanDetails {
            purchase_price: amounts.purchase_price,
            down_payment: amounts.down_payment,
            down_payment_percent: amounts.down_payment_percent,
            base_loan_amount: amounts.base_loan,
            financed_fees: amounts.financed_fees,
            total_loan_amount: amounts.total_loan,
            ltv: amounts.base_ltv,
            term_years: request.term_years,
            interest_rate: request.interest_rate,
            loan_type: request.loan_type,
            transaction_type: request.transaction_type,
        },
        monthly_payment: MonthlyPayment {
            principal_and_interest,
            property_tax: prepaids.monthly_property_tax,
            home_insurance: prepaids.monthly_home_insurance,
            mortgage_insurance: insurance.monthly_premium,
            hoa,
            total: monthly_total,
        },
        closing_costs: closing.closing_costs,
        prepaid_items: prepaids.prepaid_items,
        escrow_deposit: prepaids.escrow_deposit,
        credits: closing.credits,
        title_insurance: title.title_insurance,
        contribution_limits: contribution.limits,
        total_cash_needed,
        audit_trace: AuditTrace {
            steps: all_audit_steps,
            warnings: all_warnings,
        },
    })
}

/// Validates a raw request and calculates it.
///
/// # Errors
///
/// Returns [`crate::error::EngineError::Validation`] for the first bad
/// field, otherwise the errors of [`calculate_loan`].
pub fn calculate_from_raw(raw: &Value, config: &RateTableConfig) -> EngineResult<CalculationResult> {
    let request = validate_request(raw, config)?;
    calculate_loan(&request, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::closing_costs::SELLER_CREDIT_EXCEEDS_LIMIT;
    use crate::calculation::prepaid_escrow::INTEREST_DAYS_DEFAULTED;
    use crate::config::ConfigLoader;
    use crate::error::EngineError;
    use crate::models::{ContributionCap, DownPayment, LoanType, TransactionType, VaDetails};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn create_test_config() -> RateTableConfig {
        ConfigLoader::load("./config/rate_tables.yaml")
            .expect("Failed to load config")
            .into_config()
    }

    fn create_scenario_request() -> LoanRequest {
        let mut request = LoanRequest::new(
            dec!(400000),
            DownPayment::Percent(dec!(10)),
            dec!(6.5),
            30,
            LoanType::Conventional,
        );
        request.property_tax_rate = dec!(1.2);
        request.insurance_rate = dec!(0.35);
        request.hoa_monthly = dec!(250);
        request.seller_credit = dec!(5000);
        request.lender_credit = dec!(2000);
        request.discount_points = dec!(1);
        request
    }

    #[test]
    fn test_conventional_scenario() {
        let result = calculate_loan(&create_scenario_request(), &create_test_config()).unwrap();

        assert_eq!(result.loan_details.base_loan_amount, dec!(360000));
        assert_eq!(result.loan_details.ltv, dec!(90.000));
        assert!(result.monthly_payment.mortgage_insurance > Decimal::ZERO);
        assert_eq!(result.monthly_payment.principal_and_interest, dec!(2275.44));
        assert_eq!(result.monthly_payment.property_tax, dec!(400.00));
        assert_eq!(result.monthly_payment.home_insurance, dec!(116.67));
        assert_eq!(result.monthly_payment.hoa, dec!(250));
        assert_eq!(result.closing_costs.items["discount_points"], dec!(3600.00));
    }

    #[test]
    fn test_monthly_total_is_sum_of_parts() {
        let result = calculate_loan(&create_scenario_request(), &create_test_config()).unwrap();
        let m = &result.monthly_payment;
        assert_eq!(
            m.total,
            m.principal_and_interest + m.property_tax + m.home_insurance + m.mortgage_insurance + m.hoa
        );
    }

    #[test]
    fn test_total_cash_needed() {
        let result = calculate_loan(&create_scenario_request(), &create_test_config()).unwrap();
        assert_eq!(
            result.total_cash_needed,
            result.loan_details.down_payment
                + result.closing_costs.total
                + result.prepaid_items.total
                + result.escrow_deposit.total
        );
    }

    #[test]
    fn test_audit_steps_are_numbered_in_order() {
        let result = calculate_loan(&create_scenario_request(), &create_test_config()).unwrap();
        let steps = &result.audit_trace.steps;

        let rule_ids: Vec<&str> = steps.iter().map(|s| s.rule_id.as_str()).collect();
        assert_eq!(
            rule_ids,
            vec![
                "financed_fee",
                "loan_resolution",
                "amortization",
                "mortgage_insurance",
                "prepaid_escrow",
                "title_insurance",
                "contribution_limit",
                "closing_costs",
                "result_assembly",
            ]
        );
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(step.step_number, i as u32 + 1);
        }
    }

    #[test]
    fn test_missing_closing_date_is_flagged() {
        let result = calculate_loan(&create_scenario_request(), &create_test_config()).unwrap();
        assert!(result.has_warning(INTEREST_DAYS_DEFAULTED));
    }

    #[test]
    fn test_fha_finances_upfront_mip() {
        let mut request = create_scenario_request();
        request.loan_type = LoanType::Fha;
        request.down_payment = DownPayment::Percent(dec!(3.5));

        let result = calculate_loan(&request, &create_test_config()).unwrap();
        assert_eq!(result.loan_details.base_loan_amount, dec!(386000));
        assert!(result.loan_details.total_loan_amount > dec!(386000));
        assert!(result.monthly_payment.mortgage_insurance > Decimal::ZERO);
    }

    #[test]
    fn test_va_exempt_has_no_fees_or_insurance() {
        let mut request = create_scenario_request();
        request.loan_type = LoanType::Va;
        request.down_payment = DownPayment::Percent(Decimal::ZERO);
        request.va = VaDetails {
            disability_exempt: true,
            ..VaDetails::default()
        };

        let result = calculate_loan(&request, &create_test_config()).unwrap();
        assert_eq!(result.loan_details.financed_fees, Decimal::ZERO);
        assert_eq!(result.monthly_payment.mortgage_insurance, Decimal::ZERO);
        assert_eq!(result.contribution_limits.closing_cost_cap, ContributionCap::Unlimited);
        assert_eq!(result.contribution_limits.concession_cap, Some(dec!(16000.00)));
    }

    #[test]
    fn test_va_concession_cap_exceeded() {
        let mut request = create_scenario_request();
        request.loan_type = LoanType::Va;
        request.down_payment = DownPayment::Percent(Decimal::ZERO);
        request.discount_points = dec!(5);
        request.seller_credit = dec!(25000);

        let result = calculate_loan(&request, &create_test_config()).unwrap();
        // Points alone are 5% of the base loan, well over the 4% cap
        assert!(result.has_warning(VA_CONCESSION_CAP_EXCEEDED));
        // VA places no cap on closing-cost contributions beyond the general 6%
        assert!(result.has_warning(SELLER_CREDIT_EXCEEDS_LIMIT));
    }

    #[test]
    fn test_refinance_declines_owners_title() {
        let mut request = create_scenario_request();
        request.transaction_type = TransactionType::Refinance;
        request.seller_credit = Decimal::ZERO;
        request.closing_date = NaiveDate::from_ymd_opt(2025, 3, 10);

        let result = calculate_loan(&request, &create_test_config()).unwrap();
        assert!(!result.title_insurance.owners_policy_included);
        assert_eq!(result.title_insurance.owners_premium, Decimal::ZERO);
        assert!(!result.closing_costs.items.contains_key("owners_title_insurance"));
        assert_eq!(result.prepaid_items.interest_days, 22);
    }

    #[test]
    fn test_missing_section_fails_whole_calculation() {
        let mut config = create_test_config();
        config.title_insurance = None;
        let result = calculate_loan(&create_scenario_request(), &config);
        assert!(matches!(result, Err(EngineError::Configuration { ref section, .. }) if section == "title_insurance"));
    }

    #[test]
    fn test_oversized_inputs_fail_without_panicking() {
        let config = create_test_config();
        let cases: [(&str, fn(&mut LoanRequest)); 4] = [
            ("credits", |r| {
                r.seller_credit = Decimal::MAX;
                r.lender_credit = Decimal::MAX;
            }),
            ("property tax", |r| r.property_tax_rate = dec!(10000000000000000000000000)),
            ("discount points", |r| r.discount_points = dec!(10000000000000000000000000)),
            ("monthly payment", |r| r.hoa_monthly = Decimal::MAX),
        ];

        for (what, apply) in cases {
            let mut request = create_scenario_request();
            apply(&mut request);
            match calculate_loan(&request, &config) {
                Err(EngineError::CalculationError { message }) => {
                    assert!(message.starts_with(what), "unexpected message: {}", message)
                }
                other => panic!("Expected CalculationError for {}, got {:?}", what, other),
            }
        }
    }

    #[test]
    fn test_calculate_from_raw_validates_first() {
        let raw = serde_json::json!({
            "purchase_price": 400000,
            "down_payment_percent": 10,
            "interest_rate": 6.5,
            "loan_term_years": 30,
            "loan_type": "jumbo"
        });
        let result = calculate_from_raw(&raw, &create_test_config());
        assert!(matches!(result, Err(EngineError::Validation { ref field, .. }) if field == "loan_type"));
    }
}
