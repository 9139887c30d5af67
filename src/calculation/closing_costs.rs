//! Closing cost itemization.
//!
//! Each configured item is either a fixed dollar amount or a percentage of a
//! calculation base:
//!
//! - `purchase_price` is the purchase price
//! - `loan_amount` is the total loan, including financed fees
//! - `fixed` is the item's own `base_amount`
//!
//! Discount points are priced off the base loan. Title premiums are added as
//! line items. Seller and lender credits reduce the total, which is floored
//! at zero, and the seller credit is checked against the program limits.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::warn;

use crate::config::{ClosingCostItem, RateTableConfig};
use crate::error::EngineResult;
use crate::models::{
    AuditStep, AuditWarning, ClosingCosts, ContributionLimits, Credits, LoanRequest, TitleInsurance,
    TransactionType, WarningSeverity,
};

use super::loan_amount::LoanAmounts;
use super::rounding::{checked_percent_of, checked_total, percent_of, round_money};

/// Warning code raised when a configured item cannot be priced.
pub const CLOSING_COST_ITEM_SKIPPED: &str = "CLOSING_COST_ITEM_SKIPPED";

/// Warning code raised when the seller credit exceeds the allowed maximum.
pub const SELLER_CREDIT_EXCEEDS_LIMIT: &str = "SELLER_CREDIT_EXCEEDS_LIMIT";

/// Warning code raised when a refinance carries a seller credit.
pub const SELLER_CREDIT_ON_REFINANCE: &str = "SELLER_CREDIT_ON_REFINANCE";

/// Discount points line item.
pub const DISCOUNT_POINTS: &str = "discount_points";
/// Lender's title policy line item.
pub const LENDER_TITLE_INSURANCE: &str = "lender_title_insurance";
/// Owner's title policy line item.
pub const OWNERS_TITLE_INSURANCE: &str = "owners_title_insurance";

/// The result of a closing cost calculation.
#[derive(Debug, Clone)]
pub struct ClosingCostResult {
    /// Itemized and net closing costs.
    pub closing_costs: ClosingCosts,
    /// Seller and lender credits.
    pub credits: Credits,
    /// Dollar amount of discount points, zero when none were bought.
    pub discount_points_amount: Decimal,
    /// Largest seller credit the general and program limits allow.
    pub max_seller_credit: Decimal,
    /// Warnings for skipped items and limit overages.
    pub warnings: Vec<AuditWarning>,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Prices one configured item, or explains why it was skipped.
fn price_item(item: &ClosingCostItem, amounts: &LoanAmounts) -> Result<Decimal, String> {
    match item.kind.as_str() {
        "fixed" => Ok(item.value),
        "percentage" => {
            let base = match item.calculation_base.as_deref() {
                Some("purchase_price") => amounts.purchase_price,
                Some("loan_amount") => amounts.total_loan,
                Some("fixed") => item
                    .base_amount
                    .ok_or_else(|| "fixed calculation base without base_amount".to_string())?,
                Some(other) => return Err(format!("unknown calculation base '{}'", other)),
                None => return Err("percentage item without calculation_base".to_string()),
            };
            Ok(percent_of(base, item.value))
        }
        other => Err(format!("unknown item type '{}'", other)),
    }
}

/// Calculates itemized closing costs and applies credits.
///
/// # Arguments
///
/// * `request` - Supplies discount points, credits and transaction type
/// * `amounts` - The resolved loan amounts
/// * `title` - Title premiums to add as line items
/// * `limits` - Program contribution caps for the seller credit check
/// * `config` - The rate tables
/// * `step_number` - The step number for audit trail sequencing
///
/// # Errors
///
/// Returns [`crate::error::EngineError::Configuration`] when the
/// `closing_costs` section is absent. Unpriceable items are skipped with a
/// warning.
pub fn calculate_closing_costs(
    request: &LoanRequest,
    amounts: &LoanAmounts,
    title: &TitleInsurance,
    limits: &ContributionLimits,
    config: &RateTableConfig,
    step_number: u32,
) -> EngineResult<ClosingCostResult> {
    let table = config.closing_costs()?;
    let mut warnings = Vec::new();
    let mut items: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut add_item = |name: &str, amount: Decimal| {
        *items.entry(name.to_string()).or_insert(Decimal::ZERO) += round_money(amount);
    };

    for item in &table.items {
        match price_item(item, amounts) {
            Ok(amount) => add_item(&item.name, amount),
            Err(reason) => {
                warn!(item = %item.name, %reason, "Skipping closing cost item");
                warnings.push(AuditWarning::new(
                    CLOSING_COST_ITEM_SKIPPED,
                    format!("Closing cost item '{}' skipped: {}", item.name, reason),
                    WarningSeverity::Low,
                ));
            }
        }
    }

    let discount_points_amount = round_money(checked_percent_of(
        amounts.base_loan,
        request.discount_points,
        "discount points",
    )?);
    if request.discount_points > Decimal::ZERO {
        add_item(DISCOUNT_POINTS, discount_points_amount);
    }
    add_item(LENDER_TITLE_INSURANCE, title.lender_premium);
    if title.owners_policy_included {
        add_item(OWNERS_TITLE_INSURANCE, title.owners_premium);
    }

    let subtotal = checked_total(items.values().copied(), "closing cost subtotal")?;
    let credits = Credits {
        seller_credit: request.seller_credit,
        lender_credit: request.lender_credit,
        total: checked_total([request.seller_credit, request.lender_credit], "credits")?,
    };
    let total = (subtotal - credits.total).max(Decimal::ZERO);

    let general_cap = round_money(percent_of(amounts.purchase_price, table.max_seller_credit_percentage));
    let max_seller_credit = match limits.closing_cost_cap.amount() {
        Some(program_cap) => general_cap.min(program_cap),
        None => general_cap,
    };
    if request.seller_credit > max_seller_credit {
        warn!(
            seller_credit = %request.seller_credit,
            max_seller_credit = %max_seller_credit,
            "Seller credit exceeds contribution limit"
        );
        warnings.push(AuditWarning::new(
            SELLER_CREDIT_EXCEEDS_LIMIT,
            format!(
                "Seller credit ${} exceeds the maximum allowed ${}",
                request.seller_credit, max_seller_credit
            ),
            WarningSeverity::High,
        ));
    }
    if request.transaction_type == TransactionType::Refinance && request.seller_credit > Decimal::ZERO {
        warnings.push(AuditWarning::new(
            SELLER_CREDIT_ON_REFINANCE,
            format!("Refinance carries a seller credit of ${}", request.seller_credit),
            WarningSeverity::Medium,
        ));
    }

    let audit_step = AuditStep {
        step_number,
        rule_id: "closing_costs".to_string(),
        rule_name: "Closing Costs".to_string(),
        input: serde_json::json!({
            "configured_items": table.items.len(),
            "discount_points": request.discount_points.to_string(),
            "seller_credit": request.seller_credit.to_string(),
            "lender_credit": request.lender_credit.to_string()
        }),
        output: serde_json::json!({
            "items": items.len(),
            "subtotal": subtotal.to_string(),
            "total": total.to_string(),
            "max_seller_credit": max_seller_credit.to_string()
        }),
        reasoning: format!(
            "{} items = ${}; less ${} credits = ${} (seller credit max ${})",
            items.len(),
            subtotal,
            credits.total,
            total,
            max_seller_credit
        ),
    };

    Ok(ClosingCostResult {
        closing_costs: ClosingCosts {
            items,
            subtotal,
            total,
        },
        credits,
        discount_points_amount,
        max_seller_credit,
        warnings,
        audit_step,
    })
}
