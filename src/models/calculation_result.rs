//! Calculation result models for the mortgage calculation engine.
//!
//! This module contains the [`CalculationResult`] type and its associated
//! structures that capture every output of a loan calculation: loan details,
//! the monthly payment breakdown, closing costs, prepaid items, the escrow
//! deposit, credits, title insurance, contribution limits, and an audit trace.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{LoanType, TransactionType};

/// Resolved loan amounts and terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanDetails {
    /// Purchase price (appraised value for a refinance).
    pub purchase_price: Decimal,
    /// Down payment in dollars.
    pub down_payment: Decimal,
    /// Down payment as a percentage of the purchase price.
    pub down_payment_percent: Decimal,
    /// Purchase price less down payment.
    pub base_loan_amount: Decimal,
    /// Upfront fees added to the principal.
    pub financed_fees: Decimal,
    /// Base loan amount plus financed fees.
    pub total_loan_amount: Decimal,
    /// Loan-to-value of the base loan, in percent (3 decimal places).
    pub ltv: Decimal,
    /// Loan term in years.
    pub term_years: u32,
    /// Annual interest rate in percent.
    pub interest_rate: Decimal,
    /// The loan program.
    pub loan_type: LoanType,
    /// Purchase or refinance.
    pub transaction_type: TransactionType,
}

/// The monthly payment breakdown.
///
/// `total` is the sum of the already-rounded components, so it always
/// equals their sum exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyPayment {
    /// Principal and interest.
    pub principal_and_interest: Decimal,
    /// Monthly property tax.
    pub property_tax: Decimal,
    /// Monthly hazard insurance.
    pub home_insurance: Decimal,
    /// Monthly mortgage insurance or guarantee fee.
    pub mortgage_insurance: Decimal,
    /// Monthly HOA dues.
    pub hoa: Decimal,
    /// Total monthly payment.
    pub total: Decimal,
}

/// Itemized closing costs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingCosts {
    /// Line items by name.
    pub items: BTreeMap<String, Decimal>,
    /// Sum of all line items before credits.
    pub subtotal: Decimal,
    /// Net closing costs after seller and lender credits, never negative.
    pub total: Decimal,
}

/// Prepaid items collected at closing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepaidItems {
    /// Line items by name.
    pub items: BTreeMap<String, Decimal>,
    /// Number of days of prepaid interest.
    pub interest_days: u32,
    /// Per-diem interest, rounded for display.
    pub daily_interest: Decimal,
    /// Sum of the rounded line items.
    pub total: Decimal,
}

/// Initial escrow account deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowDeposit {
    /// Line items by name.
    pub items: BTreeMap<String, Decimal>,
    /// Sum of the rounded line items.
    pub total: Decimal,
}

/// Credits applied against closing costs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credits {
    /// Seller credit.
    pub seller_credit: Decimal,
    /// Lender credit.
    pub lender_credit: Decimal,
    /// Seller plus lender credit.
    pub total: Decimal,
}

/// Title insurance premiums.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleInsurance {
    /// Combined premium for the purchase price, including the issuance fee.
    pub total_premium: Decimal,
    /// Lender's policy premium as charged.
    pub lender_premium: Decimal,
    /// Owner's policy premium (residual of the total), zero when declined.
    pub owners_premium: Decimal,
    /// Whether the owner's policy was purchased.
    pub owners_policy_included: bool,
}

/// A seller-contribution cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionCap {
    /// Contributions may not exceed this dollar amount.
    Limited(Decimal),
    /// The program places no cap on contributions.
    Unlimited,
}

impl ContributionCap {
    /// Returns the dollar cap, or `None` when unlimited.
    pub fn amount(&self) -> Option<Decimal> {
        match self {
            ContributionCap::Limited(amount) => Some(*amount),
            ContributionCap::Unlimited => None,
        }
    }
}

/// Seller-contribution limits for the loan.
///
/// The closing-cost cap and the concession cap are independent rules and
/// are reported separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionLimits {
    /// Program cap on seller contributions toward closing costs.
    pub closing_cost_cap: ContributionCap,
    /// Separate cap on seller-paid concessions (prepaids and discount points), if any.
    pub concession_cap: Option<Decimal>,
}

/// A single step in the audit trace recording a calculation decision.
///
/// Each step captures the input, output, and reasoning for a rule application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// How serious a warning is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningSeverity {
    /// Informational; a documented default was used.
    Low,
    /// A table cell was missing and a fallback rate was priced in.
    Medium,
    /// A program limit was exceeded; the caller may need to block the transaction.
    High,
}

/// A warning generated during calculation.
///
/// Warnings indicate degraded-but-successful results that don't prevent
/// calculation but may require attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level.
    pub severity: WarningSeverity,
}

impl AuditWarning {
    /// Creates a new warning.
    pub fn new(code: &str, message: impl Into<String>, severity: WarningSeverity) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            severity,
        }
    }
}

/// The complete audit trace for a calculation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuditTrace {
    /// The sequence of calculation steps.
    pub steps: Vec<AuditStep>,
    /// Any warnings generated during calculation.
    pub warnings: Vec<AuditWarning>,
}

/// The complete result of a loan calculation.
///
/// A result is a pure function of the loan request and the rate tables;
/// it carries no identifiers or timestamps of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationResult {
    /// Resolved loan amounts and terms.
    pub loan_details: LoanDetails,
    /// Monthly payment breakdown.
    pub monthly_payment: MonthlyPayment,
    /// Itemized closing costs.
    pub closing_costs: ClosingCosts,
    /// Prepaid items.
    pub prepaid_items: PrepaidItems,
    /// Initial escrow deposit.
    pub escrow_deposit: EscrowDeposit,
    /// Seller and lender credits.
    pub credits: Credits,
    /// Title insurance premiums.
    pub title_insurance: TitleInsurance,
    /// Seller-contribution limits.
    pub contribution_limits: ContributionLimits,
    /// Down payment plus net closing costs, prepaids and escrow.
    pub total_cash_needed: Decimal,
    /// Complete audit trace of calculation decisions.
    pub audit_trace: AuditTrace,
}

impl CalculationResult {
    /// Returns true if any warning with the given code was raised.
    pub fn has_warning(&self, code: &str) -> bool {
        self.audit_trace.warnings.iter().any(|w| w.code == code)
    }
}
