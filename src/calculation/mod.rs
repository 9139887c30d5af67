//! Calculation logic for the mortgage calculation engine.
//!
//! This module contains request validation, loan amount and LTV resolution,
//! financed fees, amortization, mortgage insurance, closing costs, prepaid
//! items and escrow, title insurance, seller contribution limits, and the
//! assembler that runs them in order.

mod amortization;
mod assembler;
mod closing_costs;
mod contribution_limit;
mod financed_fee;
mod loan_amount;
mod lookup;
mod mortgage_insurance;
mod prepaid_escrow;
mod rounding;
mod title_insurance;
mod validation;

pub use amortization::{AmortizationResult, calculate_amortization};
pub use assembler::{VA_CONCESSION_CAP_EXCEEDED, calculate_from_raw, calculate_loan};
pub use closing_costs::{
    CLOSING_COST_ITEM_SKIPPED, ClosingCostResult, DISCOUNT_POINTS, LENDER_TITLE_INSURANCE,
    OWNERS_TITLE_INSURANCE, SELLER_CREDIT_EXCEEDS_LIMIT, SELLER_CREDIT_ON_REFINANCE,
    calculate_closing_costs,
};
pub use contribution_limit::{
    CONTRIBUTION_LIMIT_UNRESOLVED, ContributionLimitResult, LtvBracket, calculate_contribution_limit,
    match_bracket,
};
pub use financed_fee::{
    DEFAULT_VA_FUNDING_FEE_RATE, FinancedFeeResult, VA_FUNDING_FEE_DEFAULTED, calculate_financed_fee,
};
pub use loan_amount::{LoanAmounts, LoanResolution, resolve_loan};
pub use lookup::{CellLookup, lookup_cell, tiered_lookup};
pub use mortgage_insurance::{
    FHA_LONG_TERM_DEFAULT_MIP, FHA_MIP_DEFAULTED, FHA_SHORT_TERM_DEFAULT_MIP,
    MortgageInsuranceResult, PMI_CREDIT_ADJUSTMENT_MISSING, PMI_LTV_THRESHOLD,
    calculate_mortgage_insurance,
};
pub use prepaid_escrow::{
    HOME_INSURANCE, INTEREST_DAYS_DEFAULTED, PREPAID_INTEREST, PROPERTY_TAX, PrepaidEscrowResult,
    calculate_prepaids_and_escrow, days_through_month_end,
};
pub use rounding::{
    MONEY_DP, RATE_DP, checked_months, checked_percent_of, checked_total, percent_of, round_money,
    round_rate,
};
pub use title_insurance::{TitleInsuranceResult, calculate_title_insurance};
pub use validation::{MAX_CREDIT_SCORE, MIN_CREDIT_SCORE, validate_request};
