//! Loan request model and related types.
//!
//! This module defines the normalized [`LoanRequest`] produced by the
//! validator, along with the closed sets of loan programs, transaction
//! types, occupancies and VA eligibility categories.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Credit score assumed when the caller does not supply one.
///
/// Conventional PMI pricing depends on a credit-score band; quoting without a
/// score prices the loan at this reference score.
pub const DEFAULT_CREDIT_SCORE: u16 = 740;

/// The loan program family.
///
/// Each program has its own financed-fee, recurring-insurance and
/// seller-contribution rules. Adding a program means adding a variant here;
/// every rule that dispatches on the program is an exhaustive `match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanType {
    /// Conventional loan with private mortgage insurance above 80% LTV.
    Conventional,
    /// FHA loan, government-insured, with upfront and annual MIP.
    Fha,
    /// VA loan, government-guaranteed, with a funding fee and no monthly insurance.
    Va,
    /// USDA loan, government-guaranteed, with upfront and annual guarantee fees.
    Usda,
}

impl LoanType {
    /// All supported loan types.
    pub const ALL: [LoanType; 4] = [
        LoanType::Conventional,
        LoanType::Fha,
        LoanType::Va,
        LoanType::Usda,
    ];

    /// Returns the wire code for this loan type.
    pub fn code(&self) -> &'static str {
        match self {
            LoanType::Conventional => "conventional",
            LoanType::Fha => "fha",
            LoanType::Va => "va",
            LoanType::Usda => "usda",
        }
    }

    /// Parses a wire code, returning `None` for anything outside the closed set.
    ///
    /// # Examples
    ///
    /// ```
    /// use mortgage_engine::models::LoanType;
    ///
    /// assert_eq!(LoanType::from_code("FHA"), Some(LoanType::Fha));
    /// assert_eq!(LoanType::from_code("jumbo"), None);
    /// ```
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim().to_ascii_lowercase();
        LoanType::ALL.into_iter().find(|t| t.code() == code)
    }
}

/// Whether the loan buys a home or refinances one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Home purchase.
    #[default]
    Purchase,
    /// Refinance of an existing mortgage; the purchase price is the appraised value.
    Refinance,
}

impl TransactionType {
    /// Parses a wire code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "purchase" => Some(TransactionType::Purchase),
            "refinance" => Some(TransactionType::Refinance),
            _ => None,
        }
    }
}

/// How the borrower will occupy the property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occupancy {
    /// Owner-occupied primary residence.
    #[default]
    PrimaryResidence,
    /// Second home or vacation property.
    SecondHome,
    /// Investment property.
    Investment,
}

impl Occupancy {
    /// Parses a wire code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "primary_residence" | "primary" => Some(Occupancy::PrimaryResidence),
            "second_home" => Some(Occupancy::SecondHome),
            "investment" => Some(Occupancy::Investment),
            _ => None,
        }
    }
}

/// VA service category used to select the funding-fee row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaService {
    /// Regular military (active duty or veteran).
    #[default]
    Active,
    /// Reserves or National Guard.
    Reserves,
}

impl VaService {
    /// Parses a wire code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "active" => Some(VaService::Active),
            "reserves" => Some(VaService::Reserves),
            _ => None,
        }
    }
}

/// Whether the VA loan benefit has been used before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaUsage {
    /// First use of the benefit.
    #[default]
    FirstUse,
    /// The benefit has been used before.
    SubsequentUse,
}

impl VaUsage {
    /// Parses a wire code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "first_use" | "first" => Some(VaUsage::FirstUse),
            "subsequent_use" | "subsequent" => Some(VaUsage::SubsequentUse),
            _ => None,
        }
    }
}

/// VA-specific borrower details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VaDetails {
    /// Service category.
    pub service: VaService,
    /// Prior use of the benefit.
    pub usage: VaUsage,
    /// Borrowers receiving service-connected disability compensation pay no funding fee.
    pub disability_exempt: bool,
}

/// The down payment as entered by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownPayment {
    /// A dollar amount.
    Amount(Decimal),
    /// A percentage of the purchase price, in `[0, 100)`.
    Percent(Decimal),
}

/// A validated, normalized loan request.
///
/// Built by [`crate::calculation::validate_request`] or directly through
/// [`LoanRequest::new`], which fills every optional field with its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRequest {
    /// Purchase price, or appraised value for a refinance.
    pub purchase_price: Decimal,
    /// The down payment (or equity for a refinance).
    pub down_payment: DownPayment,
    /// Annual nominal interest rate in percent, at most 3 decimal places.
    pub interest_rate: Decimal,
    /// Loan term in years.
    pub term_years: u32,
    /// The loan program.
    pub loan_type: LoanType,
    /// Annual property tax rate in percent of the purchase price.
    pub property_tax_rate: Decimal,
    /// Annual hazard insurance rate in percent of the purchase price.
    pub insurance_rate: Decimal,
    /// Monthly HOA dues.
    pub hoa_monthly: Decimal,
    /// Seller credit toward closing costs.
    pub seller_credit: Decimal,
    /// Lender credit toward closing costs.
    pub lender_credit: Decimal,
    /// Discount points in percent of the base loan amount.
    pub discount_points: Decimal,
    /// Expected closing date, used for prepaid interest.
    pub closing_date: Option<NaiveDate>,
    /// VA eligibility details (ignored for other programs).
    pub va: VaDetails,
    /// Purchase or refinance.
    pub transaction_type: TransactionType,
    /// Whether the buyer purchases an owner's title policy.
    pub include_owners_title: bool,
    /// Property occupancy.
    pub occupancy: Occupancy,
    /// Borrower credit score.
    pub credit_score: u16,
}

impl LoanRequest {
    /// Creates a purchase request with all optional fields defaulted.
    ///
    /// Defaults: zero tax, insurance, HOA, credits and points; no closing
    /// date; first-use active VA details without exemption; owner's title
    /// included; primary residence; [`DEFAULT_CREDIT_SCORE`].
    ///
    /// # Examples
    ///
    /// ```
    /// use mortgage_engine::models::{DownPayment, LoanRequest, LoanType, DEFAULT_CREDIT_SCORE};
    /// use rust_decimal_macros::dec;
    ///
    /// let request = LoanRequest::new(
    ///     dec!(400000),
    ///     DownPayment::Percent(dec!(10)),
    ///     dec!(6.5),
    ///     30,
    ///     LoanType::Conventional,
    /// );
    /// assert_eq!(request.credit_score, DEFAULT_CREDIT_SCORE);
    /// assert!(request.include_owners_title);
    /// ```
    pub fn new(
        purchase_price: Decimal,
        down_payment: DownPayment,
        interest_rate: Decimal,
        term_years: u32,
        loan_type: LoanType,
    ) -> Self {
        Self {
            purchase_price,
            down_payment,
            interest_rate,
            term_years,
            loan_type,
            property_tax_rate: Decimal::ZERO,
            insurance_rate: Decimal::ZERO,
            hoa_monthly: Decimal::ZERO,
            seller_credit: Decimal::ZERO,
            lender_credit: Decimal::ZERO,
            discount_points: Decimal::ZERO,
            closing_date: None,
            va: VaDetails::default(),
            transaction_type: TransactionType::Purchase,
            include_owners_title: true,
            occupancy: Occupancy::PrimaryResidence,
            credit_score: DEFAULT_CREDIT_SCORE,
        }
    }

    /// Returns true if an owner's title policy is purchased.
    ///
    /// A refinance never buys an owner's policy.
    pub fn owners_title_included(&self) -> bool {
        self.include_owners_title && self.transaction_type == TransactionType::Purchase
    }
}
