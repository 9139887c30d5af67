//! Rate table configuration types.
//!
//! This module contains the strongly-typed rate table structures that are
//! deserialized from YAML. All rates are annual percentages (`0.55` means
//! 0.55%). Every top-level section is optional at load time; a calculation
//! that needs an absent section fails with [`EngineError::Configuration`].

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{EngineError, EngineResult};
use crate::models::{LoanType, Occupancy, VaService, VaUsage};

/// One tier of a tiered rate schedule.
///
/// A tier applies to values up to and including `up_to`; the last tier of a
/// schedule has no `up_to` and catches everything above.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Tier {
    /// Inclusive upper bound, or `None` for the unbounded last tier.
    #[serde(default)]
    pub up_to: Option<Decimal>,
    /// The rate for this tier, in percent.
    pub rate: Decimal,
}

impl Tier {
    /// Creates a bounded tier.
    pub fn bounded(up_to: Decimal, rate: Decimal) -> Self {
        Self {
            up_to: Some(up_to),
            rate,
        }
    }

    /// Creates the unbounded catch-all tier.
    pub fn unbounded(rate: Decimal) -> Self {
        Self { up_to: None, rate }
    }

    /// Checks that a schedule is non-empty, ascending, and ends with exactly
    /// one unbounded tier.
    pub fn check_schedule(tiers: &[Tier]) -> Result<(), String> {
        let Some((last, bounded)) = tiers.split_last() else {
            return Err("tier schedule is empty".to_string());
        };
        if last.up_to.is_some() {
            return Err("last tier must be unbounded".to_string());
        }

        let mut previous: Option<Decimal> = None;
        for tier in bounded {
            let Some(up_to) = tier.up_to else {
                return Err("only the last tier may be unbounded".to_string());
            };
            if previous.is_some_and(|p| up_to <= p) {
                return Err(format!("tier thresholds must ascend (at {})", up_to));
            }
            previous = Some(up_to);
        }
        Ok(())
    }
}

/// Request bounds enforced by the validator.
#[derive(Debug, Clone, Deserialize)]
pub struct Limits {
    /// Smallest accepted purchase price.
    pub min_purchase_price: Decimal,
    /// Largest accepted purchase price.
    pub max_purchase_price: Decimal,
    /// Largest accepted annual interest rate, in percent.
    pub max_interest_rate: Decimal,
    /// Longest accepted term, in years.
    pub max_term_years: u32,
}

/// Per-program down payment and LTV limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LoanTypeLimits {
    /// Minimum down payment, in percent of the purchase price.
    pub min_down_payment: Decimal,
    /// Maximum loan-to-value, in percent.
    pub max_ltv: Decimal,
}

/// Per-program limits keyed by loan type code.
#[derive(Debug, Clone, Deserialize)]
pub struct LoanTypeTable {
    /// Conventional limits.
    pub conventional: Option<LoanTypeLimits>,
    /// FHA limits.
    pub fha: Option<LoanTypeLimits>,
    /// VA limits.
    pub va: Option<LoanTypeLimits>,
    /// USDA limits.
    pub usda: Option<LoanTypeLimits>,
}

impl LoanTypeTable {
    /// Returns the limits for a loan type, if configured.
    pub fn limits_for(&self, loan_type: LoanType) -> Option<&LoanTypeLimits> {
        match loan_type {
            LoanType::Conventional => self.conventional.as_ref(),
            LoanType::Fha => self.fha.as_ref(),
            LoanType::Va => self.va.as_ref(),
            LoanType::Usda => self.usda.as_ref(),
        }
    }
}

/// An additive PMI adjustment for borrowers at or above a credit score.
#[derive(Debug, Clone, Deserialize)]
pub struct CreditScoreBand {
    /// Lowest score in the band.
    pub min_score: u16,
    /// Added to the LTV-based PMI rate, in percent.
    pub adjustment: Decimal,
}

/// Conventional private mortgage insurance table.
#[derive(Debug, Clone, Deserialize)]
pub struct PmiTable {
    /// Annual PMI rate by LTV.
    pub ltv_tiers: Vec<Tier>,
    /// Credit-score adjustments, any order.
    #[serde(default)]
    pub credit_score_adjustments: Vec<CreditScoreBand>,
}

/// FHA term category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermCategory {
    /// Terms longer than the long-term threshold.
    LongTerm,
    /// Terms at or below the long-term threshold.
    ShortTerm,
}

/// FHA loan amount category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountCategory {
    /// Base loan at or below the high-balance threshold.
    Standard,
    /// Base loan above the high-balance threshold.
    HighBalance,
}

fn default_long_term_threshold_years() -> u32 {
    15
}

/// FHA mortgage insurance premium table.
#[derive(Debug, Clone, Deserialize)]
pub struct FhaTable {
    /// Upfront MIP financed into the loan, in percent of the base loan.
    pub upfront_mip_rate: Decimal,
    /// Base loan amount above which the high-balance column applies.
    pub high_balance_threshold: Decimal,
    /// Terms longer than this many years use the long-term column.
    #[serde(default = "default_long_term_threshold_years")]
    pub long_term_threshold_years: u32,
    /// Annual MIP by term and amount category; each cell is an LTV tier schedule.
    pub annual_mip: HashMap<TermCategory, HashMap<AmountCategory, Vec<Tier>>>,
}

/// VA down payment bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownPaymentBracket {
    /// Less than 5% down.
    #[serde(rename = "less_than_5")]
    LessThan5,
    /// At least 5% but less than 10% down.
    FiveToTen,
    /// 10% or more down.
    TenOrMore,
}

impl DownPaymentBracket {
    /// Selects the bracket for a down payment percentage.
    pub fn for_percent(percent: Decimal) -> Self {
        if percent < Decimal::from(5) {
            DownPaymentBracket::LessThan5
        } else if percent < Decimal::TEN {
            DownPaymentBracket::FiveToTen
        } else {
            DownPaymentBracket::TenOrMore
        }
    }
}

/// VA funding fee matrix: service category, down payment bracket, usage.
pub type FundingFeeMatrix =
    HashMap<VaService, HashMap<DownPaymentBracket, HashMap<VaUsage, Decimal>>>;

/// VA funding fee table.
#[derive(Debug, Clone, Deserialize)]
pub struct VaTable {
    /// Funding fee in percent of the base loan.
    pub funding_fee: FundingFeeMatrix,
}

/// USDA guarantee fee table.
#[derive(Debug, Clone, Deserialize)]
pub struct UsdaTable {
    /// Upfront guarantee fee financed into the loan, in percent of the base loan.
    pub upfront_fee_rate: Decimal,
    /// Annual guarantee fee, in percent of the base loan.
    pub annual_fee_rate: Decimal,
}

/// A configured closing cost line item.
///
/// `kind` and `calculation_base` are kept as strings so that an unknown
/// value skips the item instead of rejecting the whole table.
#[derive(Debug, Clone, Deserialize)]
pub struct ClosingCostItem {
    /// Line item name.
    pub name: String,
    /// `fixed` or `percentage`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Dollar amount, or percentage of the calculation base.
    pub value: Decimal,
    /// `purchase_price`, `loan_amount` or `fixed`; only read for percentage items.
    #[serde(default)]
    pub calculation_base: Option<String>,
    /// Dollar base for percentage items with a `fixed` calculation base.
    #[serde(default)]
    pub base_amount: Option<Decimal>,
}

/// Closing cost configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClosingCostTable {
    /// Configured line items.
    pub items: Vec<ClosingCostItem>,
    /// General cap on seller credit, in percent of the purchase price.
    pub max_seller_credit_percentage: Decimal,
}

fn default_interest_day_basis() -> u32 {
    360
}

fn default_interest_days() -> u32 {
    30
}

/// Prepaid and escrow month counts.
///
/// Prepaid months and escrow months are independent settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PrepaidTable {
    /// Months of property tax prepaid at closing.
    pub months_tax_prepaid: u32,
    /// Months of hazard insurance prepaid at closing.
    pub months_insurance_prepaid: u32,
    /// Months of property tax deposited into escrow.
    pub months_tax_escrow: u32,
    /// Months of hazard insurance deposited into escrow.
    pub months_insurance_escrow: u32,
    /// Days per year for per-diem interest.
    #[serde(default = "default_interest_day_basis")]
    pub interest_day_basis: u32,
    /// Days of prepaid interest when no closing date is given.
    #[serde(default = "default_interest_days")]
    pub default_interest_days: u32,
}

/// Title insurance rate schedules.
#[derive(Debug, Clone, Deserialize)]
pub struct TitleInsuranceTable {
    /// Combined premium rate by purchase price.
    pub total_rates_tiers: Vec<Tier>,
    /// Simultaneous-issue lender's rate by loan amount.
    pub lender_rates_simultaneous_tiers: Vec<Tier>,
    /// Flat fee added to the combined premium.
    pub issuance_fee: Decimal,
    /// Multiplier on the lender's rate when the owner's policy is declined.
    pub no_owners_title_multiplier: Decimal,
}

/// One seller-contribution LTV bracket.
///
/// `ltv_range` accepts `<=X%`, `≤X%`, `>X%`, `A-B%`, `A–B%` and `any`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContributionBracket {
    /// LTV bracket encoding.
    pub ltv_range: String,
    /// Maximum contribution in percent of the purchase price.
    pub max_contribution_percentage: Decimal,
}

/// VA seller concession rule.
#[derive(Debug, Clone, Deserialize)]
pub struct VaConcessionRule {
    /// Cap on seller-paid concessions, in percent of the purchase price.
    pub concession_cap_percentage: Decimal,
}

/// Seller-contribution limit tables.
#[derive(Debug, Clone, Deserialize)]
pub struct SellerContributionTable {
    /// Conventional brackets by occupancy.
    pub conventional: Option<HashMap<Occupancy, Vec<ContributionBracket>>>,
    /// FHA brackets, occupancy-independent.
    pub fha: Option<Vec<ContributionBracket>>,
    /// USDA brackets, occupancy-independent.
    pub usda: Option<Vec<ContributionBracket>>,
    /// VA concession rule.
    pub va: Option<VaConcessionRule>,
}

/// The complete rate table snapshot read by a calculation.
///
/// Treated as immutable for the lifetime of a calculation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RateTableConfig {
    /// Request bounds.
    pub limits: Option<Limits>,
    /// Per-program down payment and LTV limits.
    pub loan_types: Option<LoanTypeTable>,
    /// Conventional PMI.
    pub pmi: Option<PmiTable>,
    /// FHA MIP.
    pub fha: Option<FhaTable>,
    /// VA funding fee.
    pub va: Option<VaTable>,
    /// USDA guarantee fee.
    pub usda: Option<UsdaTable>,
    /// Closing costs.
    pub closing_costs: Option<ClosingCostTable>,
    /// Prepaids and escrow.
    pub prepaids: Option<PrepaidTable>,
    /// Title insurance.
    pub title_insurance: Option<TitleInsuranceTable>,
    /// Seller-contribution limits.
    pub seller_contributions: Option<SellerContributionTable>,
}

fn require<'a, T>(section: &'a Option<T>, name: &str) -> EngineResult<&'a T> {
    section
        .as_ref()
        .ok_or_else(|| EngineError::missing_section(name))
}

impl RateTableConfig {
    /// Returns the request bounds section.
    pub fn limits(&self) -> EngineResult<&Limits> {
        require(&self.limits, "limits")
    }

    /// Returns the per-program limits section.
    pub fn loan_types(&self) -> EngineResult<&LoanTypeTable> {
        require(&self.loan_types, "loan_types")
    }

    /// Returns the conventional PMI section.
    pub fn pmi(&self) -> EngineResult<&PmiTable> {
        require(&self.pmi, "pmi")
    }

    /// Returns the FHA section.
    pub fn fha(&self) -> EngineResult<&FhaTable> {
        require(&self.fha, "fha")
    }

    /// Returns the VA section.
    pub fn va(&self) -> EngineResult<&VaTable> {
        require(&self.va, "va")
    }

    /// Returns the USDA section.
    pub fn usda(&self) -> EngineResult<&UsdaTable> {
        require(&self.usda, "usda")
    }

    /// Returns the closing cost section.
    pub fn closing_costs(&self) -> EngineResult<&ClosingCostTable> {
        require(&self.closing_costs, "closing_costs")
    }

    /// Returns the prepaid and escrow section.
    pub fn prepaids(&self) -> EngineResult<&PrepaidTable> {
        require(&self.prepaids, "prepaids")
    }

    /// Returns the title insurance section.
    pub fn title_insurance(&self) -> EngineResult<&TitleInsuranceTable> {
        require(&self.title_insurance, "title_insurance")
    }

    /// Returns the seller-contribution section.
    pub fn seller_contributions(&self) -> EngineResult<&SellerContributionTable> {
        require(&self.seller_contributions, "seller_contributions")
    }

    /// Checks every tier schedule present in the tables.
    ///
    /// Returns the name of the first offending schedule with the reason.
    pub fn check_tier_schedules(&self) -> Result<(), String> {
        let mut schedules: Vec<(String, &[Tier])> = Vec::new();

        if let Some(pmi) = &self.pmi {
            schedules.push(("pmi.ltv_tiers".to_string(), pmi.ltv_tiers.as_slice()));
        }
        if let Some(fha) = &self.fha {
            for (term, by_amount) in &fha.annual_mip {
                for (amount, tiers) in by_amount {
                    schedules.push((
                        format!("fha.annual_mip.{:?}.{:?}", term, amount),
                        tiers.as_slice(),
                    ));
                }
            }
        }
        if let Some(title) = &self.title_insurance {
            schedules.push((
                "title_insurance.total_rates_tiers".to_string(),
                title.total_rates_tiers.as_slice(),
            ));
            schedules.push((
                "title_insurance.lender_rates_simultaneous_tiers".to_string(),
                title.lender_rates_simultaneous_tiers.as_slice(),
            ));
        }

        for (name, tiers) in schedules {
            Tier::check_schedule(tiers).map_err(|reason| format!("{}: {}", name, reason))?;
        }
        Ok(())
    }
}
