//! Seller contribution limits.
//!
//! Conventional limits depend on occupancy and LTV bracket; FHA and USDA use
//! a single occupancy-independent bracket list. VA places no cap on
//! closing-cost contributions but caps seller-paid concessions separately.

use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::warn;

use crate::config::{ContributionBracket, RateTableConfig};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditStep, AuditWarning, ContributionCap, ContributionLimits, LoanType, Occupancy, WarningSeverity,
};

use super::rounding::{percent_of, round_money};

/// Warning code raised when no contribution bracket covers the loan's LTV.
pub const CONTRIBUTION_LIMIT_UNRESOLVED: &str = "CONTRIBUTION_LIMIT_UNRESOLVED";

/// A parsed `ltv_range` bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LtvBracket {
    /// `<=X%` or `≤X%`
    AtMost(Decimal),
    /// `>X%`
    Above(Decimal),
    /// `A-B%` or `A–B%`, inclusive at both ends
    Between(Decimal, Decimal),
    /// `any`
    Any,
}

impl LtvBracket {
    /// Returns true if `ltv` falls in this bracket.
    pub fn contains(&self, ltv: Decimal) -> bool {
        match *self {
            LtvBracket::AtMost(max) => ltv <= max,
            LtvBracket::Above(min) => ltv > min,
            LtvBracket::Between(low, high) => ltv >= low && ltv <= high,
            LtvBracket::Any => true,
        }
    }
}

fn parse_percent(value: &str) -> Result<Decimal, String> {
    let trimmed = value.trim().trim_end_matches('%').trim();
    Decimal::from_str(trimmed).map_err(|_| format!("'{}' is not a percentage", value.trim()))
}

impl FromStr for LtvBracket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("any") {
            return Ok(LtvBracket::Any);
        }
        if let Some(rest) = s.strip_prefix("<=").or_else(|| s.strip_prefix('≤')) {
            return parse_percent(rest).map(LtvBracket::AtMost);
        }
        if let Some(rest) = s.strip_prefix('>') {
            return parse_percent(rest).map(LtvBracket::Above);
        }
        if let Some((low, high)) = s.split_once('-').or_else(|| s.split_once('–')) {
            let (low, high) = (parse_percent(low)?, parse_percent(high)?);
            if low > high {
                return Err(format!("range '{}' is inverted", s));
            }
            return Ok(LtvBracket::Between(low, high));
        }
        Err(format!("unrecognized LTV bracket '{}'", s))
    }
}

/// Finds the first bracket covering `ltv`.
///
/// Brackets that fail to parse are skipped and logged.
pub fn match_bracket(brackets: &[ContributionBracket], ltv: Decimal) -> Option<&ContributionBracket> {
    brackets.iter().find(|bracket| match bracket.ltv_range.parse::<LtvBracket>() {
        Ok(parsed) => parsed.contains(ltv),
        Err(reason) => {
            warn!(ltv_range = %bracket.ltv_range, %reason, "Skipping unparseable contribution bracket");
            false
        }
    })
}

/// The result of a contribution limit calculation.
#[derive(Debug, Clone)]
pub struct ContributionLimitResult {
    /// The program's caps.
    pub limits: ContributionLimits,
    /// Warnings raised when a cap could not be resolved.
    pub warnings: Vec<AuditWarning>,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates the maximum seller contribution for the loan.
///
/// # Arguments
///
/// * `loan_type` - The loan program
/// * `purchase_price` - Purchase price the percentages apply to
/// * `base_ltv` - Base LTV, selects the bracket
/// * `occupancy` - Selects the conventional table row
/// * `config` - The rate tables
/// * `step_number` - The step number for audit trail sequencing
///
/// # Errors
///
/// Returns [`EngineError::Configuration`] when `seller_contributions`, or the
/// program's entry within it, is absent.
///
/// # Examples
///
/// ```
/// use mortgage_engine::calculation::calculate_contribution_limit;
/// use mortgage_engine::config::ConfigLoader;
/// use mortgage_engine::models::{ContributionCap, LoanType, Occupancy};
/// use rust_decimal_macros::dec;
///
/// let config = ConfigLoader::load("./config/rate_tables.yaml").unwrap().into_config();
/// let result = calculate_contribution_limit(
///     LoanType::Conventional,
///     dec!(400000),
///     dec!(90),
///     Occupancy::PrimaryResidence,
///     &config,
///     1,
/// )
/// .unwrap();
/// assert_eq!(result.limits.closing_cost_cap, ContributionCap::Limited(dec!(24000.00)));
/// ```
pub fn calculate_contribution_limit(
    loan_type: LoanType,
    purchase_price: Decimal,
    base_ltv: Decimal,
    occupancy: Occupancy,
    config: &RateTableConfig,
    step_number: u32,
) -> EngineResult<ContributionLimitResult> {
    let table = config.seller_contributions()?;
    let mut warnings = Vec::new();

    let bracket_cap = |brackets: &[ContributionBracket]| {
        match_bracket(brackets, base_ltv).map(|bracket| {
            (
                ContributionCap::Limited(round_money(percent_of(purchase_price, bracket.max_contribution_percentage))),
                format!(
                    "LTV {}% in bracket '{}' -> {}% of price",
                    base_ltv.normalize(),
                    bracket.ltv_range,
                    bracket.max_contribution_percentage
                ),
            )
        })
    };

    let (limits, reasoning) = match loan_type {
        LoanType::Conventional => {
            let rows = table
                .conventional
                .as_ref()
                .ok_or_else(|| EngineError::missing_section("seller_contributions.conventional"))?;
            let resolved = rows.get(&occupancy).and_then(|brackets| bracket_cap(brackets.as_slice()));
            let (cap, reasoning) = resolved.unwrap_or_else(|| {
                warn!(?occupancy, %base_ltv, "No conventional contribution bracket matched");
                warnings.push(AuditWarning::new(
                    CONTRIBUTION_LIMIT_UNRESOLVED,
                    format!(
                        "No conventional contribution limit for {:?} at {}% LTV; only the general seller credit cap applies",
                        occupancy, base_ltv
                    ),
                    WarningSeverity::Medium,
                ));
                (
                    ContributionCap::Unlimited,
                    format!("No bracket for {:?} at {}% LTV", occupancy, base_ltv.normalize()),
                )
            });
            (
                ContributionLimits {
                    closing_cost_cap: cap,
                    concession_cap: None,
                },
                reasoning,
            )
        }
        LoanType::Fha | LoanType::Usda => {
            let (brackets, section) = match loan_type {
                LoanType::Fha => (table.fha.as_ref(), "seller_contributions.fha"),
                _ => (table.usda.as_ref(), "seller_contributions.usda"),
            };
            let brackets = brackets.ok_or_else(|| EngineError::missing_section(section))?;
            let (cap, reasoning) = bracket_cap(brackets.as_slice()).unwrap_or_else(|| {
                warn!(section, %base_ltv, "No contribution bracket matched");
                warnings.push(AuditWarning::new(
                    CONTRIBUTION_LIMIT_UNRESOLVED,
                    format!("No {} contribution limit at {}% LTV", loan_type.code(), base_ltv),
                    WarningSeverity::Medium,
                ));
                (ContributionCap::Unlimited, format!("No bracket at {}% LTV", base_ltv.normalize()))
            });
            (
                ContributionLimits {
                    closing_cost_cap: cap,
                    concession_cap: None,
                },
                reasoning,
            )
        }
        LoanType::Va => {
            let rule = table
                .va
                .as_ref()
                .ok_or_else(|| EngineError::missing_section("seller_contributions.va"))?;
            let concession_cap = round_money(percent_of(purchase_price, rule.concession_cap_percentage));
            (
                ContributionLimits {
                    closing_cost_cap: ContributionCap::Unlimited,
                    concession_cap: Some(concession_cap),
                },
                format!(
                    "VA closing costs uncapped; concessions capped at {}% = ${}",
                    rule.concession_cap_percentage, concession_cap
                ),
            )
        }
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "contribution_limit".to_string(),
        rule_name: "Seller Contribution Limit".to_string(),
        input: serde_json::json!({
            "loan_type": loan_type.code(),
            "purchase_price": purchase_price.to_string(),
            "base_ltv": base_ltv.to_string(),
            "occupancy": occupancy
        }),
        output: serde_json::json!({
            "closing_cost_cap": limits.closing_cost_cap.amount().map(|a| a.to_string()),
            "concession_cap": limits.concession_cap.map(|a| a.to_string())
        }),
        reasoning,
    };

    Ok(ContributionLimitResult {
        limits,
        warnings,
        audit_step,
    })
}
