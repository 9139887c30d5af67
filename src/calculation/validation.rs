//! Loan request validation.
//!
//! This module turns a raw JSON request map into a normalized
//! [`LoanRequest`], failing on the first field that is missing, not numeric,
//! or out of bounds.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::RateTableConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    DownPayment, LoanRequest, LoanType, Occupancy, TransactionType, VaService, VaUsage,
};

use super::rounding::round_rate;

/// Lowest accepted credit score.
pub const MIN_CREDIT_SCORE: u16 = 300;

/// Highest accepted credit score.
pub const MAX_CREDIT_SCORE: u16 = 850;

/// Upper bound on percentage inputs (tax rate, insurance rate, discount points).
pub const MAX_RATE_PERCENT: Decimal = Decimal::ONE_HUNDRED;

/// Typed accessors over the raw request fields.
struct RawFields<'a>(&'a Map<String, Value>);

impl<'a> RawFields<'a> {
    /// Returns the field unless it is absent, null, or an empty string.
    fn present(&self, name: &str) -> Option<&'a Value> {
        match self.0.get(name) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(value) => Some(value),
        }
    }

    fn decimal(&self, name: &str) -> EngineResult<Option<Decimal>> {
        let Some(value) = self.present(name) else {
            return Ok(None);
        };

        let text = match value {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.trim().to_string(),
            _ => return Err(EngineError::validation(name, "must be a number")),
        };

        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .map(Some)
            .map_err(|_| EngineError::validation(name, format!("'{}' is not a number", text)))
    }

    fn required_decimal(&self, name: &str) -> EngineResult<Decimal> {
        self.decimal(name)?
            .ok_or_else(|| EngineError::validation(name, "is required"))
    }

    /// Reads an optional amount or rate that must not be negative, defaulting to zero.
    fn non_negative(&self, name: &str) -> EngineResult<Decimal> {
        let value = self.decimal(name)?.unwrap_or(Decimal::ZERO);
        if value.is_sign_negative() && !value.is_zero() {
            return Err(EngineError::validation(name, "must not be negative"));
        }
        Ok(value)
    }

    /// Reads an optional non-negative value that must not exceed `max`.
    fn at_most(&self, name: &str, max: Decimal, bound: &str) -> EngineResult<Decimal> {
        let value = self.non_negative(name)?;
        if value > max {
            return Err(EngineError::validation(
                name,
                format!("must not exceed {} ({})", bound, max),
            ));
        }
        Ok(value)
    }

    fn whole_number(&self, name: &str) -> EngineResult<Option<u32>> {
        let Some(value) = self.decimal(name)? else {
            return Ok(None);
        };
        if !value.fract().is_zero() {
            return Err(EngineError::validation(name, "must be a whole number"));
        }
        if value <= Decimal::ZERO {
            return Err(EngineError::validation(name, "must be greater than 0"));
        }
        value
            .to_u32()
            .map(Some)
            .ok_or_else(|| EngineError::validation(name, "is too large"))
    }

    fn boolean(&self, name: &str) -> EngineResult<Option<bool>> {
        let Some(value) = self.present(name) else {
            return Ok(None);
        };
        match value {
            Value::Bool(b) => Ok(Some(*b)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" => Ok(Some(true)),
                "false" | "no" => Ok(Some(false)),
                _ => Err(EngineError::validation(name, "must be true or false")),
            },
            _ => Err(EngineError::validation(name, "must be true or false")),
        }
    }

    /// Reads a code from a closed set.
    fn code<T>(
        &self,
        name: &str,
        parse: fn(&str) -> Option<T>,
        allowed: &str,
    ) -> EngineResult<Option<T>> {
        let Some(value) = self.present(name) else {
            return Ok(None);
        };
        let Value::String(text) = value else {
            return Err(EngineError::validation(name, format!("must be one of {}", allowed)));
        };
        parse(text).map(Some).ok_or_else(|| {
            EngineError::validation(name, format!("'{}' is not one of {}", text, allowed))
        })
    }

    fn date(&self, name: &str) -> EngineResult<Option<NaiveDate>> {
        let Some(value) = self.present(name) else {
            return Ok(None);
        };
        let Value::String(text) = value else {
            return Err(EngineError::validation(name, "must be a YYYY-MM-DD date"));
        };
        NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| EngineError::validation(name, format!("'{}' is not a YYYY-MM-DD date", text)))
    }
}

/// Validates and normalizes a raw loan request.
///
/// Required fields: `purchase_price`, `loan_type`, one of
/// `down_payment_percent` / `down_payment_amount` (percent wins when both
/// are sent), `interest_rate`, `loan_term_years`. Every other field is
/// optional and defaults as in [`LoanRequest::new`].
///
/// # Errors
///
/// - [`EngineError::Validation`] for the first invalid field
/// - [`EngineError::Configuration`] if the `limits` or `loan_types` tables are absent
///
/// # Examples
///
/// ```
/// use mortgage_engine::calculation::validate_request;
/// use mortgage_engine::config::ConfigLoader;
/// use mortgage_engine::models::LoanType;
/// use serde_json::json;
///
/// let config = ConfigLoader::load("./config/rate_tables.yaml").unwrap().into_config();
/// let raw = json!({
///     "purchase_price": 400000,
///     "down_payment_percent": 10,
///     "interest_rate": "6.5",
///     "loan_term_years": 30,
///     "loan_type": "conventional"
/// });
///
/// let request = validate_request(&raw, &config).unwrap();
/// assert_eq!(request.loan_type, LoanType::Conventional);
/// assert_eq!(request.term_years, 30);
/// ```
pub fn validate_request(raw: &Value, config: &RateTableConfig) -> EngineResult<LoanRequest> {
    let map = raw
        .as_object()
        .ok_or_else(|| EngineError::validation("request", "must be a JSON object"))?;
    let fields = RawFields(map);
    let limits = config.limits()?;

    let purchase_price = fields.required_decimal("purchase_price")?;
    if purchase_price < limits.min_purchase_price {
        return Err(EngineError::validation(
            "purchase_price",
            format!("must be at least {}", limits.min_purchase_price),
        ));
    }
    if purchase_price > limits.max_purchase_price {
        return Err(EngineError::validation(
            "purchase_price",
            format!("must not exceed {}", limits.max_purchase_price),
        ));
    }

    let loan_type = fields
        .code("loan_type", LoanType::from_code, "conventional, fha, va, usda")?
        .ok_or_else(|| EngineError::validation("loan_type", "is required"))?;

    let (down_payment, down_payment_field) = read_down_payment(&fields, purchase_price)?;
    check_program_limits(config, loan_type, purchase_price, down_payment, down_payment_field)?;

    let interest_rate = round_rate(fields.required_decimal("interest_rate")?);
    if interest_rate.is_sign_negative() && !interest_rate.is_zero() {
        return Err(EngineError::validation("interest_rate", "must not be negative"));
    }
    if interest_rate > limits.max_interest_rate {
        return Err(EngineError::validation(
            "interest_rate",
            format!("must not exceed {}%", limits.max_interest_rate),
        ));
    }

    let term_years = fields
        .whole_number("loan_term_years")?
        .ok_or_else(|| EngineError::validation("loan_term_years", "is required"))?;
    if term_years > limits.max_term_years {
        return Err(EngineError::validation(
            "loan_term_years",
            format!("must not exceed {} years", limits.max_term_years),
        ));
    }

    let mut request = LoanRequest::new(
        purchase_price,
        down_payment,
        interest_rate,
        term_years,
        loan_type,
    );

    request.property_tax_rate = fields.at_most("property_tax_rate", MAX_RATE_PERCENT, "100%")?;
    request.insurance_rate = fields.at_most("insurance_rate", MAX_RATE_PERCENT, "100%")?;
    request.discount_points = fields.at_most("discount_points", MAX_RATE_PERCENT, "100 points")?;
    request.hoa_monthly = fields.at_most("hoa_fee", purchase_price, "the purchase price")?;
    request.seller_credit = fields.at_most("seller_credit", purchase_price, "the purchase price")?;
    request.lender_credit = fields.at_most("lender_credit", purchase_price, "the purchase price")?;
    request.closing_date = fields.date("closing_date")?;

    if let Some(transaction_type) =
        fields.code("transaction_type", TransactionType::from_code, "purchase, refinance")?
    {
        request.transaction_type = transaction_type;
    }
    if let Some(occupancy) = fields.code(
        "occupancy",
        Occupancy::from_code,
        "primary_residence, second_home, investment",
    )? {
        request.occupancy = occupancy;
    }
    if let Some(include) = fields.boolean("include_owners_title")? {
        request.include_owners_title = include;
    }
    if let Some(score) = fields.whole_number("credit_score")? {
        let in_range = (u32::from(MIN_CREDIT_SCORE)..=u32::from(MAX_CREDIT_SCORE)).contains(&score);
        if !in_range {
            return Err(EngineError::validation(
                "credit_score",
                format!("must be between {} and {}", MIN_CREDIT_SCORE, MAX_CREDIT_SCORE),
            ));
        }
        request.credit_score = score as u16;
    }

    if let Some(service) = fields.code("va_service", VaService::from_code, "active, reserves")? {
        request.va.service = service;
    }
    if let Some(usage) =
        fields.code("va_usage", VaUsage::from_code, "first_use, subsequent_use")?
    {
        request.va.usage = usage;
    }
    if let Some(exempt) = fields.boolean("va_disability_exempt")? {
        request.va.disability_exempt = exempt;
    }

    debug!(
        loan_type = loan_type.code(),
        purchase_price = %purchase_price,
        term_years,
        "Validated loan request"
    );

    Ok(request)
}

fn read_down_payment(
    fields: &RawFields<'_>,
    purchase_price: Decimal,
) -> EngineResult<(DownPayment, &'static str)> {
    if let Some(percent) = fields.decimal("down_payment_percent")? {
        if percent.is_sign_negative() && !percent.is_zero() {
            return Err(EngineError::validation(
                "down_payment_percent",
                "must not be negative",
            ));
        }
        if percent >= Decimal::ONE_HUNDRED {
            return Err(EngineError::validation(
                "down_payment_percent",
                "must be less than 100",
            ));
        }
        return Ok((DownPayment::Percent(percent), "down_payment_percent"));
    }

    if let Some(amount) = fields.decimal("down_payment_amount")? {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(EngineError::validation(
                "down_payment_amount",
                "must not be negative",
            ));
        }
        if amount >= purchase_price {
            return Err(EngineError::validation(
                "down_payment_amount",
                "must be less than the purchase price",
            ));
        }
        return Ok((DownPayment::Amount(amount), "down_payment_amount"));
    }

    Err(EngineError::validation(
        "down_payment",
        "one of down_payment_percent or down_payment_amount is required",
    ))
}

/// Enforces the program's minimum down payment and maximum LTV.
///
/// An amount is compared as an exact percentage; rounding applies only to
/// the message.
fn check_program_limits(
    config: &RateTableConfig,
    loan_type: LoanType,
    purchase_price: Decimal,
    down_payment: DownPayment,
    field: &str,
) -> EngineResult<()> {
    let program = config.loan_types()?.limits_for(loan_type).ok_or_else(|| {
        EngineError::missing_section(format!("loan_types.{}", loan_type.code()))
    })?;

    let percent = match down_payment {
        DownPayment::Percent(percent) => percent,
        DownPayment::Amount(amount) => amount / purchase_price * Decimal::ONE_HUNDRED,
    };

    if percent < program.min_down_payment {
        return Err(EngineError::validation(
            field,
            format!(
                "{} loans require at least {}% down, got {}%",
                loan_type.code(),
                program.min_down_payment,
                percent.round_dp(4).normalize()
            ),
        ));
    }

    let ltv = Decimal::ONE_HUNDRED - percent;
    if ltv > program.max_ltv {
        return Err(EngineError::validation(
            field,
            format!(
                "LTV {}% exceeds the {} maximum of {}%",
                ltv.round_dp(4).normalize(),
                loan_type.code(),
                program.max_ltv
            ),
        ));
    }

    Ok(())
}
