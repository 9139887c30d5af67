//! Integration tests for the mortgage calculation engine.
//!
//! This test suite drives the HTTP router end to end and covers:
//! - Conventional loans with PMI
//! - FHA upfront and annual MIP
//! - VA funding fee and concession cap
//! - USDA guarantee fees
//! - Prepaid interest from a closing date
//! - Seller contribution limits
//! - Refinance handling
//! - Error cases

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::str::FromStr;
use tower::ServiceExt;

use mortgage_engine::api::{AppState, create_router};
use mortgage_engine::config::ConfigLoader;

// =============================================================================
// Test Helpers
// =============================================================================

fn create_test_state() -> AppState {
    let config = ConfigLoader::load("./config/rate_tables.yaml").expect("Failed to load config");
    AppState::from_loader(config)
}

fn create_router_for_test() -> Router {
    create_router(create_test_state())
}

fn decimal(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Reads a decimal serialized as a JSON string.
fn field(value: &Value) -> Decimal {
    let text = value
        .as_str()
        .unwrap_or_else(|| panic!("Expected decimal string, got {}", value));
    decimal(text)
}

async fn post_calculate(router: Router, body: Value) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/calculate")
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

async fn calculate_ok(body: Value) -> Value {
    let (status, result) = post_calculate(create_router_for_test(), body).await;
    assert_eq!(status, StatusCode::OK, "Unexpected response: {}", result);
    result
}

/// The reference conventional purchase: 400k, 10% down, 6.5%, 30 years.
fn create_conventional_request() -> Value {
    json!({
        "purchase_price": 400000,
        "down_payment_percent": 10,
        "interest_rate": 6.5,
        "loan_term_years": 30,
        "loan_type": "conventional",
        "property_tax_rate": 1.2,
        "insurance_rate": 0.35,
        "hoa_fee": 250,
        "seller_credit": 5000,
        "lender_credit": 2000,
        "discount_points": 1
    })
}

fn with(mut request: Value, key: &str, value: Value) -> Value {
    request[key] = value;
    request
}

fn has_warning(result: &Value, code: &str) -> bool {
    result["audit_trace"]["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .any(|w| w["code"] == code)
}

fn assert_monthly_total_is_sum(result: &Value) {
    let m = &result["monthly_payment"];
    let sum = field(&m["principal_and_interest"])
        + field(&m["property_tax"])
        + field(&m["home_insurance"])
        + field(&m["mortgage_insurance"])
        + field(&m["hoa"]);
    assert_eq!(field(&m["total"]), sum);
}

// =============================================================================
// SECTION 1: Conventional
// =============================================================================

#[tokio::test]
async fn test_conventional_reference_scenario() {
    let result = calculate_ok(create_conventional_request()).await;

    let loan = &result["loan_details"];
    assert_eq!(field(&loan["base_loan_amount"]), decimal("360000"));
    assert_eq!(field(&loan["total_loan_amount"]), decimal("360000"));
    assert_eq!(field(&loan["ltv"]), decimal("90.000"));

    let monthly = &result["monthly_payment"];
    assert_eq!(field(&monthly["principal_and_interest"]), decimal("2275.44"));
    // 0.52% at 90% LTV + 0.05% for the default 740 score
    assert_eq!(field(&monthly["mortgage_insurance"]), decimal("171.00"));
    assert_eq!(field(&monthly["property_tax"]), decimal("400.00"));
    assert_eq!(field(&monthly["home_insurance"]), decimal("116.67"));
    assert_eq!(field(&monthly["total"]), decimal("3213.11"));
    assert_monthly_total_is_sum(&result);
}

#[tokio::test]
async fn test_conventional_closing_costs_and_cash_to_close() {
    let result = calculate_ok(create_conventional_request()).await;

    let closing = &result["closing_costs"];
    assert_eq!(field(&closing["items"]["origination"]), decimal("3600.00"));
    assert_eq!(field(&closing["items"]["discount_points"]), decimal("3600.00"));
    assert_eq!(field(&closing["items"]["transfer_tax"]), decimal("400.00"));
    assert_eq!(field(&closing["items"]["lender_title_insurance"]), decimal("792.00"));
    assert_eq!(field(&closing["items"]["owners_title_insurance"]), decimal("1183.00"));
    assert_eq!(field(&closing["subtotal"]), decimal("11630.00"));
    assert_eq!(field(&closing["total"]), decimal("4630.00"));
    assert_eq!(field(&result["credits"]["total"]), decimal("7000"));

    // 30 default days × $65/day + 2 months tax + 12 months insurance
    assert_eq!(result["prepaid_items"]["interest_days"], 30);
    assert_eq!(field(&result["prepaid_items"]["total"]), decimal("4150.04"));
    assert_eq!(field(&result["escrow_deposit"]["total"]), decimal("1433.34"));

    assert_eq!(field(&result["total_cash_needed"]), decimal("50213.38"));
    assert!(has_warning(&result, "INTEREST_DAYS_DEFAULTED"));
}

#[tokio::test]
async fn test_conventional_at_80_ltv_has_no_pmi() {
    let request = with(create_conventional_request(), "down_payment_percent", json!(20));
    let result = calculate_ok(request).await;

    assert_eq!(field(&result["loan_details"]["ltv"]), decimal("80.000"));
    assert_eq!(field(&result["monthly_payment"]["mortgage_insurance"]), Decimal::ZERO);
}

#[tokio::test]
async fn test_conventional_low_credit_score_raises_pmi() {
    let request = with(create_conventional_request(), "credit_score", json!(690));
    let result = calculate_ok(request).await;

    // 0.52% + 0.35% = 0.87% on 360000 / 12
    assert_eq!(field(&result["monthly_payment"]["mortgage_insurance"]), decimal("261.00"));
}

#[tokio::test]
async fn test_zero_rate_pays_principal_evenly() {
    let request = with(create_conventional_request(), "interest_rate", json!(0));
    let result = calculate_ok(request).await;

    assert_eq!(field(&result["monthly_payment"]["principal_and_interest"]), decimal("1000.00"));
    assert_eq!(field(&result["prepaid_items"]["items"]["prepaid_interest"]), Decimal::ZERO);
}

#[tokio::test]
async fn test_numeric_strings_are_accepted() {
    let request = json!({
        "purchase_price": "400000",
        "down_payment_amount": "40000",
        "interest_rate": "6.5",
        "loan_term_years": "30",
        "loan_type": "Conventional"
    });
    let result = calculate_ok(request).await;

    assert_eq!(field(&result["loan_details"]["down_payment_percent"]), decimal("10.000"));
    assert_eq!(field(&result["monthly_payment"]["principal_and_interest"]), decimal("2275.44"));
}

// =============================================================================
// SECTION 2: FHA
// =============================================================================

#[tokio::test]
async fn test_fha_finances_upfront_mip() {
    let request = with(
        with(create_conventional_request(), "loan_type", json!("fha")),
        "down_payment_percent",
        json!(3.5),
    );
    let result = calculate_ok(request).await;

    let loan = &result["loan_details"];
    assert_eq!(field(&loan["base_loan_amount"]), decimal("386000"));
    assert_eq!(field(&loan["financed_fees"]), decimal("6755.00"));
    assert_eq!(field(&loan["total_loan_amount"]), decimal("392755.00"));
    assert_eq!(field(&loan["ltv"]), decimal("96.500"));

    let monthly = &result["monthly_payment"];
    assert_eq!(field(&monthly["principal_and_interest"]), decimal("2482.48"));
    // 0.55% long-term standard above 90% LTV, charged on the total loan
    assert_eq!(field(&monthly["mortgage_insurance"]), decimal("180.01"));
    assert_monthly_total_is_sum(&result);
}

#[tokio::test]
async fn test_fha_below_minimum_down_payment_is_rejected() {
    let request = with(
        with(create_conventional_request(), "loan_type", json!("fha")),
        "down_payment_percent",
        json!(3),
    );
    let (status, error) = post_calculate(create_router_for_test(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "VALIDATION_ERROR");
    assert_eq!(error["details"], "down_payment_percent");
}

// =============================================================================
// SECTION 3: VA
// =============================================================================

fn create_va_request() -> Value {
    with(
        with(create_conventional_request(), "loan_type", json!("va")),
        "down_payment_percent",
        json!(0),
    )
}

#[tokio::test]
async fn test_va_disability_exempt_has_no_fees() {
    let request = with(create_va_request(), "va_disability_exempt", json!(true));
    let result = calculate_ok(request).await;

    assert_eq!(field(&result["loan_details"]["financed_fees"]), Decimal::ZERO);
    assert_eq!(field(&result["monthly_payment"]["mortgage_insurance"]), Decimal::ZERO);
}

#[tokio::test]
async fn test_va_first_use_funding_fee() {
    let result = calculate_ok(create_va_request()).await;

    assert_eq!(field(&result["loan_details"]["financed_fees"]), decimal("8600.00"));
    assert_eq!(field(&result["loan_details"]["total_loan_amount"]), decimal("408600.00"));
    assert_eq!(field(&result["monthly_payment"]["mortgage_insurance"]), Decimal::ZERO);
}

#[tokio::test]
async fn test_va_subsequent_use_funding_fee() {
    let request = with(create_va_request(), "va_usage", json!("subsequent_use"));
    let result = calculate_ok(request).await;

    assert_eq!(field(&result["loan_details"]["financed_fees"]), decimal("13200.00"));
}

#[tokio::test]
async fn test_va_reports_both_contribution_rules() {
    let result = calculate_ok(create_va_request()).await;

    let limits = &result["contribution_limits"];
    assert_eq!(limits["closing_cost_cap"], "unlimited");
    assert_eq!(field(&limits["concession_cap"]), decimal("16000.00"));
    assert!(!has_warning(&result, "VA_CONCESSION_CAP_EXCEEDED"));
}

#[tokio::test]
async fn test_va_concessions_over_cap_are_flagged() {
    let request = with(
        with(create_va_request(), "seller_credit", json!(20000)),
        "discount_points",
        json!(5),
    );
    let result = calculate_ok(request).await;

    assert!(has_warning(&result, "VA_CONCESSION_CAP_EXCEEDED"));
    // Flagged, not blocked
    assert!(field(&result["total_cash_needed"]) > Decimal::ZERO);
}

#[tokio::test]
async fn test_va_invalid_service_is_rejected() {
    let request = with(create_va_request(), "va_service", json!("navy"));
    let (status, error) = post_calculate(create_router_for_test(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["details"], "va_service");
}

// =============================================================================
// SECTION 4: USDA
// =============================================================================

#[tokio::test]
async fn test_usda_guarantee_fees() {
    let request = json!({
        "purchase_price": 250000,
        "down_payment_percent": 0,
        "interest_rate": 6.5,
        "loan_term_years": 30,
        "loan_type": "usda"
    });
    let result = calculate_ok(request).await;

    assert_eq!(field(&result["loan_details"]["financed_fees"]), decimal("2500.00"));
    assert_eq!(field(&result["loan_details"]["total_loan_amount"]), decimal("252500.00"));
    assert_eq!(field(&result["monthly_payment"]["principal_and_interest"]), decimal("1595.97"));
    // 0.35% annual on the base loan
    assert_eq!(field(&result["monthly_payment"]["mortgage_insurance"]), decimal("72.92"));
}

// =============================================================================
// SECTION 5: Prepaid Interest
// =============================================================================

#[tokio::test]
async fn test_prepaid_interest_from_closing_date() {
    let request = json!({
        "purchase_price": 375000,
        "down_payment_amount": 75000,
        "interest_rate": 5.0,
        "loan_term_years": 30,
        "loan_type": "conventional",
        "closing_date": "2025-03-10"
    });
    let result = calculate_ok(request).await;

    let prepaid = &result["prepaid_items"];
    assert_eq!(prepaid["interest_days"], 22);
    assert_eq!(field(&prepaid["daily_interest"]), decimal("41.67"));
    assert_eq!(field(&prepaid["items"]["prepaid_interest"]), decimal("916.67"));
    assert!(!has_warning(&result, "INTEREST_DAYS_DEFAULTED"));
}

#[tokio::test]
async fn test_invalid_closing_date_is_rejected() {
    let request = with(create_conventional_request(), "closing_date", json!("03/10/2025"));
    let (status, error) = post_calculate(create_router_for_test(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["details"], "closing_date");
}

// =============================================================================
// SECTION 6: Seller Contributions
// =============================================================================

#[tokio::test]
async fn test_seller_credit_over_high_ltv_limit() {
    // 95% LTV allows 3% = 12000
    let request = with(
        with(create_conventional_request(), "down_payment_percent", json!(5)),
        "seller_credit",
        json!(15000),
    );
    let result = calculate_ok(request).await;

    assert_eq!(
        field(&result["contribution_limits"]["closing_cost_cap"]["limited"]),
        decimal("12000")
    );
    assert!(has_warning(&result, "SELLER_CREDIT_EXCEEDS_LIMIT"));
}

#[tokio::test]
async fn test_investment_property_limit() {
    let request = with(
        with(
            with(create_conventional_request(), "down_payment_percent", json!(25)),
            "occupancy",
            json!("investment"),
        ),
        "seller_credit",
        json!(9000),
    );
    let result = calculate_ok(request).await;

    // 2% of 400000
    assert_eq!(
        field(&result["contribution_limits"]["closing_cost_cap"]["limited"]),
        decimal("8000")
    );
    assert!(has_warning(&result, "SELLER_CREDIT_EXCEEDS_LIMIT"));
}

#[tokio::test]
async fn test_credits_cannot_make_closing_costs_negative() {
    let request = with(create_conventional_request(), "lender_credit", json!(50000));
    let result = calculate_ok(request).await;

    assert_eq!(field(&result["closing_costs"]["total"]), Decimal::ZERO);
}

// =============================================================================
// SECTION 7: Refinance
// =============================================================================

#[tokio::test]
async fn test_refinance_declines_owners_title() {
    let request = with(
        with(create_conventional_request(), "transaction_type", json!("refinance")),
        "seller_credit",
        json!(0),
    );
    let result = calculate_ok(request).await;

    let title = &result["title_insurance"];
    assert_eq!(title["owners_policy_included"], false);
    assert_eq!(field(&title["owners_premium"]), Decimal::ZERO);
    // 360000 × 0.22% × 1.3
    assert_eq!(field(&title["lender_premium"]), decimal("1029.60"));
    assert!(result["closing_costs"]["items"].get("owners_title_insurance").is_none());
}

#[tokio::test]
async fn test_refinance_with_seller_credit_is_flagged() {
    let request = with(create_conventional_request(), "transaction_type", json!("refinance"));
    let result = calculate_ok(request).await;

    assert!(has_warning(&result, "SELLER_CREDIT_ON_REFINANCE"));
}

// =============================================================================
// SECTION 8: Error Cases
// =============================================================================

#[tokio::test]
async fn test_unknown_loan_type_is_rejected() {
    let request = with(create_conventional_request(), "loan_type", json!("jumbo"));
    let (status, error) = post_calculate(create_router_for_test(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "VALIDATION_ERROR");
    assert_eq!(error["details"], "loan_type");
}

#[tokio::test]
async fn test_price_below_minimum_is_rejected() {
    let request = with(create_conventional_request(), "purchase_price", json!(5000));
    let (status, error) = post_calculate(create_router_for_test(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["details"], "purchase_price");
}

#[tokio::test]
async fn test_rate_above_maximum_is_rejected() {
    let request = with(create_conventional_request(), "interest_rate", json!(25));
    let (status, error) = post_calculate(create_router_for_test(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["details"], "interest_rate");
}

#[tokio::test]
async fn test_oversized_amounts_are_rejected() {
    for (name, value) in [
        ("seller_credit", json!("79228162514264337593543950335")),
        ("lender_credit", json!("79228162514264337593543950335")),
        ("hoa_fee", json!("79228162514264337593543950335")),
        ("property_tax_rate", json!("10000000000000000000000000")),
        ("insurance_rate", json!("10000000000000000000000000")),
        ("discount_points", json!("10000000000000000000000000")),
    ] {
        let request = with(create_conventional_request(), name, value);
        let (status, error) = post_calculate(create_router_for_test(), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{} should be rejected", name);
        assert_eq!(error["code"], "VALIDATION_ERROR");
        assert_eq!(error["details"], name);
    }
}

#[tokio::test]
async fn test_fha_amount_below_minimum_by_cents_is_rejected() {
    let request = with(create_conventional_request(), "loan_type", json!("fha"));
    let request = with(request, "down_payment_percent", Value::Null);
    let request = with(request, "down_payment_amount", json!(13998.40));
    let (status, error) = post_calculate(create_router_for_test(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["details"], "down_payment_amount");
}

#[tokio::test]
async fn test_non_object_body_is_rejected() {
    let (status, error) = post_calculate(create_router_for_test(), json!([1, 2, 3])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_response_carries_calculation_metadata() {
    let result = calculate_ok(create_conventional_request()).await;

    assert!(result["calculation_id"].as_str().is_some());
    assert!(result["timestamp"].as_str().is_some());
    assert_eq!(result["engine_version"], env!("CARGO_PKG_VERSION"));
    assert!(!result["audit_trace"]["steps"].as_array().unwrap().is_empty());
}
