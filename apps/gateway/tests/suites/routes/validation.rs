// Typed payloads are checked at the edge and never reach a backend when bad.

use actix_web::http::StatusCode;
use actix_web::test;
use gateway::auth::Role;
use gateway_test_support::envelope::assert_envelope;
use serde_json::json;

use crate::common::boxed;
use crate::support::{bearer, TestGateway};

async fn expect_rejected(uri: &str, body: serde_json::Value, message: Option<&str>) {
    let gw = TestGateway::new();
    let app = gw.service().await;

    let req = test::TestRequest::post()
        .uri(uri)
        .insert_header(("Authorization", bearer("user-1", Some(Role::User))))
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_envelope(boxed(resp), StatusCode::BAD_REQUEST, "ValidationError", message).await;
    assert_eq!(gw.backend.call_count(), 0, "{uri} must not dispatch");
}

#[actix_web::test]
async fn client_supplied_user_id_is_refused() {
    expect_rejected(
        "/api/v1/expenses",
        json!({"description": "Coffee", "amount": 1, "date": "2025-12-11", "userId": "spoof"}),
        Some("userId"),
    )
    .await;
}

#[actix_web::test]
async fn missing_required_field_is_refused() {
    expect_rejected(
        "/api/v1/expenses",
        json!({"description": "Coffee", "date": "2025-12-11"}),
        Some("amount"),
    )
    .await;
}

#[actix_web::test]
async fn string_amount_is_refused() {
    expect_rejected(
        "/api/v1/expenses",
        json!({"description": "Coffee", "amount": "50000", "date": "2025-12-11"}),
        None,
    )
    .await;
}

#[actix_web::test]
async fn bad_date_is_refused() {
    expect_rejected(
        "/api/v1/expenses",
        json!({"description": "Coffee", "amount": 1, "date": "11/12/2025"}),
        Some("date"),
    )
    .await;
}

#[actix_web::test]
async fn blank_description_is_refused() {
    expect_rejected(
        "/api/v1/expenses",
        json!({"description": "  ", "amount": 1, "date": "2025-12-11"}),
        Some("description"),
    )
    .await;
}

#[actix_web::test]
async fn budget_needs_numeric_limit() {
    expect_rejected(
        "/api/v1/budgets",
        json!({"name": "Food", "category": "food", "limit": "lots"}),
        None,
    )
    .await;
}

#[actix_web::test]
async fn malformed_json_is_refused() {
    let gw = TestGateway::new();
    let app = gw.service().await;

    let req = test::TestRequest::post()
        .uri("/api/v1/expenses")
        .insert_header(("Authorization", bearer("user-1", Some(Role::User))))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"description\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_envelope(boxed(resp), StatusCode::BAD_REQUEST, "ValidationError", None).await;
    assert_eq!(gw.backend.call_count(), 0);
}

#[actix_web::test]
async fn stats_days_must_be_positive() {
    let gw = TestGateway::new();
    let app = gw.service().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/subscriptions/stats/revenue-over-time?period=weekly&days=0")
        .insert_header(("Authorization", bearer("admin-1", Some(Role::Admin))))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_envelope(boxed(resp), StatusCode::BAD_REQUEST, "ValidationError", Some("days")).await;
    assert_eq!(gw.subscription.call_count(), 0);
}

#[actix_web::test]
async fn unknown_period_is_refused() {
    let gw = TestGateway::new();
    let app = gw.service().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/auth/stats/users-over-time?period=hourly")
        .insert_header(("Authorization", bearer("admin-1", Some(Role::Admin))))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_envelope(boxed(resp), StatusCode::BAD_REQUEST, "ValidationError", None).await;
    assert_eq!(gw.backend.call_count(), 0);
}
