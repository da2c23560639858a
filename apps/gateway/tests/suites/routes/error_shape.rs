// Every failure renders the same envelope with a correlation id.

use actix_web::http::StatusCode;
use actix_web::test;
use gateway::auth::Role;
use gateway::AppError;
use gateway_test_support::envelope::assert_envelope;
use serde_json::json;

use crate::common::boxed;
use crate::support::{bearer, RecordingTransport, TestGateway};

#[actix_web::test]
async fn unknown_route_is_not_found_envelope() {
    let gw = TestGateway::new();
    let app = gw.service().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/nope?x=1")
        .to_request();
    let resp = test::call_service(&app, req).await;

    let env = assert_envelope(
        boxed(resp),
        StatusCode::NOT_FOUND,
        "NotFound",
        Some("Cannot GET /api/v1/nope"),
    )
    .await;
    assert_eq!(env.path, "/api/v1/nope?x=1");
}

#[actix_web::test]
async fn unmatched_method_falls_through_to_not_found() {
    let gw = TestGateway::new();
    let app = gw.service().await;

    let req = test::TestRequest::put()
        .uri("/api/v1/health")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_envelope(boxed(resp), StatusCode::NOT_FOUND, "NotFound", None).await;
}

#[actix_web::test]
async fn inbound_request_id_is_echoed_on_errors() {
    let gw = TestGateway::new();
    let app = gw.service().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/expenses")
        .insert_header(("x-request-id", "client-trace-42"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    let env = assert_envelope(boxed(resp), StatusCode::UNAUTHORIZED, "Unauthenticated", None).await;
    assert_eq!(env.request_id, "client-trace-42");
}

#[actix_web::test]
async fn backend_failure_keeps_status_and_message() {
    let gw = TestGateway::builder()
        .backend(RecordingTransport::failing(|| {
            AppError::backend(404, "Expense not found")
        }))
        .build();
    let app = gw.service().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/expenses/missing-id")
        .insert_header(("Authorization", bearer("user-1", Some(Role::User))))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_envelope(
        boxed(resp),
        StatusCode::NOT_FOUND,
        "BackendError",
        Some("Expense not found"),
    )
    .await;
}

#[actix_web::test]
async fn unavailable_backend_is_503() {
    let gw = TestGateway::builder()
        .backend(RecordingTransport::failing(|| {
            AppError::backend_unavailable("Cannot connect to ai-service")
        }))
        .build();
    let app = gw.service().await;

    let req = test::TestRequest::post()
        .uri("/api/v1/ai/categorize")
        .insert_header(("Authorization", bearer("user-1", Some(Role::User))))
        .set_json(json!({"description": "Grab ride"}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_envelope(
        boxed(resp),
        StatusCode::SERVICE_UNAVAILABLE,
        "BackendUnavailable",
        Some("ai-service"),
    )
    .await;
}

#[actix_web::test]
async fn timeout_is_408() {
    let gw = TestGateway::builder()
        .backend(RecordingTransport::failing(|| {
            AppError::backend_timeout("budget-service request timeout")
        }))
        .build();
    let app = gw.service().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/budgets")
        .insert_header(("Authorization", bearer("user-1", Some(Role::User))))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_envelope(boxed(resp), StatusCode::REQUEST_TIMEOUT, "BackendTimeout", None).await;
}

#[actix_web::test]
async fn internal_errors_hide_details() {
    let gw = TestGateway::builder()
        .backend(RecordingTransport::failing(|| {
            AppError::internal("redis password is hunter2")
        }))
        .build();
    let app = gw.service().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/expenses/summary")
        .insert_header(("Authorization", bearer("user-1", Some(Role::User))))
        .to_request();
    let resp = test::call_service(&app, req).await;

    let env = assert_envelope(
        boxed(resp),
        StatusCode::INTERNAL_SERVER_ERROR,
        "InternalError",
        None,
    )
    .await;
    assert_eq!(env.message, "Internal server error");
}
