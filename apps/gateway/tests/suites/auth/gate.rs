// Token and role/feature gate, exercised through real routes.

use actix_web::http::StatusCode;
use actix_web::test;
use gateway::auth::Role;
use gateway_test_support::envelope::assert_envelope;
use serde_json::json;

use crate::common::{boxed, png_bytes, MultipartBuilder};
use crate::support::{bearer, expired_bearer, TestGateway};

#[actix_web::test]
async fn missing_bearer_is_401_and_never_dispatches() {
    let gw = TestGateway::new();
    let app = gw.service().await;

    let req = test::TestRequest::post()
        .uri("/api/v1/expenses")
        .set_json(json!({"description": "Coffee", "amount": 50000, "date": "2025-12-11"}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    let env = assert_envelope(
        boxed(resp),
        StatusCode::UNAUTHORIZED,
        "Unauthenticated",
        None,
    )
    .await;
    assert_eq!(env.path, "/api/v1/expenses");
    assert_eq!(gw.backend.call_count(), 0);
}

#[actix_web::test]
async fn malformed_and_expired_tokens_are_rejected() {
    let gw = TestGateway::new();
    let app = gw.service().await;

    for header in [
        "Basic dXNlcjpwYXNz".to_string(),
        "Bearer".to_string(),
        "Bearer not.a.jwt".to_string(),
        expired_bearer("user-1"),
    ] {
        let req = test::TestRequest::get()
            .uri("/api/v1/expenses")
            .insert_header(("Authorization", header.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_envelope(boxed(resp), StatusCode::UNAUTHORIZED, "Unauthenticated", None).await;
    }
    assert_eq!(gw.backend.call_count(), 0);
}

#[actix_web::test]
async fn lowercase_bearer_scheme_is_accepted() {
    let gw = TestGateway::new();
    let app = gw.service().await;

    let header = bearer("user-1", Some(Role::User)).replacen("Bearer", "bearer", 1);
    let req = test::TestRequest::get()
        .uri("/api/v1/expenses")
        .insert_header(("Authorization", header))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(gw.backend.call_count(), 1);
}

#[actix_web::test]
async fn expired_token_message_says_expired() {
    let gw = TestGateway::new();
    let app = gw.service().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/auth/me")
        .insert_header(("Authorization", expired_bearer("user-1")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_envelope(
        boxed(resp),
        StatusCode::UNAUTHORIZED,
        "Unauthenticated",
        Some("expired"),
    )
    .await;
}

#[actix_web::test]
async fn public_route_needs_no_token() {
    let gw = TestGateway::new();
    let app = gw.service().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/expenses/categories")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let calls = gw.backend.calls_for("categories.findAll");
    assert_eq!(calls.len(), 1);
    assert!(calls[0].identity.is_none());
}

#[actix_web::test]
async fn admin_route_rejects_user_role() {
    let gw = TestGateway::new();
    let app = gw.service().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/budgets/admin/stats")
        .insert_header(("Authorization", bearer("user-1", Some(Role::User))))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_envelope(boxed(resp), StatusCode::FORBIDDEN, "Forbidden", Some("ADMIN")).await;
    assert_eq!(gw.backend.call_count(), 0);
}

#[actix_web::test]
async fn admin_route_accepts_admin_role() {
    let gw = TestGateway::new();
    let app = gw.service().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/budgets/admin/stats")
        .insert_header(("Authorization", bearer("admin-1", Some(Role::Admin))))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(gw.backend.calls_for("budget.admin_stats").len(), 1);
}

#[actix_web::test]
async fn user_only_budget_routes_reject_admins_and_role_less_tokens() {
    let gw = TestGateway::new();
    let app = gw.service().await;

    for role in [Some(Role::Admin), None] {
        let req = test::TestRequest::get()
            .uri("/api/v1/budgets")
            .insert_header(("Authorization", bearer("someone", role)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_envelope(boxed(resp), StatusCode::FORBIDDEN, "Forbidden", Some("USER")).await;
    }
    assert_eq!(gw.backend.call_count(), 0);
}

#[actix_web::test]
async fn ocr_scan_without_feature_is_403_naming_ocr() {
    let gw = TestGateway::builder()
        .features(json!({"OCR": false, "AI": true}))
        .build();
    let app = gw.service().await;

    let (content_type, body) = MultipartBuilder::new()
        .file("file", "receipt.png", "image/png", &png_bytes(1024))
        .finish();
    let req = test::TestRequest::post()
        .uri("/api/v1/ocr/scan")
        .insert_header(("Authorization", bearer("user-1", Some(Role::User))))
        .insert_header(("Content-Type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_envelope(boxed(resp), StatusCode::FORBIDDEN, "Forbidden", Some("OCR")).await;
    assert!(gw.backend.calls_for("ocr.scan").is_empty());
    assert!(gw.stored_files("ocr").is_empty());
}

#[actix_web::test]
async fn subscription_admin_routes_enforce_admin_role() {
    let gw = TestGateway::new();
    let app = gw.service().await;

    let req = test::TestRequest::post()
        .uri("/api/v1/subscriptions/plans")
        .insert_header(("Authorization", bearer("user-1", Some(Role::User))))
        .set_json(json!({
            "name": "Pro",
            "price": 99000,
            "interval": "MONTHLY",
            "features": ["OCR"]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_envelope(boxed(resp), StatusCode::FORBIDDEN, "Forbidden", Some("ADMIN")).await;
    assert!(gw.subscription.calls_for("subscription.create_plan").is_empty());
}

#[actix_web::test]
async fn notification_create_requires_admin() {
    let gw = TestGateway::new();
    let app = gw.service().await;

    let req = test::TestRequest::post()
        .uri("/api/v1/notifications")
        .insert_header(("Authorization", bearer("user-1", Some(Role::User))))
        .set_json(json!({"title": "Hi", "message": "All", "target": "ALL"}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_envelope(boxed(resp), StatusCode::FORBIDDEN, "Forbidden", None).await;
    assert!(gw.backend.calls_for("notification.create").is_empty());
}
