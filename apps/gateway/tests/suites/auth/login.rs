// Login: token pass-through plus entitlement cache warm-up.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::test;
use gateway::auth::Role;
use gateway::dispatch::{BackendDomain, BackendReply, TransportKind};
use gateway::AppError;
use gateway_test_support::envelope::assert_envelope;
use serde_json::json;

use crate::common::{boxed, png_bytes, read_json, MultipartBuilder};
use crate::support::auth::token;
use crate::support::{RecordingTransport, TestGateway};

/// Auth backend whose login issues a real token for `subject`.
fn auth_backend(subject: &'static str) -> Arc<RecordingTransport> {
    RecordingTransport::with(move |call| {
        let body = match call.operation.as_str() {
            "auth.login" => json!({
                "accessToken": token(subject, Some(Role::User)),
                "refreshToken": "refresh-abc",
                "user": {"id": subject}
            }),
            _ => json!({}),
        };
        Ok(BackendReply::for_method(&call.method, body))
    })
    .kind_of(TransportKind::Http)
    .shared()
}

fn login_request() -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({"email": "user-1@example.com", "password": "secret1"}))
}

#[actix_web::test]
async fn login_returns_tokens_and_features() {
    let auth = auth_backend("user-1");
    let gw = TestGateway::builder()
        .features(json!({"OCR": true, "AI": false}))
        .transport(BackendDomain::Auth, auth.clone())
        .build();
    let app = gw.service().await;

    let resp = test::call_service(&app, login_request().to_request()).await;
    assert!(resp.status().is_success());
    let body = read_json(resp).await;

    assert!(body["accessToken"].as_str().is_some());
    assert_eq!(body["refreshToken"], "refresh-abc");
    assert_eq!(body["features"], json!({"OCR": true, "AI": false}));
    assert!(body.get("user").is_none());

    let sent = auth.calls_for("auth.login");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].path, "login");
    assert_eq!(gw.subscription.calls_for("subscription.user_features").len(), 1);
}

#[actix_web::test]
async fn login_warms_the_cache_for_gated_routes() {
    let auth = auth_backend("user-1");
    let gw = TestGateway::builder()
        .features(json!({"OCR": true}))
        .transport(BackendDomain::Auth, auth)
        .build();
    let app = gw.service().await;

    let resp = test::call_service(&app, login_request().to_request()).await;
    let body = read_json(resp).await;
    let access = body["accessToken"].as_str().unwrap().to_string();

    let (content_type, payload) = MultipartBuilder::new()
        .file("file", "receipt.png", "image/png", &png_bytes(2048))
        .finish();
    let req = test::TestRequest::post()
        .uri("/api/v1/ocr/scan")
        .insert_header(("Authorization", format!("Bearer {access}")))
        .insert_header(("Content-Type", content_type))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(gw.backend.calls_for("ocr.scan").len(), 1);
    // Served from the entry login stored
    assert_eq!(gw.subscription.calls_for("subscription.user_features").len(), 1);
}

#[actix_web::test]
async fn login_succeeds_with_empty_features_when_lookup_fails() {
    let gw = TestGateway::builder()
        .subscription(RecordingTransport::failing(|| {
            AppError::backend_unavailable("Cannot connect to subscription-service")
        }))
        .transport(BackendDomain::Auth, auth_backend("user-1"))
        .build();
    let app = gw.service().await;

    let resp = test::call_service(&app, login_request().to_request()).await;
    assert!(resp.status().is_success());
    let body = read_json(resp).await;
    assert_eq!(body["features"], json!({}));
    assert!(gw.state.entitlements.peek("user-1").is_none());
}

#[actix_web::test]
async fn login_with_unverifiable_token_is_bad_gateway() {
    let auth = RecordingTransport::replying(json!({
        "accessToken": "not-a-token",
        "refreshToken": "r"
    }))
    .kind_of(TransportKind::Http)
    .shared();
    let gw = TestGateway::builder()
        .transport(BackendDomain::Auth, auth)
        .build();
    let app = gw.service().await;

    let resp = test::call_service(&app, login_request().to_request()).await;
    assert_envelope(boxed(resp), StatusCode::BAD_GATEWAY, "BackendError", None).await;
    assert_eq!(gw.subscription.call_count(), 0);
}

#[actix_web::test]
async fn rejected_credentials_relay_backend_status() {
    let auth = RecordingTransport::failing(|| AppError::backend(401, "Invalid credentials"))
        .kind_of(TransportKind::Http)
        .shared();
    let gw = TestGateway::builder()
        .transport(BackendDomain::Auth, auth)
        .build();
    let app = gw.service().await;

    let resp = test::call_service(&app, login_request().to_request()).await;
    assert_envelope(
        boxed(resp),
        StatusCode::UNAUTHORIZED,
        "BackendError",
        Some("Invalid credentials"),
    )
    .await;
}

#[actix_web::test]
async fn login_body_is_validated_before_dispatch() {
    let auth = auth_backend("user-1");
    let gw = TestGateway::builder()
        .transport(BackendDomain::Auth, auth.clone())
        .build();
    let app = gw.service().await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({"email": "user-1@example.com"}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_envelope(boxed(resp), StatusCode::BAD_REQUEST, "ValidationError", None).await;
    assert_eq!(auth.call_count(), 0);
}

#[actix_web::test]
async fn register_enforces_password_length() {
    let auth = auth_backend("user-1");
    let gw = TestGateway::builder()
        .transport(BackendDomain::Auth, auth.clone())
        .build();
    let app = gw.service().await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({"email": "new@example.com", "password": "123", "fullName": "New"}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_envelope(
        boxed(resp),
        StatusCode::BAD_REQUEST,
        "ValidationError",
        Some("password"),
    )
    .await;
    assert_eq!(auth.call_count(), 0);
}
