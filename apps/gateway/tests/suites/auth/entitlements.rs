// Entitlement cache behavior as seen through feature-gated routes.

use actix_web::http::StatusCode;
use actix_web::test;
use gateway::auth::Role;
use gateway::dispatch::{BackendReply, TransportKind};
use gateway::AppError;
use gateway_test_support::envelope::assert_envelope;
use serde_json::json;

use crate::common::{boxed, png_bytes, read_json, MultipartBuilder};
use crate::support::{bearer, RecordingTransport, TestGateway};

fn scan_request(subject: &str) -> actix_http::Request {
    let (content_type, payload) = MultipartBuilder::new()
        .file("file", "receipt.jpg", "image/jpeg", &png_bytes(512))
        .finish();
    test::TestRequest::post()
        .uri("/api/v1/ocr/scan")
        .insert_header(("Authorization", bearer(subject, Some(Role::User))))
        .insert_header(("Content-Type", content_type))
        .set_payload(payload)
        .to_request()
}

fn lookups(gw: &TestGateway) -> usize {
    gw.subscription.calls_for("subscription.user_features").len()
}

#[actix_web::test]
async fn cold_cache_fetches_once_then_serves_from_memory() {
    let gw = TestGateway::builder().features(json!({"OCR": true})).build();
    let app = gw.service().await;

    for _ in 0..3 {
        let resp = test::call_service(&app, scan_request("user-1")).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    assert_eq!(lookups(&gw), 1);
    let call = &gw.subscription.calls_for("subscription.user_features")[0];
    assert_eq!(call.path, "internal/user-features/user-1");
}

#[actix_web::test]
async fn failed_lookup_denies_and_is_not_cached() {
    let gw = TestGateway::builder()
        .subscription(RecordingTransport::failing(|| {
            AppError::backend_unavailable("Cannot connect to subscription-service")
        }))
        .build();
    let app = gw.service().await;

    for expected in 1..=2 {
        let resp = test::call_service(&app, scan_request("user-1")).await;
        assert_envelope(boxed(resp), StatusCode::FORBIDDEN, "Forbidden", Some("OCR")).await;
        assert_eq!(lookups(&gw), expected);
    }
    assert!(gw.backend.calls_for("ocr.scan").is_empty());
}

#[actix_web::test]
async fn subjects_have_independent_entries() {
    let subscription = RecordingTransport::with(|call| {
        let entitled = call.path.ends_with("/premium");
        Ok(BackendReply::for_method(
            &call.method,
            json!({"data": {"OCR": entitled}}),
        ))
    })
    .kind_of(TransportKind::Http);
    let gw = TestGateway::builder().subscription(subscription).build();
    let app = gw.service().await;

    let resp = test::call_service(&app, scan_request("premium")).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = test::call_service(&app, scan_request("free")).await;
    assert_envelope(boxed(resp), StatusCode::FORBIDDEN, "Forbidden", Some("OCR")).await;

    assert_eq!(lookups(&gw), 2);
}

#[actix_web::test]
async fn features_endpoint_reloads_and_refreshes_cache() {
    let gw = TestGateway::builder()
        .features(json!({"OCR": true, "AI": "yes"}))
        .build();
    let app = gw.service().await;

    for expected in 1..=2 {
        let req = test::TestRequest::get()
            .uri("/api/v1/subscriptions/features")
            .insert_header(("Authorization", bearer("user-1", Some(Role::User))))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        // Non-boolean values count as false
        assert_eq!(read_json(resp).await, json!({"OCR": true, "AI": false}));
        assert_eq!(lookups(&gw), expected);
    }

    // Gated route now hits the refreshed entry
    let resp = test::call_service(&app, scan_request("user-1")).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(lookups(&gw), 2);
}
