// Subscription dispatcher retries unreachable backends; others fail fast.

use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::http::StatusCode;
use actix_web::test;
use gateway::auth::Role;
use gateway::dispatch::http::{build_client, HttpTransport};
use gateway::dispatch::{BackendDomain, BackendReply, RetryPolicy, TransportKind};
use gateway::AppError;
use gateway_test_support::envelope::assert_envelope;
use serde_json::json;

use crate::common::boxed;
use crate::support::fake_http::closed_port;
use crate::support::{bearer, RecordingTransport, TestGateway};

const UNIT: Duration = Duration::from_millis(20);

#[actix_web::test]
async fn unreachable_subscription_backend_gives_up_within_ceiling() {
    let client = build_client(Duration::from_secs(5)).unwrap();
    let transport = HttpTransport::for_host(
        BackendDomain::Subscription,
        "127.0.0.1",
        closed_port(),
        client,
    );
    let retry = RetryPolicy::linear(3, UNIT);
    let gw = TestGateway::builder()
        .transport(BackendDomain::Subscription, Arc::new(transport))
        .subscription_retry(retry)
        .build();
    let app = gw.service().await;

    let started = Instant::now();
    let req = test::TestRequest::get()
        .uri("/api/v1/subscriptions/plans")
        .to_request();
    let resp = test::call_service(&app, req).await;
    let elapsed = started.elapsed();

    assert_envelope(
        boxed(resp),
        StatusCode::SERVICE_UNAVAILABLE,
        "BackendUnavailable",
        None,
    )
    .await;
    // 1 + 2 + 3 units of back-off, plus generous slack for connect attempts
    assert!(elapsed >= retry.ceiling(), "retried for {elapsed:?}");
    assert!(elapsed < retry.ceiling() + Duration::from_secs(5), "took {elapsed:?}");
}

#[actix_web::test]
async fn subscription_recovers_after_transient_outage() {
    let attempts = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let seen = attempts.clone();
    let flaky = RecordingTransport::with(move |call| {
        if seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst) < 2 {
            Err(AppError::backend_unavailable("Cannot connect to subscription-service"))
        } else {
            Ok(BackendReply::for_method(&call.method, json!([{"id": "plan-free"}])))
        }
    })
    .kind_of(TransportKind::Http);
    let gw = TestGateway::builder()
        .subscription(flaky)
        .subscription_retry(RetryPolicy::linear(5, UNIT))
        .build();
    let app = gw.service().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/subscriptions/plans")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(gw.subscription.call_count(), 3);
}

#[actix_web::test]
async fn subscription_application_errors_are_not_retried() {
    let gw = TestGateway::builder()
        .subscription(
            RecordingTransport::failing(|| AppError::backend(404, "Plan not found"))
                .kind_of(TransportKind::Http),
        )
        .subscription_retry(RetryPolicy::linear(5, UNIT))
        .build();
    let app = gw.service().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/subscriptions/plans/missing")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_envelope(boxed(resp), StatusCode::NOT_FOUND, "BackendError", Some("Plan not found")).await;
    assert_eq!(gw.subscription.call_count(), 1);
}

#[actix_web::test]
async fn other_domains_fail_fast() {
    let gw = TestGateway::builder()
        .backend(RecordingTransport::failing(|| {
            AppError::backend_unavailable("Cannot connect to budget-service")
        }))
        .subscription_retry(RetryPolicy::linear(5, Duration::from_secs(1)))
        .build();
    let app = gw.service().await;

    let started = Instant::now();
    let req = test::TestRequest::get()
        .uri("/api/v1/budgets")
        .insert_header(("Authorization", bearer("user-1", Some(Role::User))))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(gw.backend.call_count(), 1);
    assert!(started.elapsed() < Duration::from_secs(1));
}
