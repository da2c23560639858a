//! Error envelope test helpers
//!
//! Every gateway failure is rendered as
//! `{ success: false, error: { code, message }, meta: { timestamp, path } }`
//! with an `x-request-id` header. These helpers assert that contract without
//! depending on gateway types.

use actix_web::http::header::HeaderMap;
use actix_web::http::StatusCode;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct EnvelopeLike {
    success: bool,
    error: ErrorBodyLike,
    meta: MetaLike,
}

#[derive(Debug, Deserialize)]
struct ErrorBodyLike {
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct MetaLike {
    timestamp: String,
    path: String,
}

/// Parsed view of an error envelope, returned so callers can make further
/// assertions (e.g. on the path).
#[derive(Debug, Clone)]
pub struct ParsedEnvelope {
    pub code: String,
    pub message: String,
    pub timestamp: String,
    pub path: String,
    pub request_id: String,
}

/// Assert that response parts carry the stable error envelope.
///
/// Checks status, `x-request-id` presence, `success == false`, the error
/// code, and (optionally) a substring of the message.
pub fn assert_envelope_from_parts(
    status: StatusCode,
    headers: &HeaderMap,
    body_bytes: &[u8],
    expected_status: StatusCode,
    expected_code: &str,
    expected_message_contains: Option<&str>,
) -> ParsedEnvelope {
    assert_eq!(status, expected_status, "unexpected HTTP status");

    let request_id = headers
        .get("x-request-id")
        .expect("x-request-id header should be present")
        .to_str()
        .expect("x-request-id header should be valid UTF-8")
        .to_string();
    assert!(!request_id.is_empty(), "x-request-id should not be empty");

    let body_str =
        String::from_utf8(body_bytes.to_vec()).expect("Response body should be valid UTF-8");
    let envelope: EnvelopeLike = serde_json::from_str(&body_str)
        .unwrap_or_else(|e| panic!("body is not an error envelope ({e}): {body_str}"));

    assert!(!envelope.success, "success must be false on failures");
    assert_eq!(envelope.error.code, expected_code);
    assert!(
        !envelope.meta.timestamp.is_empty(),
        "meta.timestamp should be set"
    );

    if let Some(expected) = expected_message_contains {
        assert!(
            envelope.error.message.contains(expected),
            "Expected message to contain '{}', but got '{}'",
            expected,
            envelope.error.message
        );
    }

    ParsedEnvelope {
        code: envelope.error.code,
        message: envelope.error.message,
        timestamp: envelope.meta.timestamp,
        path: envelope.meta.path,
        request_id,
    }
}

/// Assert that a test `ServiceResponse` carries the stable error envelope.
pub async fn assert_envelope(
    resp: actix_web::dev::ServiceResponse<actix_web::body::BoxBody>,
    expected_status: StatusCode,
    expected_code: &str,
    expected_message_contains: Option<&str>,
) -> ParsedEnvelope {
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = actix_web::test::read_body(resp).await;

    assert_envelope_from_parts(
        status,
        &headers,
        &body,
        expected_status,
        expected_code,
        expected_message_contains,
    )
}
