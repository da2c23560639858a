//! Rate limiting configuration helpers.
//!
//! The gateway applies one per-IP budget to every route. Window and budget
//! come from `RATE_LIMIT_WINDOW_MS` / `RATE_LIMIT_MAX_REQUESTS`.

use actix_extensible_rate_limit::backend::{SimpleInputFunctionBuilder, SimpleOutput};
use actix_extensible_rate_limit::HeaderCompatibleOutput;
use actix_web::http::header::{HeaderName, HeaderValue, RETRY_AFTER};
use actix_web::{HttpResponse, ResponseError};

use crate::config::RateLimitConfig;
use crate::AppError;

const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// Per-IP input builder for the general API budget.
pub fn api_rate_limit_config(config: &RateLimitConfig) -> SimpleInputFunctionBuilder {
    SimpleInputFunctionBuilder::new(config.window, config.max_requests).real_ip_key()
}

/// 429 rendered as the standard failure envelope, with the same rate-limit
/// headers allowed responses carry plus `retry-after`.
pub fn denied_response(output: &SimpleOutput) -> HttpResponse {
    let mut response = AppError::too_many_requests("Too Many Requests").error_response();
    let headers = response.headers_mut();
    headers.insert(HeaderName::from_static(X_RATELIMIT_LIMIT), HeaderValue::from(output.limit()));
    headers.insert(HeaderName::from_static(X_RATELIMIT_REMAINING), HeaderValue::from(output.remaining()));
    let reset = output.seconds_until_reset();
    headers.insert(HeaderName::from_static(X_RATELIMIT_RESET), HeaderValue::from(reset));
    headers.insert(RETRY_AFTER, HeaderValue::from(reset));
    response
}
