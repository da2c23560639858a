//! Task-local request context for web requests.
//!
//! `RequestTrace` establishes the scope; anything running inside the request
//! future (handlers, extractors, error rendering) can read the correlation id
//! and the path without threading them through every call.
//!
//! This module is part of the web boundary; dispatch and upload code must
//! not depend on it.

use tokio::task_local;

/// Per-request values visible to the whole handler future.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub path: String,
}

task_local! {
    static REQUEST_CTX: RequestContext;
}

/// Correlation id of the current request, or "unknown" outside a request.
pub fn request_id() -> String {
    REQUEST_CTX
        .try_with(|ctx| ctx.request_id.clone())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Path (with query string) of the current request, or "" outside a request.
pub fn request_path() -> String {
    REQUEST_CTX
        .try_with(|ctx| ctx.path.clone())
        .unwrap_or_default()
}

/// Run a future within a request context.
pub async fn with_request_context<F, R>(ctx: RequestContext, future: F) -> R
where
    F: std::future::Future<Output = R>,
{
    REQUEST_CTX.scope(ctx, future).await
}
