//! Backend dispatch.
//!
//! One [`Dispatcher`] per backend domain forwards a [`BackendCall`] over the
//! transport selected for that domain at startup (queue, RPC or HTTP) and
//! returns exactly one reply or one typed failure.

pub mod codec;
pub mod domain;
pub mod http;
pub mod queue;
pub mod retry;
pub mod rpc;

use std::sync::Arc;
use std::time::Instant;

use actix_web::http::{Method, StatusCode};
use actix_web::HttpResponse;
use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;
use tracing::{debug, warn};

use crate::AppError;

pub use domain::{BackendDomain, TransportKind};
pub use retry::RetryPolicy;

/// Everything except RFC 3986 unreserved characters.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a client-supplied value for use as one backend path
/// segment. Empty and dot-only segments are refused, since URL parsing
/// resolves them (even when encoded) against the domain prefix.
pub fn path_segment(raw: &str) -> Result<String, AppError> {
    if raw.is_empty() || raw.chars().all(|c| c == '.') {
        return Err(AppError::validation(format!("Invalid path parameter '{raw}'")));
    }
    Ok(utf8_percent_encode(raw, PATH_SEGMENT).to_string())
}

/// Identity forwarded to HTTP backends as headers.
#[derive(Debug, Clone)]
pub struct ForwardedIdentity {
    pub subject_id: String,
    pub token: String,
}

/// One file inside a multipart body.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Multipart form kept as plain data so it can be rebuilt per attempt.
#[derive(Debug, Clone, Default)]
pub struct MultipartBody {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

#[derive(Debug, Clone, Default)]
pub enum CallBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(MultipartBody),
}

impl CallBody {
    /// Payload for message-style transports.
    pub fn message_payload(&self) -> Result<Value, AppError> {
        match self {
            CallBody::Empty => Ok(Value::Null),
            CallBody::Json(value) => Ok(value.clone()),
            CallBody::Multipart(_) => Err(AppError::internal(
                "multipart bodies can only be dispatched over http",
            )),
        }
    }
}

/// A single outbound call. Queue and RPC transports use `operation` and the
/// JSON body; the HTTP transport uses method, path, query and body.
#[derive(Debug, Clone)]
pub struct BackendCall {
    pub operation: String,
    pub method: Method,
    /// Path relative to the domain base, without a leading slash
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: CallBody,
    pub identity: Option<ForwardedIdentity>,
    /// Message used when a failing HTTP reply carries none
    pub failure_message: Option<String>,
}

impl BackendCall {
    pub fn new(operation: impl Into<String>, method: Method) -> Self {
        Self {
            operation: operation.into(),
            method,
            path: String::new(),
            query: Vec::new(),
            body: CallBody::Empty,
            identity: None,
            failure_message: None,
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into().trim_start_matches('/').to_string();
        self
    }

    pub fn query_pair(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Append a pair only when the value is present.
    pub fn query_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.query_pair(key, v),
            None => self,
        }
    }

    pub fn query_pairs(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = CallBody::Json(body);
        self
    }

    pub fn multipart(mut self, body: MultipartBody) -> Self {
        self.body = CallBody::Multipart(body);
        self
    }

    pub fn identity(mut self, identity: ForwardedIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = Some(message.into());
        self
    }
}

/// Successful backend outcome, forwarded to the client verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendReply {
    pub status: StatusCode,
    pub body: Value,
}

impl BackendReply {
    /// Reply for message-style transports: 201 for POST, 200 otherwise.
    pub fn for_method(method: &Method, body: Value) -> Self {
        let status = if method == Method::POST {
            StatusCode::CREATED
        } else {
            StatusCode::OK
        };
        Self { status, body }
    }

    pub fn into_response(self) -> HttpResponse {
        HttpResponse::build(self.status).json(self.body)
    }
}

/// Transport strategy for one domain.
#[async_trait]
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    async fn send(&self, call: &BackendCall) -> Result<BackendReply, AppError>;
}

/// Generic dispatcher, parameterized by domain, transport and retry policy.
pub struct Dispatcher {
    domain: BackendDomain,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
}

impl Dispatcher {
    pub fn new(domain: BackendDomain, transport: Arc<dyn Transport>, retry: RetryPolicy) -> Self {
        Self {
            domain,
            transport,
            retry,
        }
    }

    pub fn domain(&self) -> BackendDomain {
        self.domain
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    pub async fn dispatch(&self, call: BackendCall) -> Result<BackendReply, AppError> {
        let start = Instant::now();
        let domain = self.domain.name();
        let transport = self.transport.kind();

        let result = self
            .retry
            .run(&call.operation, || self.transport.send(&call))
            .await;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(reply) => debug!(
                operation = %call.operation,
                domain,
                transport = %transport,
                status = reply.status.as_u16(),
                elapsed_ms,
                "dispatch succeeded"
            ),
            Err(err) => {
                if err.status().is_server_error() {
                    warn!(operation = %call.operation, domain, transport = %transport, code = %err.code(), elapsed_ms, "dispatch failed");
                } else {
                    debug!(operation = %call.operation, domain, transport = %transport, code = %err.code(), elapsed_ms, "dispatch failed");
                }
            }
        }

        result
    }
}

/// One dispatcher per backend domain.
#[derive(Clone)]
pub struct Dispatchers {
    by_domain: [Arc<Dispatcher>; BackendDomain::COUNT],
}

impl Dispatchers {
    /// Build every dispatcher with `make`, called once per domain.
    pub fn from_fn(mut make: impl FnMut(BackendDomain) -> Arc<Dispatcher>) -> Self {
        Self {
            by_domain: BackendDomain::ALL.map(&mut make),
        }
    }

    pub fn get(&self, domain: BackendDomain) -> &Arc<Dispatcher> {
        &self.by_domain[domain.index()]
    }

    pub async fn dispatch(
        &self,
        domain: BackendDomain,
        call: BackendCall,
    ) -> Result<BackendReply, AppError> {
        self.get(domain).dispatch(call).await
    }
}

/// Client-facing message from a backend error value: a string, or an object
/// whose `message` is a string or list of strings.
pub fn error_message(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => match map.get("message")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                (!parts.is_empty()).then(|| parts.join(", "))
            }
            _ => None,
        },
        _ => None,
    }
}

/// Map a message-transport `err` value to a `BackendError`.
pub fn backend_error_from_value(value: &Value, default_message: &str) -> AppError {
    let status = value
        .as_object()
        .and_then(|map| map.get("statusCode").or_else(|| map.get("status")))
        .and_then(Value::as_u64)
        .and_then(|s| u16::try_from(s).ok())
        .unwrap_or(500);

    let message = error_message(value).unwrap_or_else(|| default_message.to_string());
    AppError::backend(status, message)
}
