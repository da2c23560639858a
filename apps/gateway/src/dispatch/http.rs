//! HTTP proxy transport.

use std::time::Duration;

use actix_web::http::StatusCode;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::{error_message, BackendCall, BackendDomain, BackendReply, CallBody, MultipartBody, Transport, TransportKind};
use crate::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Build the shared outbound client.
pub fn build_client(timeout: Duration) -> Result<Client, AppError> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .build()
        .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))
}

pub struct HttpTransport {
    domain: BackendDomain,
    base_url: String,
    client: Client,
}

impl HttpTransport {
    /// `base_url` is the domain root, e.g. `http://localhost:3005/api/v1/subscriptions`.
    pub fn new(domain: BackendDomain, base_url: impl Into<String>, client: Client) -> Self {
        Self {
            domain,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn for_host(domain: BackendDomain, host: &str, port: u16, client: Client) -> Self {
        Self::new(
            domain,
            format!("http://{host}:{port}/api/v1/{}", domain.http_segment()),
            client,
        )
    }

    pub fn url_for(&self, call: &BackendCall) -> String {
        if call.path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, call.path)
        }
    }

    fn map_send_error(&self, err: reqwest::Error, default_message: &str) -> AppError {
        let service = self.domain.service_name();
        if err.is_connect() {
            AppError::backend_unavailable(format!(
                "Cannot connect to {service}. Please ensure {service} is running."
            ))
        } else if err.is_timeout() {
            AppError::backend_timeout(format!("{service} request timeout"))
        } else {
            debug!(domain = %self.domain, error = %err, "http dispatch failed");
            AppError::backend(500, default_message)
        }
    }
}

fn to_form(body: &MultipartBody) -> Result<Form, AppError> {
    let mut form = Form::new();
    for (name, value) in &body.fields {
        form = form.text(name.clone(), value.clone());
    }
    for file in &body.files {
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.filename.clone())
            .mime_str(&file.content_type)
            .map_err(|e| AppError::validation(format!("Invalid content type: {e}")))?;
        form = form.part(file.field.clone(), part);
    }
    Ok(form)
}

/// Parse a reply body: JSON when possible, raw text otherwise, `null` when
/// empty.
fn parse_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[async_trait]
impl Transport for HttpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Http
    }

    async fn send(&self, call: &BackendCall) -> Result<BackendReply, AppError> {
        let default_message = call
            .failure_message
            .clone()
            .unwrap_or_else(|| format!("{} request failed", self.domain.service_name()));

        let method = reqwest::Method::from_bytes(call.method.as_str().as_bytes())
            .map_err(|e| AppError::internal(format!("Unsupported method: {e}")))?;

        let mut request = self.client.request(method, self.url_for(call));
        if !call.query.is_empty() {
            request = request.query(&call.query);
        }
        if let Some(identity) = &call.identity {
            request = request
                .bearer_auth(&identity.token)
                .header(USER_ID_HEADER, &identity.subject_id);
        }
        request = match &call.body {
            CallBody::Empty => request,
            CallBody::Json(value) => request.json(value),
            CallBody::Multipart(body) => request.multipart(to_form(body)?),
        };

        let response = request
            .send()
            .await
            .map_err(|e| self.map_send_error(e, &default_message))?;

        let status = StatusCode::from_u16(response.status().as_u16())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_send_error(e, &default_message))?;
        let body = parse_body(&bytes);

        if status.is_success() {
            Ok(BackendReply { status, body })
        } else {
            let message = error_message(&body).unwrap_or(default_message);
            Err(AppError::backend(status.as_u16(), message))
        }
    }
}
