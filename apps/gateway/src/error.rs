use actix_web::error::ResponseError;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::Serialize;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::error;

use crate::errors::ErrorCode;
use crate::trace_ctx;

/// Response header carrying the request-correlation identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Failure body shared by every component:
/// `{ success: false, error: { code, message }, meta: { timestamp, path } }`.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorBody,
    pub meta: ErrorMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorMeta {
    pub timestamp: String,
    pub path: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthenticated: {detail}")]
    Unauthenticated { detail: String },
    #[error("Forbidden: {detail}")]
    Forbidden { detail: String },
    #[error("Validation error: {detail}")]
    Validation { detail: String },
    #[error("Too many requests: {detail}")]
    TooManyRequests { detail: String },
    #[error("Backend unavailable: {detail}")]
    BackendUnavailable { detail: String },
    #[error("Backend timeout: {detail}")]
    BackendTimeout { detail: String },
    #[error("Backend error ({status}): {detail}")]
    Backend { status: u16, detail: String },
    #[error("Storage error: {detail}")]
    Storage { detail: String },
    #[error("Not found: {detail}")]
    NotFound { detail: String },
    #[error("Internal error: {detail}")]
    Internal { detail: String },
    #[error("Configuration error: {detail}")]
    Config { detail: String },
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Unauthenticated { .. } => ErrorCode::Unauthenticated,
            AppError::Forbidden { .. } => ErrorCode::Forbidden,
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::TooManyRequests { .. } => ErrorCode::TooManyRequests,
            AppError::BackendUnavailable { .. } => ErrorCode::BackendUnavailable,
            AppError::BackendTimeout { .. } => ErrorCode::BackendTimeout,
            AppError::Backend { .. } => ErrorCode::BackendError,
            AppError::Storage { .. } => ErrorCode::StorageError,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Config { .. } => ErrorCode::ConfigError,
        }
    }

    /// Client-facing message. Internal details never leave the process.
    pub fn message(&self) -> String {
        match self {
            AppError::Unauthenticated { detail }
            | AppError::Forbidden { detail }
            | AppError::Validation { detail }
            | AppError::TooManyRequests { detail }
            | AppError::BackendUnavailable { detail }
            | AppError::BackendTimeout { detail }
            | AppError::Backend { detail, .. }
            | AppError::NotFound { detail } => detail.clone(),
            AppError::Storage { .. } => "Failed to store uploaded file".to_string(),
            AppError::Internal { .. } | AppError::Config { .. } => {
                "Internal server error".to_string()
            }
        }
    }

    /// Get the HTTP status code for this error
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::BackendUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::BackendTimeout { .. } => StatusCode::REQUEST_TIMEOUT,
            AppError::Backend { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            AppError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn unauthenticated(detail: impl Into<String>) -> Self {
        Self::Unauthenticated {
            detail: detail.into(),
        }
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::Forbidden {
            detail: detail.into(),
        }
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation {
            detail: detail.into(),
        }
    }

    pub fn too_many_requests(detail: impl Into<String>) -> Self {
        Self::TooManyRequests {
            detail: detail.into(),
        }
    }

    pub fn backend_unavailable(detail: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            detail: detail.into(),
        }
    }

    pub fn backend_timeout(detail: impl Into<String>) -> Self {
        Self::BackendTimeout {
            detail: detail.into(),
        }
    }

    /// Upstream failure. Statuses outside 400..=599 become 500 so a failure
    /// is never rendered as success or redirect.
    pub fn backend(status: u16, detail: impl Into<String>) -> Self {
        Self::Backend {
            status: if (400..=599).contains(&status) { status } else { 500 },
            detail: detail.into(),
        }
    }

    pub fn storage(detail: impl Into<String>) -> Self {
        Self::Storage {
            detail: detail.into(),
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::NotFound {
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal {
            detail: detail.into(),
        }
    }

    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }

    /// True for failures caused by the target being unreachable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, AppError::BackendUnavailable { .. })
    }

    /// Build the envelope for this error at the given path.
    pub fn envelope(&self, path: String) -> ErrorEnvelope {
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());

        ErrorEnvelope {
            success: false,
            error: ErrorBody {
                code: self.code().as_str().to_string(),
                message: self.message(),
            },
            meta: ErrorMeta { timestamp, path },
        }
    }
}

impl From<std::env::VarError> for AppError {
    fn from(e: std::env::VarError) -> Self {
        AppError::config(format!("env var error: {e}"))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status();
        let request_id = trace_ctx::request_id();

        if status.is_server_error() {
            error!(code = %self.code(), error = %self, request_id = %request_id, "request failed");
        }

        HttpResponse::build(status)
            .insert_header((REQUEST_ID_HEADER, request_id))
            .json(self.envelope(trace_ctx::request_path()))
    }
}
