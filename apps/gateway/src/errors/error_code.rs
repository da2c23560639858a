//! Error codes for the gateway API.
//!
//! Every failure response carries exactly one of these in `error.code`.
//! Add new codes here; never pass ad-hoc strings as error codes.

use core::fmt;

/// Centralized error codes.
///
/// Each variant maps to the canonical string clients branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Missing, malformed, expired, or badly signed credential
    Unauthenticated,
    /// Authenticated but lacking a role or feature
    Forbidden,
    /// Malformed client input, including upload constraints
    ValidationError,
    /// Per-client request budget exhausted
    TooManyRequests,
    /// Target backend unreachable
    BackendUnavailable,
    /// No backend reply in time
    BackendTimeout,
    /// Backend replied with an application-level failure
    BackendError,
    /// Upload persistence failed
    StorageError,
    /// No route matched
    NotFound,
    /// Anything else
    InternalError,
    /// Invalid startup configuration
    ConfigError,
}

impl ErrorCode {
    /// Returns the canonical string for this error code.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "Unauthenticated",
            Self::Forbidden => "Forbidden",
            Self::ValidationError => "ValidationError",
            Self::TooManyRequests => "TooManyRequests",
            Self::BackendUnavailable => "BackendUnavailable",
            Self::BackendTimeout => "BackendTimeout",
            Self::BackendError => "BackendError",
            Self::StorageError => "StorageError",
            Self::NotFound => "NotFound",
            Self::InternalError => "InternalError",
            Self::ConfigError => "ConfigError",
        }
    }

    /// All codes, for uniqueness checks.
    pub const ALL: [ErrorCode; 11] = [
        Self::Unauthenticated,
        Self::Forbidden,
        Self::ValidationError,
        Self::TooManyRequests,
        Self::BackendUnavailable,
        Self::BackendTimeout,
        Self::BackendError,
        Self::StorageError,
        Self::NotFound,
        Self::InternalError,
        Self::ConfigError,
    ];
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
