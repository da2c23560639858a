#![deny(clippy::wildcard_imports)]
#![cfg_attr(test, allow(clippy::wildcard_imports))]

pub mod app;
pub mod auth;
pub mod authz;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod errors;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod trace_ctx;
pub mod upload;

// Re-exports for public API
pub use app::build_app;
pub use auth::{mint_access_token, verify_access_token, IdentityClaims, Role};
pub use authz::{EntitlementCache, EntitlementSet, EntitlementSource, RouteRequirement};
pub use config::GatewayConfig;
pub use dispatch::{BackendCall, BackendDomain, BackendReply, RetryPolicy, Transport};
pub use error::AppError;
pub use errors::ErrorCode;
pub use extractors::Caller;
pub use state::{build_state, AppState, SecurityConfig, StateBuilder};

// Auto-initialize logging for unit tests
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    gateway_test_support::logging::init();
}
