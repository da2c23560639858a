use std::path::PathBuf;
use std::sync::Arc;

use super::security_config::SecurityConfig;
use crate::authz::EntitlementCache;
use crate::config::RateLimitConfig;
use crate::dispatch::Dispatchers;
use crate::upload::UploadRelay;

/// Shared, read-mostly resources handed to every request.
#[derive(Clone)]
pub struct AppState {
    /// Token verification settings
    pub security: SecurityConfig,
    /// One dispatcher per backend domain
    pub dispatchers: Dispatchers,
    /// The only mutable shared state in the process
    pub entitlements: Arc<EntitlementCache>,
    pub uploads: Arc<UploadRelay>,
    /// Directory served under `/uploads` when storing locally
    pub local_upload_root: Option<PathBuf>,
    /// Environment name reported by the health endpoint
    pub app_env: String,
    pub cors_allowed_origins: Vec<String>,
    pub rate_limit: RateLimitConfig,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("security", &self.security)
            .field("cached_entitlements", &self.entitlements.len())
            .field("local_upload_root", &self.local_upload_root)
            .field("app_env", &self.app_env)
            .field("rate_limit", &self.rate_limit)
            .finish_non_exhaustive()
    }
}
