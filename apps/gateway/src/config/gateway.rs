use std::time::Duration;

use super::env::EnvSource;
use crate::dispatch::{BackendDomain, RetryPolicy, TransportKind};
use crate::error::AppError;

/// Where one backend domain lives and how to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    pub domain: BackendDomain,
    pub transport: TransportKind,
    pub host: String,
    pub port: u16,
    pub queue: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStorage {
    Local { dir: String },
    Remote { url: String, preset: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    pub storage: UploadStorage,
    /// Base prepended to relative upload URLs handed to backends
    pub public_base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub window: Duration,
    pub max_requests: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window: Duration::from_millis(60_000),
            max_requests: 100,
        }
    }
}

/// Startup configuration, validated eagerly.
#[derive(Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub app_env: String,
    pub jwt_secret: Vec<u8>,
    pub broker_url: Option<String>,
    pub backends: Vec<BackendTarget>,
    pub backend_timeout: Duration,
    pub subscription_retry: RetryPolicy,
    pub upload: UploadConfig,
    pub cors_allowed_origins: Vec<String>,
    pub rate_limit: RateLimitConfig,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("app_env", &self.app_env)
            .field("jwt_secret", &"<redacted>")
            .field("broker_url", &self.broker_url.as_ref().map(|_| "<set>"))
            .field("backends", &self.backends)
            .field("backend_timeout", &self.backend_timeout)
            .field("subscription_retry", &self.subscription_retry)
            .field("upload", &self.upload)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_source(&EnvSource::process())
    }

    pub fn from_source(env: &EnvSource<'_>) -> Result<Self, AppError> {
        let jwt_secret = env.must_var("JWT_SECRET")?.into_bytes();

        let backends = BackendDomain::ALL
            .iter()
            .map(|domain| backend_target(env, *domain))
            .collect::<Result<Vec<_>, _>>()?;

        let needs_broker = backends
            .iter()
            .any(|b| b.transport == TransportKind::Queue);
        let broker_url = if needs_broker {
            Some(env.must_var("BROKER_URL")?)
        } else {
            env.var("BROKER_URL")
        };

        let storage = match env.var_or("UPLOAD_STORAGE", "local").to_ascii_lowercase().as_str() {
            "local" => UploadStorage::Local {
                dir: env.var_or("UPLOAD_DIR", "/app/uploads"),
            },
            "remote" => UploadStorage::Remote {
                url: env.must_var("UPLOAD_REMOTE_URL")?,
                preset: env.must_var("UPLOAD_REMOTE_PRESET")?,
            },
            other => {
                return Err(AppError::config(format!(
                    "Invalid value '{other}' for UPLOAD_STORAGE: expected local or remote"
                )))
            }
        };

        let retry_unit_ms: u64 = env.parse_or("SUBSCRIPTION_RETRY_UNIT_MS", 1000)?;

        Ok(Self {
            host: env.var_or("HOST", "0.0.0.0"),
            port: env.parse_or("PORT", 3000)?,
            app_env: env.var_or("APP_ENV", "development"),
            jwt_secret,
            broker_url,
            backends,
            backend_timeout: Duration::from_secs(env.parse_or("BACKEND_TIMEOUT_SECS", 30)?),
            subscription_retry: RetryPolicy::linear(
                env.parse_or("SUBSCRIPTION_RETRY_ATTEMPTS", 5)?,
                Duration::from_millis(retry_unit_ms),
            ),
            upload: UploadConfig {
                storage,
                public_base_url: env.var_or("PUBLIC_BASE_URL", "http://localhost:3000"),
            },
            cors_allowed_origins: env.list("CORS_ALLOWED_ORIGINS"),
            rate_limit: RateLimitConfig {
                enabled: env.parse_or("RATE_LIMIT_ENABLED", true)?,
                window: Duration::from_millis(env.parse_or("RATE_LIMIT_WINDOW_MS", 60_000)?),
                max_requests: env.parse_or("RATE_LIMIT_MAX_REQUESTS", 100)?,
            },
        })
    }

    pub fn backend(&self, domain: BackendDomain) -> Option<&BackendTarget> {
        self.backends.iter().find(|b| b.domain == domain)
    }
}

fn backend_target(env: &EnvSource<'_>, domain: BackendDomain) -> Result<BackendTarget, AppError> {
    let prefix = env.var_name_prefix(domain);
    let transport = match env.var(&format!("{prefix}_TRANSPORT")) {
        None => domain.default_transport(),
        Some(raw) => raw
            .parse()
            .map_err(|e| AppError::config(format!("Invalid {prefix}_TRANSPORT: {e}")))?,
    };

    Ok(BackendTarget {
        domain,
        transport,
        host: env.var_or(&format!("{prefix}_HOST"), "localhost"),
        port: env.parse_or(&format!("{prefix}_PORT"), domain.default_port())?,
        queue: env.var_or(&format!("{prefix}_QUEUE"), &domain.default_queue()),
    })
}

impl EnvSource<'_> {
    fn var_name_prefix(&self, domain: BackendDomain) -> String {
        format!("{}_SERVICE", domain.env_prefix())
    }
}
