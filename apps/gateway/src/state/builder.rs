use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::app_state::AppState;
use super::security_config::SecurityConfig;
use crate::authz::{EntitlementCache, EntitlementSource, SubscriptionEntitlementSource};
use crate::config::{GatewayConfig, RateLimitConfig, UploadStorage};
use crate::dispatch::http::{build_client, HttpTransport};
use crate::dispatch::queue::{QueueBroker, QueueTransport};
use crate::dispatch::rpc::RpcTransport;
use crate::dispatch::{
    BackendDomain, Dispatcher, Dispatchers, RetryPolicy, Transport, TransportKind,
};
use crate::error::AppError;
use crate::upload::{LocalDiskStore, ObjectStore, RemoteStore, UploadRelay};

/// Builder for `AppState` (used in both tests and main).
///
/// Production goes through [`StateBuilder::from_config`]; tests plug in fake
/// transports, entitlement sources and stores directly.
pub struct StateBuilder {
    security: Option<SecurityConfig>,
    transports: HashMap<BackendDomain, Arc<dyn Transport>>,
    fallback_transport: Option<Arc<dyn Transport>>,
    subscription_retry: RetryPolicy,
    entitlement_source: Option<Arc<dyn EntitlementSource>>,
    upload_store: Option<Arc<dyn ObjectStore>>,
    local_upload_root: Option<PathBuf>,
    public_base_url: String,
    app_env: String,
    cors_allowed_origins: Vec<String>,
    rate_limit: RateLimitConfig,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self {
            security: None,
            transports: HashMap::new(),
            fallback_transport: None,
            subscription_retry: RetryPolicy::NONE,
            entitlement_source: None,
            upload_store: None,
            local_upload_root: None,
            public_base_url: "http://localhost:3000".to_string(),
            app_env: "development".to_string(),
            cors_allowed_origins: Vec::new(),
            rate_limit: RateLimitConfig::default(),
        }
    }

    /// Wire real transports and storage from validated configuration.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, AppError> {
        let client = build_client(config.backend_timeout)?;
        let broker = config
            .broker_url
            .as_deref()
            .map(QueueBroker::new)
            .transpose()?
            .map(Arc::new);

        let mut builder = Self::new()
            .with_security(SecurityConfig::new(config.jwt_secret.clone()))
            .with_subscription_retry(config.subscription_retry)
            .with_app_env(config.app_env.clone())
            .with_public_base_url(config.upload.public_base_url.clone())
            .with_cors_origins(config.cors_allowed_origins.clone())
            .with_rate_limit(config.rate_limit.clone());

        for target in &config.backends {
            let transport: Arc<dyn Transport> = match target.transport {
                TransportKind::Queue => {
                    let broker = broker.clone().ok_or_else(|| {
                        AppError::config(format!(
                            "BROKER_URL is required for the {} queue transport",
                            target.domain
                        ))
                    })?;
                    Arc::new(QueueTransport::new(
                        target.domain,
                        target.queue.clone(),
                        config.backend_timeout,
                        broker,
                    ))
                }
                TransportKind::Rpc => Arc::new(RpcTransport::new(
                    target.domain,
                    &target.host,
                    target.port,
                    config.backend_timeout,
                )),
                TransportKind::Http => Arc::new(HttpTransport::for_host(
                    target.domain,
                    &target.host,
                    target.port,
                    client.clone(),
                )),
            };
            builder = builder.with_transport(target.domain, transport);
        }

        builder = match &config.upload.storage {
            UploadStorage::Local { dir } => builder.with_local_uploads(dir),
            UploadStorage::Remote { url, preset } => builder.with_upload_store(Arc::new(
                RemoteStore::new(client.clone(), url.clone(), preset.clone()),
            )),
        };

        Ok(builder)
    }

    pub fn with_security(mut self, security: SecurityConfig) -> Self {
        self.security = Some(security);
        self
    }

    pub fn with_transport(mut self, domain: BackendDomain, transport: Arc<dyn Transport>) -> Self {
        self.transports.insert(domain, transport);
        self
    }

    /// Transport for every domain without an explicit one.
    pub fn with_fallback_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.fallback_transport = Some(transport);
        self
    }

    pub fn with_subscription_retry(mut self, retry: RetryPolicy) -> Self {
        self.subscription_retry = retry;
        self
    }

    /// Replace the subscription-backed entitlement source.
    pub fn with_entitlement_source(mut self, source: Arc<dyn EntitlementSource>) -> Self {
        self.entitlement_source = Some(source);
        self
    }

    pub fn with_upload_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.upload_store = Some(store);
        self.local_upload_root = None;
        self
    }

    /// Store uploads on local disk under `dir` and serve them from `/uploads`.
    pub fn with_local_uploads(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.upload_store = Some(Arc::new(LocalDiskStore::new(dir.clone())));
        self.local_upload_root = Some(dir);
        self
    }

    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = url.into();
        self
    }

    pub fn with_app_env(mut self, env: impl Into<String>) -> Self {
        self.app_env = env.into();
        self
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_allowed_origins = origins;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn build(self) -> Result<AppState, AppError> {
        let security = self
            .security
            .ok_or_else(|| AppError::config("JWT secret not configured"))?;

        let mut missing = Vec::new();
        let dispatchers = Dispatchers::from_fn(|domain| {
            let transport = self
                .transports
                .get(&domain)
                .or(self.fallback_transport.as_ref())
                .cloned();
            let retry = if domain == BackendDomain::Subscription {
                self.subscription_retry
            } else {
                RetryPolicy::NONE
            };
            let transport = transport.unwrap_or_else(|| {
                missing.push(domain.name());
                Arc::new(Unconfigured(domain))
            });
            Arc::new(Dispatcher::new(domain, transport, retry))
        });
        if !missing.is_empty() {
            return Err(AppError::config(format!(
                "No transport configured for: {}",
                missing.join(", ")
            )));
        }

        let source = match self.entitlement_source {
            Some(source) => source,
            None => Arc::new(SubscriptionEntitlementSource::new(
                dispatchers.get(BackendDomain::Subscription).clone(),
            )),
        };

        let store = self
            .upload_store
            .ok_or_else(|| AppError::config("Upload storage not configured"))?;

        Ok(AppState {
            security,
            dispatchers,
            entitlements: Arc::new(EntitlementCache::new(source)),
            uploads: Arc::new(UploadRelay::new(store, self.public_base_url)),
            local_upload_root: self.local_upload_root,
            app_env: self.app_env,
            cors_allowed_origins: self.cors_allowed_origins,
            rate_limit: self.rate_limit,
        })
    }
}

impl Default for StateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn build_state() -> StateBuilder {
    StateBuilder::new()
}

/// Placeholder used only while collecting missing domains during `build`.
struct Unconfigured(BackendDomain);

#[async_trait::async_trait]
impl Transport for Unconfigured {
    fn kind(&self) -> TransportKind {
        self.0.default_transport()
    }

    async fn send(
        &self,
        _call: &crate::dispatch::BackendCall,
    ) -> Result<crate::dispatch::BackendReply, AppError> {
        Err(AppError::backend_unavailable(format!(
            "Cannot connect to {}",
            self.0.service_name()
        )))
    }
}
