//! Test gateway assembly: real `build_app`, fake transports, temp upload dir.

use std::sync::Arc;

use actix_extensible_rate_limit::backend::memory::InMemoryBackend;
use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{test, web, Error};
use gateway::config::RateLimitConfig;
use gateway::dispatch::{BackendDomain, RetryPolicy, Transport};
use gateway::{build_app, build_state, AppState};
use serde_json::json;
use tempfile::TempDir;

use super::auth::test_security;
use super::recording::{self, RecordingTransport};

pub const TEST_PUBLIC_BASE: &str = "http://gateway.test";

/// Builder for a fully wired gateway backed by fakes.
///
/// Unless overridden, every domain talks to one [`RecordingTransport`] that
/// echoes JSON payloads, and the subscription domain answers entitlement
/// lookups with `{}`.
pub struct TestGatewayBuilder {
    backend: Arc<RecordingTransport>,
    subscription: Arc<RecordingTransport>,
    overrides: Vec<(BackendDomain, Arc<dyn Transport>)>,
    subscription_retry: RetryPolicy,
    rate_limit: RateLimitConfig,
}

impl TestGatewayBuilder {
    pub fn new() -> Self {
        Self {
            backend: RecordingTransport::echo().shared(),
            subscription: recording::entitlements(json!({})).shared(),
            overrides: Vec::new(),
            subscription_retry: RetryPolicy::NONE,
            rate_limit: RateLimitConfig {
                enabled: false,
                ..RateLimitConfig::default()
            },
        }
    }

    pub fn backend(mut self, transport: RecordingTransport) -> Self {
        self.backend = transport.shared();
        self
    }

    /// Entitlements served by the subscription domain.
    pub fn features(mut self, features: serde_json::Value) -> Self {
        self.subscription = recording::entitlements(features).shared();
        self
    }

    pub fn subscription(mut self, transport: RecordingTransport) -> Self {
        self.subscription = transport.shared();
        self
    }

    pub fn transport(mut self, domain: BackendDomain, transport: Arc<dyn Transport>) -> Self {
        self.overrides.push((domain, transport));
        self
    }

    pub fn subscription_retry(mut self, retry: RetryPolicy) -> Self {
        self.subscription_retry = retry;
        self
    }

    pub fn rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn build(self) -> TestGateway {
        let upload_dir = tempfile::tempdir().expect("temp upload dir");

        let mut builder = build_state()
            .with_security(test_security())
            .with_fallback_transport(self.backend.clone())
            .with_transport(BackendDomain::Subscription, self.subscription.clone())
            .with_subscription_retry(self.subscription_retry)
            .with_local_uploads(upload_dir.path())
            .with_public_base_url(TEST_PUBLIC_BASE)
            .with_app_env("test")
            .with_rate_limit(self.rate_limit);
        for (domain, transport) in self.overrides {
            builder = builder.with_transport(domain, transport);
        }
        let state = builder.build().expect("test state builds");

        TestGateway {
            state: web::Data::new(state),
            backend: self.backend,
            subscription: self.subscription,
            upload_dir,
        }
    }
}

impl Default for TestGatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TestGateway {
    pub state: web::Data<AppState>,
    pub backend: Arc<RecordingTransport>,
    pub subscription: Arc<RecordingTransport>,
    pub upload_dir: TempDir,
}

impl TestGateway {
    pub fn builder() -> TestGatewayBuilder {
        TestGatewayBuilder::new()
    }

    /// Gateway with default fakes.
    pub fn new() -> Self {
        TestGatewayBuilder::new().build()
    }

    /// Initialize the production app around this gateway's state.
    pub async fn service(
        &self,
    ) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error> {
        test::init_service(build_app(self.state.clone(), InMemoryBackend::builder().build())).await
    }

    /// Files currently stored under `namespace`.
    pub fn stored_files(&self, namespace: &str) -> Vec<String> {
        match std::fs::read_dir(self.upload_dir.path().join(namespace)) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}
