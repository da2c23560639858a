//! Feature-entitlement cache.
//!
//! Maps a subject id to the feature flags last fetched for it. Entries never
//! expire; a successful login overwrites them. Each gateway process holds its
//! own cache.

use std::collections::BTreeMap;
use std::sync::Arc;

use actix_web::http::Method;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::dispatch::{path_segment, BackendCall, Dispatcher};
use crate::AppError;

/// Feature name to enabled flag. Ordered so repeated reads serialize
/// identically.
pub type EntitlementSet = BTreeMap<String, bool>;

/// Where cold entries are fetched from.
#[async_trait]
pub trait EntitlementSource: Send + Sync {
    async fn fetch(&self, subject_id: &str) -> Result<EntitlementSet, AppError>;
}

pub struct EntitlementCache {
    entries: DashMap<String, EntitlementSet>,
    source: Arc<dyn EntitlementSource>,
}

impl EntitlementCache {
    pub fn new(source: Arc<dyn EntitlementSource>) -> Self {
        Self {
            entries: DashMap::new(),
            source,
        }
    }

    /// Cached set for `subject_id`, fetching on a miss.
    ///
    /// Never fails: a fetch failure is logged and yields an empty set, and
    /// nothing is stored. Concurrent misses for the same subject may each
    /// fetch.
    pub async fn get(&self, subject_id: &str) -> EntitlementSet {
        if let Some(hit) = self.entries.get(subject_id) {
            return hit.value().clone();
        }

        match self.source.fetch(subject_id).await {
            Ok(set) => {
                debug!(subject_id, features = set.len(), "entitlements cached");
                self.entries.insert(subject_id.to_string(), set.clone());
                set
            }
            Err(err) => {
                warn!(subject_id, error = %err, "entitlement fetch failed, treating as not entitled");
                EntitlementSet::new()
            }
        }
    }

    /// Overwrite the entry for `subject_id` wholesale.
    pub fn refresh(&self, subject_id: &str, set: EntitlementSet) {
        self.entries.insert(subject_id.to_string(), set);
    }

    /// Fetch from the source and store on success, bypassing any cached
    /// value. The fetch error is returned so callers can decide.
    pub async fn reload(&self, subject_id: &str) -> Result<EntitlementSet, AppError> {
        let set = self.source.fetch(subject_id).await?;
        self.refresh(subject_id, set.clone());
        Ok(set)
    }

    pub fn peek(&self, subject_id: &str) -> Option<EntitlementSet> {
        self.entries.get(subject_id).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read a feature map out of a subscription-service reply.
///
/// Accepts a bare object or one wrapped in `data` / `features`. Non-boolean
/// flags count as `false`.
pub fn parse_entitlements(body: &Value) -> Result<EntitlementSet, AppError> {
    let mut object = body
        .as_object()
        .ok_or_else(|| AppError::backend(502, "Entitlement response is not an object"))?;

    for key in ["data", "features"] {
        if let Some(inner) = object.get(key).and_then(Value::as_object) {
            object = inner;
            break;
        }
    }

    Ok(object
        .iter()
        .map(|(name, flag)| (name.clone(), flag.as_bool().unwrap_or(false)))
        .collect())
}

/// Fetches entitlements from the subscription backend.
pub struct SubscriptionEntitlementSource {
    dispatcher: Arc<Dispatcher>,
}

impl SubscriptionEntitlementSource {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl EntitlementSource for SubscriptionEntitlementSource {
    async fn fetch(&self, subject_id: &str) -> Result<EntitlementSet, AppError> {
        let call = BackendCall::new("subscription.user_features", Method::GET)
            .path(format!("internal/user-features/{}", path_segment(subject_id)?));
        let reply = self.dispatcher.dispatch(call).await?;
        parse_entitlements(&reply.body)
    }
}
