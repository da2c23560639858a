//! Authorization gate: per-route requirements checked against the caller.

pub mod entitlements;

use crate::auth::{IdentityClaims, Role};
use crate::AppError;

pub use entitlements::{
    parse_entitlements, EntitlementCache, EntitlementSet, EntitlementSource,
    SubscriptionEntitlementSource,
};

/// What a route demands of its caller. Declared statically next to each
/// handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRequirement {
    pub auth: bool,
    /// Allowed roles; empty means any authenticated caller
    pub roles: &'static [Role],
    pub feature: Option<&'static str>,
}

impl RouteRequirement {
    pub const PUBLIC: Self = Self {
        auth: false,
        roles: &[],
        feature: None,
    };

    pub const AUTHENTICATED: Self = Self {
        auth: true,
        roles: &[],
        feature: None,
    };

    pub const fn roles(roles: &'static [Role]) -> Self {
        Self {
            auth: true,
            roles,
            feature: None,
        }
    }

    pub const fn feature(feature: &'static str) -> Self {
        Self {
            auth: true,
            roles: &[],
            feature: Some(feature),
        }
    }

    pub const fn with_feature(self, feature: &'static str) -> Self {
        Self {
            auth: true,
            roles: self.roles,
            feature: Some(feature),
        }
    }
}

pub const ADMIN_ONLY: RouteRequirement = RouteRequirement::roles(&[Role::Admin]);
pub const USER_ONLY: RouteRequirement = RouteRequirement::roles(&[Role::User]);

/// Decide whether `claims` may use a route declaring `requirement`.
///
/// Role and feature checks are independent; both must pass. The feature
/// check consults the entitlement cache and may fetch on a cold entry.
pub async fn authorize(
    claims: Option<&IdentityClaims>,
    requirement: &RouteRequirement,
    entitlements: &EntitlementCache,
) -> Result<(), AppError> {
    if !requirement.auth {
        return Ok(());
    }

    let claims = claims.ok_or_else(|| AppError::unauthenticated("Authentication required"))?;

    if !requirement.roles.is_empty() {
        let allowed = claims
            .role
            .is_some_and(|role| requirement.roles.contains(&role));
        if !allowed {
            let names: Vec<&str> = requirement.roles.iter().map(Role::as_str).collect();
            return Err(AppError::forbidden(format!(
                "Access denied: requires role {}",
                names.join(" or ")
            )));
        }
    }

    if let Some(feature) = requirement.feature {
        let set = entitlements.get(&claims.subject_id).await;
        if !set.get(feature).copied().unwrap_or(false) {
            return Err(AppError::forbidden(format!(
                "Access denied: your subscription does not include the {feature} feature"
            )));
        }
    }

    Ok(())
}
