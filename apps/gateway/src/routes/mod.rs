use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::authz::{self, RouteRequirement};
use crate::dispatch::{BackendCall, BackendDomain};
use crate::error::AppError;
use crate::extractors::Caller;
use crate::state::app_state::AppState;

pub mod ai;
pub mod auth;
pub mod blogs;
pub mod budgets;
pub mod expenses;
pub mod health;
pub mod notifications;
pub mod ocr;
pub mod payments;
pub mod subscriptions;

/// Global path prefix for every API route.
pub const API_PREFIX: &str = "/api/v1";

/// Register every API route under [`API_PREFIX`].
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope(API_PREFIX)
            .configure(health::configure_routes)
            .service(web::scope("/auth").configure(auth::configure_routes))
            .service(web::scope("/expenses").configure(expenses::configure_routes))
            .service(web::scope("/budgets").configure(budgets::configure_routes))
            .service(web::scope("/blogs").configure(blogs::configure_routes))
            .service(web::scope("/subscriptions").configure(subscriptions::configure_routes))
            .service(web::scope("/ocr").configure(ocr::configure_routes))
            .service(web::scope("/ai").configure(ai::configure_routes))
            .service(web::scope("/notifications").configure(notifications::configure_routes))
            .service(web::scope("/payments").configure(payments::configure_routes)),
    );
}

/// Fallback for unmatched routes.
pub async fn not_found(req: HttpRequest) -> Result<HttpResponse, AppError> {
    Err(AppError::not_found(format!(
        "Cannot {} {}",
        req.method(),
        req.path()
    )))
}

/// Apply a route requirement to a verified caller.
pub(crate) async fn require(
    caller: &Caller,
    requirement: RouteRequirement,
    state: &AppState,
) -> Result<(), AppError> {
    authz::authorize(Some(&caller.claims), &requirement, &state.entitlements).await
}

/// Dispatch one call and relay the reply verbatim.
pub(crate) async fn forward(
    state: &AppState,
    domain: BackendDomain,
    call: BackendCall,
) -> Result<HttpResponse, AppError> {
    let reply = state.dispatchers.dispatch(domain, call).await?;
    Ok(reply.into_response())
}

/// Serialize a typed payload into a JSON object.
pub(crate) fn to_object<T: Serialize>(payload: &T) -> Result<Map<String, Value>, AppError> {
    match serde_json::to_value(payload) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(other) => Err(AppError::internal(format!(
            "payload serialized to a non-object: {other}"
        ))),
        Err(e) => Err(AppError::internal(format!("payload serialization failed: {e}"))),
    }
}

/// Payload with the verified subject id stamped as `userId`, replacing any
/// client-supplied value.
pub(crate) fn with_user_id<T: Serialize>(payload: &T, caller: &Caller) -> Result<Value, AppError> {
    let mut map = to_object(payload)?;
    map.insert(
        "userId".to_string(),
        Value::String(caller.subject_id().to_string()),
    );
    Ok(Value::Object(map))
}

/// Accept `YYYY-MM-DD` or a full RFC 3339 timestamp.
pub(crate) fn check_date(field: &str, value: &str) -> Result<(), AppError> {
    let plain = format_description!("[year]-[month]-[day]");
    if Date::parse(value, plain).is_ok() || OffsetDateTime::parse(value, &Rfc3339).is_ok() {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "{field} must be a valid ISO 8601 date string"
        )))
    }
}

pub(crate) fn check_not_blank(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        Err(AppError::validation(format!("{field} should not be empty")))
    } else {
        Ok(())
    }
}

pub(crate) fn check_min_len(field: &str, value: &str, min: usize) -> Result<(), AppError> {
    if value.chars().count() < min {
        Err(AppError::validation(format!(
            "{field} must be longer than or equal to {min} characters"
        )))
    } else {
        Ok(())
    }
}

/// Loose email shape check; the auth service stays the authority.
pub(crate) fn check_email(field: &str, value: &str) -> Result<(), AppError> {
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AppError::validation(format!("{field} must be an email")))
    }
}

/// Reporting window shared by the user and revenue statistics routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl StatsPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatsPeriod::Daily => "daily",
            StatsPeriod::Weekly => "weekly",
            StatsPeriod::Monthly => "monthly",
        }
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct StatsQuery {
    #[serde(default)]
    pub period: StatsPeriod,
    pub days: Option<u32>,
}

impl StatsQuery {
    /// `(period, days)` with defaults applied; `days` must be at least 1.
    pub fn resolved(&self) -> Result<(StatsPeriod, u32), AppError> {
        let days = self.days.unwrap_or(30);
        if days < 1 {
            return Err(AppError::validation("days must not be less than 1"));
        }
        Ok((self.period, days))
    }
}
