use std::collections::BTreeMap;

use actix_web::http::Method;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::{json, Number};

use super::{check_not_blank, forward, require, StatsQuery};
use crate::authz::ADMIN_ONLY;
use crate::dispatch::{path_segment, BackendCall, BackendDomain};
use crate::error::AppError;
use crate::extractors::{Caller, ValidatedJson, ValidatedQuery};
use crate::state::app_state::AppState;

const DOMAIN: BackendDomain = BackendDomain::Subscription;

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SubscribeRequest {
    pub plan_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanInterval {
    Monthly,
    Yearly,
    Lifetime,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePlan {
    pub name: String,
    pub price: Number,
    pub interval: PlanInterval,
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_free: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdatePlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<PlanInterval>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<BTreeMap<String, bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_free: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

fn json_body(body: &impl Serialize) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(body)
        .map_err(|e| AppError::internal(format!("payload serialization failed: {e}")))
}

async fn list_plans(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let call = BackendCall::new("subscription.plans", Method::GET)
        .path("plans")
        .failure_message("Failed to fetch plans");
    forward(&app_state, DOMAIN, call).await
}

async fn plan_detail(
    app_state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let call = BackendCall::new("subscription.plan_detail", Method::GET)
        .path(format!("plans/{}", path_segment(&id)?))
        .failure_message("Failed to fetch plan detail");
    forward(&app_state, DOMAIN, call).await
}

async fn current(caller: Caller, app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let call = BackendCall::new("subscription.current", Method::GET)
        .path("current")
        .identity((&caller).into())
        .failure_message("Failed to fetch current subscription");
    forward(&app_state, DOMAIN, call).await
}

async fn subscribe(
    caller: Caller,
    app_state: web::Data<AppState>,
    body: ValidatedJson<SubscribeRequest>,
) -> Result<HttpResponse, AppError> {
    check_not_blank("planId", &body.plan_id)?;
    let call = BackendCall::new("subscription.subscribe", Method::POST)
        .json(json_body(&*body)?)
        .identity((&caller).into())
        .failure_message("Failed to subscribe");
    forward(&app_state, DOMAIN, call).await
}

async fn cancel(caller: Caller, app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let call = BackendCall::new("subscription.cancel", Method::POST)
        .path("cancel")
        .json(json!({}))
        .identity((&caller).into())
        .failure_message("Failed to cancel subscription");
    forward(&app_state, DOMAIN, call).await
}

async fn history(caller: Caller, app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let call = BackendCall::new("subscription.history", Method::GET)
        .path("history")
        .identity((&caller).into())
        .failure_message("Failed to fetch subscription history");
    forward(&app_state, DOMAIN, call).await
}

/// Live entitlements for the caller; the cache is refreshed with them.
async fn features(caller: Caller, app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let set = app_state.entitlements.reload(caller.subject_id()).await?;
    Ok(HttpResponse::Ok().json(set))
}

async fn create_plan(
    caller: Caller,
    app_state: web::Data<AppState>,
    body: ValidatedJson<CreatePlan>,
) -> Result<HttpResponse, AppError> {
    require(&caller, ADMIN_ONLY, &app_state).await?;
    check_not_blank("name", &body.name)?;
    let call = BackendCall::new("subscription.create_plan", Method::POST)
        .path("plans")
        .json(json_body(&*body)?)
        .identity((&caller).into())
        .failure_message("Failed to create plan");
    forward(&app_state, DOMAIN, call).await
}

async fn update_plan(
    caller: Caller,
    app_state: web::Data<AppState>,
    id: web::Path<String>,
    body: ValidatedJson<UpdatePlan>,
) -> Result<HttpResponse, AppError> {
    require(&caller, ADMIN_ONLY, &app_state).await?;
    let call = BackendCall::new("subscription.update_plan", Method::PATCH)
        .path(format!("plans/{}", path_segment(&id)?))
        .json(json_body(&*body)?)
        .identity((&caller).into())
        .failure_message("Failed to update plan");
    forward(&app_state, DOMAIN, call).await
}

async fn disable_plan(
    caller: Caller,
    app_state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    require(&caller, ADMIN_ONLY, &app_state).await?;
    let call = BackendCall::new("subscription.disable_plan", Method::DELETE)
        .path(format!("plans/{}", path_segment(&id)?))
        .identity((&caller).into())
        .failure_message("Failed to disable plan");
    forward(&app_state, DOMAIN, call).await
}

/// Admin-only GET with no parameters.
async fn admin_get(
    caller: &Caller,
    app_state: &AppState,
    operation: &str,
    path: &str,
    failure: &str,
) -> Result<HttpResponse, AppError> {
    require(caller, ADMIN_ONLY, app_state).await?;
    let call = BackendCall::new(operation, Method::GET)
        .path(path)
        .identity(caller.into())
        .failure_message(failure);
    forward(app_state, DOMAIN, call).await
}

async fn admin_stats(caller: Caller, app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    admin_get(
        &caller,
        &app_state,
        "subscription.admin_stats",
        "admin/stats",
        "Failed to fetch stats",
    )
    .await
}

async fn revenue_over_time(
    caller: Caller,
    app_state: web::Data<AppState>,
    query: ValidatedQuery<StatsQuery>,
) -> Result<HttpResponse, AppError> {
    require(&caller, ADMIN_ONLY, &app_state).await?;
    let (period, days) = query.resolved()?;
    let call = BackendCall::new("subscription.revenue_over_time", Method::GET)
        .path("stats/revenue-over-time")
        .query_pair("period", period.as_str())
        .query_pair("days", days)
        .identity((&caller).into())
        .failure_message("Failed to fetch revenue over time");
    forward(&app_state, DOMAIN, call).await
}

async fn total_revenue(caller: Caller, app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    admin_get(
        &caller,
        &app_state,
        "subscription.total_revenue",
        "stats/total-revenue",
        "Failed to fetch total revenue stats",
    )
    .await
}

async fn revenue_by_plan(caller: Caller, app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    admin_get(
        &caller,
        &app_state,
        "subscription.revenue_by_plan",
        "stats/revenue-by-plan",
        "Failed to fetch revenue by plan",
    )
    .await
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::post().to(subscribe))
        .route("/plans", web::get().to(list_plans))
        .route("/plans", web::post().to(create_plan))
        .route("/plans/{id}", web::get().to(plan_detail))
        .route("/plans/{id}", web::patch().to(update_plan))
        .route("/plans/{id}", web::delete().to(disable_plan))
        .route("/current", web::get().to(current))
        .route("/cancel", web::post().to(cancel))
        .route("/history", web::get().to(history))
        .route("/features", web::get().to(features))
        .route("/admin/stats", web::get().to(admin_stats))
        .route("/stats/revenue-over-time", web::get().to(revenue_over_time))
        .route("/stats/total-revenue", web::get().to(total_revenue))
        .route("/stats/revenue-by-plan", web::get().to(revenue_by_plan));
}
