use actix_web::http::Method;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::{json, Number};

use super::{check_date, check_not_blank, forward, require, with_user_id};
use crate::authz::{ADMIN_ONLY, USER_ONLY};
use crate::dispatch::{BackendCall, BackendDomain};
use crate::error::AppError;
use crate::extractors::{Caller, ValidatedJson};
use crate::state::app_state::AppState;

const DOMAIN: BackendDomain = BackendDomain::Budget;

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateBudget {
    pub name: String,
    pub category: String,
    pub limit: Number,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateBudget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

fn check_window(start: Option<&String>, end: Option<&String>) -> Result<(), AppError> {
    if let Some(start) = start {
        check_date("startDate", start)?;
    }
    if let Some(end) = end {
        check_date("endDate", end)?;
    }
    Ok(())
}

async fn create(
    caller: Caller,
    app_state: web::Data<AppState>,
    body: ValidatedJson<CreateBudget>,
) -> Result<HttpResponse, AppError> {
    require(&caller, USER_ONLY, &app_state).await?;
    check_not_blank("name", &body.name)?;
    check_not_blank("category", &body.category)?;
    check_window(body.start_date.as_ref(), body.end_date.as_ref())?;

    let call = BackendCall::new("budget.create", Method::POST).json(with_user_id(&*body, &caller)?);
    forward(&app_state, DOMAIN, call).await
}

async fn find_all(caller: Caller, app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    require(&caller, USER_ONLY, &app_state).await?;
    let call = BackendCall::new("budget.find_all", Method::GET).json(with_user_id(&json!({}), &caller)?);
    forward(&app_state, DOMAIN, call).await
}

/// Shared shape of the `{id, userId}` lookups.
async fn by_id(
    caller: Caller,
    app_state: &AppState,
    operation: &str,
    method: Method,
    id: String,
) -> Result<HttpResponse, AppError> {
    require(&caller, USER_ONLY, app_state).await?;
    let call = BackendCall::new(operation, method).json(with_user_id(&json!({ "id": id }), &caller)?);
    forward(app_state, DOMAIN, call).await
}

async fn find_one(
    caller: Caller,
    app_state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    by_id(caller, &app_state, "budget.find_one", Method::GET, id.into_inner()).await
}

async fn update(
    caller: Caller,
    app_state: web::Data<AppState>,
    id: web::Path<String>,
    body: ValidatedJson<UpdateBudget>,
) -> Result<HttpResponse, AppError> {
    require(&caller, USER_ONLY, &app_state).await?;
    check_window(body.start_date.as_ref(), body.end_date.as_ref())?;

    let mut payload = with_user_id(&*body, &caller)?;
    payload["id"] = json!(id.into_inner());
    let call = BackendCall::new("budget.update", Method::PUT).json(payload);
    forward(&app_state, DOMAIN, call).await
}

async fn remove(
    caller: Caller,
    app_state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    by_id(caller, &app_state, "budget.delete", Method::DELETE, id.into_inner()).await
}

async fn progress(
    caller: Caller,
    app_state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    by_id(caller, &app_state, "budget.progress", Method::GET, id.into_inner()).await
}

async fn admin_stats(caller: Caller, app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    require(&caller, ADMIN_ONLY, &app_state).await?;
    let call = BackendCall::new("budget.admin_stats", Method::GET).json(json!({}));
    forward(&app_state, DOMAIN, call).await
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::post().to(create))
        .route("", web::get().to(find_all))
        .route("/admin/stats", web::get().to(admin_stats))
        .route("/{id}", web::get().to(find_one))
        .route("/{id}", web::put().to(update))
        .route("/{id}", web::delete().to(remove))
        .route("/{id}/progress", web::get().to(progress));
}
