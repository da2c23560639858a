use actix_web::http::Method;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::{json, Number};

use super::{check_date, check_not_blank, forward, with_user_id};
use crate::dispatch::{BackendCall, BackendDomain};
use crate::error::AppError;
use crate::extractors::{Caller, ValidatedJson, ValidatedQuery};
use crate::state::app_state::AppState;

const DOMAIN: BackendDomain = BackendDomain::Expense;

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateExpense {
    pub description: String,
    pub amount: Number,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub date: String,
}

impl CreateExpense {
    fn validate(&self) -> Result<(), AppError> {
        check_not_blank("description", &self.description)?;
        check_date("date", &self.date)
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateExpense {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ExpenseListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

async fn create(
    caller: Caller,
    app_state: web::Data<AppState>,
    body: ValidatedJson<CreateExpense>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let call = BackendCall::new("expense.create", Method::POST).json(with_user_id(&*body, &caller)?);
    forward(&app_state, DOMAIN, call).await
}

async fn find_all(
    caller: Caller,
    app_state: web::Data<AppState>,
    query: ValidatedQuery<ExpenseListQuery>,
) -> Result<HttpResponse, AppError> {
    let call = BackendCall::new("expense.findAll", Method::GET).json(with_user_id(&*query, &caller)?);
    forward(&app_state, DOMAIN, call).await
}

async fn summary(
    caller: Caller,
    app_state: web::Data<AppState>,
    query: ValidatedQuery<SummaryQuery>,
) -> Result<HttpResponse, AppError> {
    if let Some(start) = &query.start_date {
        check_date("startDate", start)?;
    }
    if let Some(end) = &query.end_date {
        check_date("endDate", end)?;
    }
    let call = BackendCall::new("expense.summary", Method::GET).json(with_user_id(&*query, &caller)?);
    forward(&app_state, DOMAIN, call).await
}

/// Category catalogue; public.
async fn categories(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let call = BackendCall::new("categories.findAll", Method::GET).json(json!({}));
    forward(&app_state, DOMAIN, call).await
}

async fn find_one(
    caller: Caller,
    app_state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let payload = with_user_id(&json!({ "id": id.into_inner() }), &caller)?;
    let call = BackendCall::new("expense.findOne", Method::GET).json(payload);
    forward(&app_state, DOMAIN, call).await
}

async fn update(
    caller: Caller,
    app_state: web::Data<AppState>,
    id: web::Path<String>,
    body: ValidatedJson<UpdateExpense>,
) -> Result<HttpResponse, AppError> {
    if let Some(date) = &body.date {
        check_date("date", date)?;
    }
    let mut payload = with_user_id(&*body, &caller)?;
    payload["id"] = json!(id.into_inner());
    let call = BackendCall::new("expense.update", Method::PATCH).json(payload);
    forward(&app_state, DOMAIN, call).await
}

async fn remove(
    caller: Caller,
    app_state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let payload = with_user_id(&json!({ "id": id.into_inner() }), &caller)?;
    let call = BackendCall::new("expense.remove", Method::DELETE).json(payload);
    forward(&app_state, DOMAIN, call).await
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::post().to(create))
        .route("", web::get().to(find_all))
        .route("/summary", web::get().to(summary))
        .route("/categories", web::get().to(categories))
        .route("/{id}", web::get().to(find_one))
        .route("/{id}", web::patch().to(update))
        .route("/{id}", web::delete().to(remove));
}
