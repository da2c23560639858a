use std::collections::BTreeMap;

use actix_web::http::Method;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::{json, Number};

use super::{check_not_blank, forward, with_user_id};
use crate::dispatch::{BackendCall, BackendDomain};
use crate::error::AppError;
use crate::extractors::{Caller, ValidatedJson, ValidatedQuery};
use crate::state::app_state::AppState;

const DOMAIN: BackendDomain = BackendDomain::Ai;

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CategorizeExpense {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Number>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssistantChat {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct InsightsQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
}

/// Analysis options are owned by the AI service; forwarded as given.
type AnalysisQuery = BTreeMap<String, String>;

async fn categorize(
    caller: Caller,
    app_state: web::Data<AppState>,
    body: ValidatedJson<CategorizeExpense>,
) -> Result<HttpResponse, AppError> {
    check_not_blank("description", &body.description)?;
    let call =
        BackendCall::new("ai.categorize_expense", Method::POST).json(with_user_id(&*body, &caller)?);
    forward(&app_state, DOMAIN, call).await
}

async fn predict_spending(
    caller: Caller,
    app_state: web::Data<AppState>,
    query: ValidatedQuery<AnalysisQuery>,
) -> Result<HttpResponse, AppError> {
    let call =
        BackendCall::new("ai.predict_spending", Method::GET).json(with_user_id(&*query, &caller)?);
    forward(&app_state, DOMAIN, call).await
}

async fn anomalies(
    caller: Caller,
    app_state: web::Data<AppState>,
    query: ValidatedQuery<AnalysisQuery>,
) -> Result<HttpResponse, AppError> {
    let call =
        BackendCall::new("ai.detect_anomalies", Method::GET).json(with_user_id(&*query, &caller)?);
    forward(&app_state, DOMAIN, call).await
}

async fn budget_alerts(caller: Caller, app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let call =
        BackendCall::new("ai.budget_alerts", Method::GET).json(with_user_id(&json!({}), &caller)?);
    forward(&app_state, DOMAIN, call).await
}

async fn assistant_chat(
    caller: Caller,
    app_state: web::Data<AppState>,
    body: ValidatedJson<AssistantChat>,
) -> Result<HttpResponse, AppError> {
    check_not_blank("message", &body.message)?;
    let call =
        BackendCall::new("ai.assistant_chat", Method::POST).json(with_user_id(&*body, &caller)?);
    forward(&app_state, DOMAIN, call).await
}

async fn insights(
    caller: Caller,
    app_state: web::Data<AppState>,
    query: ValidatedQuery<InsightsQuery>,
) -> Result<HttpResponse, AppError> {
    let call = BackendCall::new("ai.get_insights", Method::GET).json(with_user_id(&*query, &caller)?);
    forward(&app_state, DOMAIN, call).await
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/categorize", web::post().to(categorize))
        .route("/predict-spending", web::get().to(predict_spending))
        .route("/anomalies", web::get().to(anomalies))
        .route("/budget-alerts", web::get().to(budget_alerts))
        .route("/assistant/chat", web::post().to(assistant_chat))
        .route("/insights", web::get().to(insights));
}
