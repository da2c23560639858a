use actix_web::http::Method;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{check_not_blank, forward, require};
use crate::authz::ADMIN_ONLY;
use crate::dispatch::{path_segment, BackendCall, BackendDomain};
use crate::error::AppError;
use crate::extractors::{Caller, ValidatedJson, ValidatedQuery};
use crate::state::app_state::AppState;

const DOMAIN: BackendDomain = BackendDomain::Notification;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationTarget {
    Admins,
    All,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateNotification {
    pub title: String,
    pub message: String,
    pub target: NotificationTarget,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

async fn create(
    caller: Caller,
    app_state: web::Data<AppState>,
    body: ValidatedJson<CreateNotification>,
) -> Result<HttpResponse, AppError> {
    require(&caller, ADMIN_ONLY, &app_state).await?;
    check_not_blank("title", &body.title)?;
    check_not_blank("message", &body.message)?;
    let payload = serde_json::to_value(&*body)
        .map_err(|e| AppError::internal(format!("payload serialization failed: {e}")))?;
    let call = BackendCall::new("notification.create", Method::POST)
        .json(payload)
        .identity((&caller).into())
        .failure_message("Failed to create notification");
    forward(&app_state, DOMAIN, call).await
}

async fn list(
    caller: Caller,
    app_state: web::Data<AppState>,
    query: ValidatedQuery<Vec<(String, String)>>,
) -> Result<HttpResponse, AppError> {
    let call = BackendCall::new("notification.list", Method::GET)
        .query_pairs(query.into_inner())
        .identity((&caller).into())
        .failure_message("Failed to get notifications");
    forward(&app_state, DOMAIN, call).await
}

async fn unread_count(caller: Caller, app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let call = BackendCall::new("notification.unread_count", Method::GET)
        .path("unread-count")
        .identity((&caller).into())
        .failure_message("Failed to get unread count");
    forward(&app_state, DOMAIN, call).await
}

async fn mark_read(
    caller: Caller,
    app_state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let call = BackendCall::new("notification.mark_read", Method::POST)
        .path(format!("{}/read", path_segment(&id)?))
        .json(json!({}))
        .identity((&caller).into())
        .failure_message("Failed to mark notification as read");
    forward(&app_state, DOMAIN, call).await
}

async fn mark_all_read(caller: Caller, app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let call = BackendCall::new("notification.mark_all_read", Method::POST)
        .path("read-all")
        .json(json!({}))
        .identity((&caller).into())
        .failure_message("Failed to mark all notifications as read");
    forward(&app_state, DOMAIN, call).await
}

async fn delete_one(
    caller: Caller,
    app_state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let call = BackendCall::new("notification.delete", Method::DELETE)
        .path(path_segment(&id)?)
        .identity((&caller).into())
        .failure_message("Failed to delete notification");
    forward(&app_state, DOMAIN, call).await
}

async fn delete_all(caller: Caller, app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let call = BackendCall::new("notification.delete_all", Method::DELETE)
        .identity((&caller).into())
        .failure_message("Failed to delete all notifications");
    forward(&app_state, DOMAIN, call).await
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::post().to(create))
        .route("", web::get().to(list))
        .route("", web::delete().to(delete_all))
        .route("/unread-count", web::get().to(unread_count))
        .route("/read-all", web::post().to(mark_all_read))
        .route("/{id}/read", web::post().to(mark_read))
        .route("/{id}", web::delete().to(delete_one));
}
