use actix_multipart::Multipart;
use actix_web::http::Method;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use super::{forward, require, with_user_id};
use crate::authz::{RouteRequirement, ADMIN_ONLY};
use crate::dispatch::{BackendCall, BackendDomain};
use crate::error::AppError;
use crate::extractors::{Caller, ValidatedQuery};
use crate::state::app_state::AppState;
use crate::upload::{read_form, FileFields, UploadPolicy};

const DOMAIN: BackendDomain = BackendDomain::Ocr;

/// Entitlement flag gating receipt scanning.
pub const OCR_FEATURE: &str = "OCR";

const SCAN: RouteRequirement = RouteRequirement::feature(OCR_FEATURE);

#[derive(Debug, Deserialize, Serialize)]
pub struct HistoryQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Store the image, then hand its absolute URL to the OCR service. A failed
/// dispatch removes the stored image again.
async fn scan(
    caller: Caller,
    app_state: web::Data<AppState>,
    multipart: Multipart,
) -> Result<HttpResponse, AppError> {
    require(&caller, SCAN, &app_state).await?;

    let mut form = read_form(
        multipart,
        FileFields {
            names: &["file"],
            max_files: 1,
            policy: UploadPolicy::OCR,
        },
    )
    .await?;

    let relay = &app_state.uploads;
    let stored = relay
        .store(&UploadPolicy::OCR, form.take_file("file").as_ref())
        .await?;

    let payload = with_user_id(&json!({ "fileUrl": relay.absolute_url(&stored) }), &caller)?;
    let call = BackendCall::new("ocr.scan", Method::POST).json(payload);

    match forward(&app_state, DOMAIN, call).await {
        Ok(response) => Ok(response),
        Err(err) => {
            warn!(url = %stored, code = %err.code(), "ocr dispatch failed, removing stored image");
            relay.delete(&UploadPolicy::OCR, &stored).await;
            Err(err)
        }
    }
}

async fn history(
    caller: Caller,
    app_state: web::Data<AppState>,
    query: ValidatedQuery<HistoryQuery>,
) -> Result<HttpResponse, AppError> {
    let call = BackendCall::new("ocr.history", Method::GET).json(with_user_id(&*query, &caller)?);
    forward(&app_state, DOMAIN, call).await
}

async fn find_one(
    caller: Caller,
    app_state: web::Data<AppState>,
    job_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let payload = with_user_id(&json!({ "jobId": job_id.into_inner() }), &caller)?;
    let call = BackendCall::new("ocr.find_one", Method::GET).json(payload);
    forward(&app_state, DOMAIN, call).await
}

async fn admin_stats(caller: Caller, app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    require(&caller, ADMIN_ONLY, &app_state).await?;
    let call = BackendCall::new("ocr.admin_stats", Method::GET).json(json!({}));
    forward(&app_state, DOMAIN, call).await
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/scan", web::post().to(scan))
        .route("/jobs", web::get().to(history))
        .route("/jobs/{job_id}", web::get().to(find_one))
        .route("/admin/stats", web::get().to(admin_stats));
}
