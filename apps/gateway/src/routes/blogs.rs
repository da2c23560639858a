use std::collections::BTreeMap;

use actix_multipart::Multipart;
use actix_web::http::Method;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{check_not_blank, forward, require, to_object, with_user_id};
use crate::authz::ADMIN_ONLY;
use crate::dispatch::{BackendCall, BackendDomain};
use crate::error::AppError;
use crate::extractors::{Caller, ValidatedJson, ValidatedQuery};
use crate::state::app_state::AppState;
use crate::upload::{read_form, FileFields, UploadDescriptor, UploadPolicy};

const DOMAIN: BackendDomain = BackendDomain::Blog;

/// Files accepted by `upload/multiple`.
pub const MAX_BLOG_FILES: usize = 10;

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateBlog {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateBlog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RejectBlog {
    pub rejection_reason: String,
}

#[derive(Debug, Deserialize)]
pub struct MonthlyQuery {
    pub year: Option<i32>,
}

/// Listing filters are owned by the blog service; forwarded as given.
type ListQuery = BTreeMap<String, String>;

async fn create(
    caller: Caller,
    app_state: web::Data<AppState>,
    body: ValidatedJson<CreateBlog>,
) -> Result<HttpResponse, AppError> {
    check_not_blank("title", &body.title)?;
    check_not_blank("content", &body.content)?;
    let call = BackendCall::new("blog.create", Method::POST).json(with_user_id(&*body, &caller)?);
    forward(&app_state, DOMAIN, call).await
}

/// Public listing.
async fn find_all(
    app_state: web::Data<AppState>,
    query: ValidatedQuery<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let payload = Value::Object(to_object(&*query)?);
    let call = BackendCall::new("blog.find_all", Method::GET).json(payload);
    forward(&app_state, DOMAIN, call).await
}

async fn my_blogs(
    caller: Caller,
    app_state: web::Data<AppState>,
    query: ValidatedQuery<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let call = BackendCall::new("blog.find_all", Method::GET).json(with_user_id(&*query, &caller)?);
    forward(&app_state, DOMAIN, call).await
}

async fn status_statistics(
    caller: Caller,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    require(&caller, ADMIN_ONLY, &app_state).await?;
    let call = BackendCall::new("blog.statistics.status", Method::GET).json(json!({}));
    forward(&app_state, DOMAIN, call).await
}

async fn monthly_statistics(
    caller: Caller,
    app_state: web::Data<AppState>,
    query: ValidatedQuery<MonthlyQuery>,
) -> Result<HttpResponse, AppError> {
    require(&caller, ADMIN_ONLY, &app_state).await?;
    let payload = match query.year {
        Some(year) => json!({ "year": year }),
        None => json!({}),
    };
    let call = BackendCall::new("blog.statistics.monthly", Method::GET).json(payload);
    forward(&app_state, DOMAIN, call).await
}

async fn find_by_slug(
    app_state: web::Data<AppState>,
    slug: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let call = BackendCall::new("blog.find_by_slug", Method::GET).json(json!(slug.into_inner()));
    forward(&app_state, DOMAIN, call).await
}

async fn find_one(
    app_state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let call = BackendCall::new("blog.find_one", Method::GET).json(json!(id.into_inner()));
    forward(&app_state, DOMAIN, call).await
}

async fn update(
    caller: Caller,
    app_state: web::Data<AppState>,
    id: web::Path<String>,
    body: ValidatedJson<UpdateBlog>,
) -> Result<HttpResponse, AppError> {
    let payload = json!({
        "id": id.into_inner(),
        "userId": caller.subject_id(),
        "data": to_object(&*body)?,
    });
    let call = BackendCall::new("blog.update", Method::PATCH).json(payload);
    forward(&app_state, DOMAIN, call).await
}

async fn remove(
    caller: Caller,
    app_state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let payload = with_user_id(&json!({ "id": id.into_inner() }), &caller)?;
    let call = BackendCall::new("blog.delete", Method::DELETE).json(payload);
    forward(&app_state, DOMAIN, call).await
}

async fn submit(
    caller: Caller,
    app_state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let payload = with_user_id(&json!({ "id": id.into_inner() }), &caller)?;
    let call = BackendCall::new("blog.submit_for_review", Method::POST).json(payload);
    forward(&app_state, DOMAIN, call).await
}

async fn approve(
    caller: Caller,
    app_state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    require(&caller, ADMIN_ONLY, &app_state).await?;
    let payload = json!({
        "id": id.into_inner(),
        "approveDto": { "adminId": caller.subject_id() },
    });
    let call = BackendCall::new("blog.approve", Method::POST).json(payload);
    forward(&app_state, DOMAIN, call).await
}

async fn reject(
    caller: Caller,
    app_state: web::Data<AppState>,
    id: web::Path<String>,
    body: ValidatedJson<RejectBlog>,
) -> Result<HttpResponse, AppError> {
    require(&caller, ADMIN_ONLY, &app_state).await?;
    check_not_blank("rejectionReason", &body.rejection_reason)?;
    let payload = json!({
        "id": id.into_inner(),
        "rejectDto": {
            "adminId": caller.subject_id(),
            "rejectionReason": body.rejection_reason,
        },
    });
    let call = BackendCall::new("blog.reject", Method::POST).json(payload);
    forward(&app_state, DOMAIN, call).await
}

async fn upload_single(
    _caller: Caller,
    app_state: web::Data<AppState>,
    multipart: Multipart,
) -> Result<HttpResponse, AppError> {
    let mut form = read_form(
        multipart,
        FileFields {
            names: &["file"],
            max_files: 1,
            policy: UploadPolicy::BLOG,
        },
    )
    .await?;

    let url = app_state
        .uploads
        .store(&UploadPolicy::BLOG, form.take_file("file").as_ref())
        .await?;
    Ok(HttpResponse::Created().json(json!({ "url": url })))
}

async fn upload_multiple(
    _caller: Caller,
    app_state: web::Data<AppState>,
    multipart: Multipart,
) -> Result<HttpResponse, AppError> {
    let form = read_form(
        multipart,
        FileFields {
            names: &["files"],
            max_files: MAX_BLOG_FILES,
            policy: UploadPolicy::BLOG,
        },
    )
    .await?;

    let files: Vec<UploadDescriptor> = form.files.into_iter().map(|(_, file)| file).collect();
    let urls = app_state
        .uploads
        .store_all(&UploadPolicy::BLOG, &files)
        .await?;
    Ok(HttpResponse::Created().json(json!({ "urls": urls })))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::post().to(create))
        .route("", web::get().to(find_all))
        .route("/my-blogs", web::get().to(my_blogs))
        .route("/statistics/status", web::get().to(status_statistics))
        .route("/statistics/monthly", web::get().to(monthly_statistics))
        .route("/upload/single", web::post().to(upload_single))
        .route("/upload/multiple", web::post().to(upload_multiple))
        .route("/slug/{slug}", web::get().to(find_by_slug))
        .route("/{id}", web::get().to(find_one))
        .route("/{id}", web::patch().to(update))
        .route("/{id}", web::delete().to(remove))
        .route("/{id}/submit", web::post().to(submit))
        .route("/{id}/approve", web::post().to(approve))
        .route("/{id}/reject", web::post().to(reject));
}
