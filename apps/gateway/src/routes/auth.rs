use actix_multipart::Multipart;
use actix_web::http::Method;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{check_email, check_min_len, check_not_blank, forward, require, StatsQuery};
use crate::auth::verify_access_token;
use crate::authz::{EntitlementSet, ADMIN_ONLY};
use crate::dispatch::{path_segment, BackendCall, BackendDomain, FilePart, MultipartBody};
use crate::error::AppError;
use crate::extractors::{Caller, ValidatedJson, ValidatedQuery};
use crate::state::app_state::AppState;
use crate::upload::{read_form, FileFields, UploadPolicy};

const DOMAIN: BackendDomain = BackendDomain::Auth;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

impl RegisterRequest {
    fn validate(&self) -> Result<(), AppError> {
        check_email("email", &self.email)?;
        check_min_len("password", &self.password, MIN_PASSWORD_LEN)?;
        check_not_blank("fullName", &self.full_name)
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FcmTokenRequest {
    pub fcm_token: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub role: Option<String>,
    pub is_verified: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: Value,
    pub refresh_token: Value,
    pub features: EntitlementSet,
}

fn json_call(operation: &str, method: Method, path: &str, body: &impl Serialize) -> Result<BackendCall, AppError> {
    let body = serde_json::to_value(body)
        .map_err(|e| AppError::internal(format!("payload serialization failed: {e}")))?;
    Ok(BackendCall::new(operation, method).path(path).json(body))
}

async fn register(
    app_state: web::Data<AppState>,
    body: ValidatedJson<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let call = json_call("auth.register", Method::POST, "register", &*body)?
        .failure_message("Registration failed");
    forward(&app_state, DOMAIN, call).await
}

async fn register_admin(
    caller: Caller,
    app_state: web::Data<AppState>,
    body: ValidatedJson<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    require(&caller, ADMIN_ONLY, &app_state).await?;
    body.validate()?;
    let call = json_call("auth.register_admin", Method::POST, "register-admin", &*body)?
        .identity((&caller).into())
        .failure_message("Admin registration failed");
    forward(&app_state, DOMAIN, call).await
}

async fn all_admin(caller: Caller, app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    require(&caller, ADMIN_ONLY, &app_state).await?;
    let call = BackendCall::new("auth.all_admin", Method::GET)
        .path("all-admin")
        .identity((&caller).into())
        .failure_message("Failed to fetch admin list");
    forward(&app_state, DOMAIN, call).await
}

async fn verify_otp(
    app_state: web::Data<AppState>,
    body: ValidatedJson<VerifyOtpRequest>,
) -> Result<HttpResponse, AppError> {
    check_email("email", &body.email)?;
    check_not_blank("otp", &body.otp)?;
    let call = json_call("auth.verify_otp", Method::POST, "verify-otp", &*body)?
        .failure_message("OTP verification failed");
    forward(&app_state, DOMAIN, call).await
}

async fn resend_otp(
    app_state: web::Data<AppState>,
    body: ValidatedJson<EmailRequest>,
) -> Result<HttpResponse, AppError> {
    check_email("email", &body.email)?;
    let call = json_call("auth.resend_otp", Method::POST, "resend-otp", &*body)?
        .failure_message("Failed to resend OTP");
    forward(&app_state, DOMAIN, call).await
}

/// Log in through the auth service, then warm the entitlement cache for the
/// subject named by the returned access token.
async fn login(
    app_state: web::Data<AppState>,
    body: ValidatedJson<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    check_not_blank("email", &body.email)?;
    check_not_blank("password", &body.password)?;

    let call = json_call("auth.login", Method::POST, "login", &*body)?.failure_message("Login failed");
    let reply = app_state.dispatchers.dispatch(DOMAIN, call).await?;

    let access_token = reply
        .body
        .get("accessToken")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::backend(502, "Auth service returned no access token"))?;
    let claims = verify_access_token(access_token, &app_state.security).map_err(|err| {
        warn!(error = %err, "auth service issued a token the gateway cannot verify");
        AppError::backend(502, "Auth service returned an invalid access token")
    })?;

    let features = match app_state.entitlements.reload(&claims.subject_id).await {
        Ok(set) => set,
        Err(err) => {
            warn!(subject_id = %claims.subject_id, code = %err.code(), "entitlement fetch after login failed");
            EntitlementSet::new()
        }
    };
    info!(subject_id = %claims.subject_id, features = features.len(), "login succeeded");

    Ok(HttpResponse::build(reply.status).json(LoginResponse {
        access_token: Value::String(access_token.to_string()),
        refresh_token: reply.body.get("refreshToken").cloned().unwrap_or(Value::Null),
        features,
    }))
}

async fn refresh(
    app_state: web::Data<AppState>,
    body: ValidatedJson<RefreshRequest>,
) -> Result<HttpResponse, AppError> {
    check_not_blank("refreshToken", &body.refresh_token)?;
    let call = json_call("auth.refresh", Method::POST, "refresh", &*body)?
        .failure_message("Token refresh failed");
    forward(&app_state, DOMAIN, call).await
}

async fn me(caller: Caller, app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let call = BackendCall::new("auth.me", Method::GET)
        .path("me")
        .identity((&caller).into())
        .failure_message("Failed to fetch profile");
    forward(&app_state, DOMAIN, call).await
}

async fn forgot_password(
    app_state: web::Data<AppState>,
    body: ValidatedJson<EmailRequest>,
) -> Result<HttpResponse, AppError> {
    check_email("email", &body.email)?;
    let call = json_call("auth.forgot_password", Method::POST, "forgot-password", &*body)?
        .failure_message("Failed to send reset OTP");
    forward(&app_state, DOMAIN, call).await
}

async fn reset_password(
    app_state: web::Data<AppState>,
    body: ValidatedJson<ResetPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    check_email("email", &body.email)?;
    check_not_blank("otp", &body.otp)?;
    check_min_len("newPassword", &body.new_password, MIN_PASSWORD_LEN)?;
    let call = json_call("auth.reset_password", Method::POST, "reset-password", &*body)?
        .failure_message("Failed to reset password");
    forward(&app_state, DOMAIN, call).await
}

async fn verify(caller: Caller, app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let call = BackendCall::new("auth.verify", Method::POST)
        .path("verify")
        .json(json!({}))
        .identity((&caller).into())
        .failure_message("Token verification failed");
    forward(&app_state, DOMAIN, call).await
}

async fn fcm_token(
    caller: Caller,
    app_state: web::Data<AppState>,
    body: ValidatedJson<FcmTokenRequest>,
) -> Result<HttpResponse, AppError> {
    check_not_blank("fcmToken", &body.fcm_token)?;
    let call = json_call("auth.fcm_token", Method::POST, "fcm-token", &*body)?
        .identity((&caller).into())
        .failure_message("Failed to update FCM token");
    forward(&app_state, DOMAIN, call).await
}

async fn change_password(
    caller: Caller,
    app_state: web::Data<AppState>,
    body: ValidatedJson<ChangePasswordRequest>,
) -> Result<HttpResponse, AppError> {
    check_not_blank("oldPassword", &body.old_password)?;
    check_min_len("newPassword", &body.new_password, MIN_PASSWORD_LEN)?;
    let call = json_call("auth.change_password", Method::POST, "change-password", &*body)?
        .identity((&caller).into())
        .failure_message("Failed to change password");
    forward(&app_state, DOMAIN, call).await
}

/// Profile update: optional `email` and `fullName` text fields plus an
/// optional `avatar` image, re-sent to the auth service as multipart.
async fn update_profile(
    caller: Caller,
    app_state: web::Data<AppState>,
    multipart: Multipart,
) -> Result<HttpResponse, AppError> {
    let mut form = read_form(
        multipart,
        FileFields {
            names: &["avatar"],
            max_files: 1,
            policy: UploadPolicy::AVATAR,
        },
    )
    .await?;

    let mut body = MultipartBody::default();
    for (name, value) in std::mem::take(&mut form.text) {
        match name.as_str() {
            "email" => check_email("email", &value)?,
            "fullName" => check_not_blank("fullName", &value)?,
            other => {
                return Err(AppError::validation(format!(
                    "property {other} should not exist"
                )))
            }
        }
        body.fields.push((name, value));
    }
    if let Some(avatar) = form.take_file("avatar") {
        body.files.push(FilePart {
            field: "avatar".to_string(),
            filename: avatar.original_filename,
            content_type: avatar.mime_type,
            bytes: avatar.bytes,
        });
    }

    let call = BackendCall::new("auth.update_profile", Method::POST)
        .path("update-profile")
        .multipart(body)
        .identity((&caller).into())
        .failure_message("Failed to update profile");
    forward(&app_state, DOMAIN, call).await
}

async fn list_users(
    caller: Caller,
    app_state: web::Data<AppState>,
    query: ValidatedQuery<UsersQuery>,
) -> Result<HttpResponse, AppError> {
    require(&caller, ADMIN_ONLY, &app_state).await?;
    let call = BackendCall::new("auth.users", Method::GET)
        .path("users")
        .query_pair("page", query.page.unwrap_or(1))
        .query_pair("limit", query.limit.unwrap_or(10))
        .query_opt("role", query.role.as_deref())
        .query_opt("isVerified", query.is_verified)
        .query_opt("search", query.search.as_deref())
        .identity((&caller).into())
        .failure_message("Failed to fetch users");
    forward(&app_state, DOMAIN, call).await
}

async fn delete_user(
    caller: Caller,
    app_state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    require(&caller, ADMIN_ONLY, &app_state).await?;
    let call = BackendCall::new("auth.delete_user", Method::DELETE)
        .path(format!("users/{}", path_segment(&id)?))
        .identity((&caller).into())
        .failure_message("Failed to delete user");
    forward(&app_state, DOMAIN, call).await
}

async fn deactivate_user(
    caller: Caller,
    app_state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    require(&caller, ADMIN_ONLY, &app_state).await?;
    let call = BackendCall::new("auth.deactivate_user", Method::PATCH)
        .path(format!("users/{}/deactivate", path_segment(&id)?))
        .json(json!({}))
        .identity((&caller).into())
        .failure_message("Failed to deactivate user");
    forward(&app_state, DOMAIN, call).await
}

async fn reactivate_user(
    caller: Caller,
    app_state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    require(&caller, ADMIN_ONLY, &app_state).await?;
    let call = BackendCall::new("auth.reactivate_user", Method::PATCH)
        .path(format!("users/{}/reactivate", path_segment(&id)?))
        .json(json!({}))
        .identity((&caller).into())
        .failure_message("Failed to reactivate user");
    forward(&app_state, DOMAIN, call).await
}

async fn users_over_time(
    caller: Caller,
    app_state: web::Data<AppState>,
    query: ValidatedQuery<StatsQuery>,
) -> Result<HttpResponse, AppError> {
    require(&caller, ADMIN_ONLY, &app_state).await?;
    let (period, days) = query.resolved()?;
    let call = BackendCall::new("auth.users_over_time", Method::GET)
        .path("stats/users-over-time")
        .query_pair("period", period.as_str())
        .query_pair("days", days)
        .identity((&caller).into())
        .failure_message("Failed to fetch users over time statistics");
    forward(&app_state, DOMAIN, call).await
}

async fn total_users(caller: Caller, app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    require(&caller, ADMIN_ONLY, &app_state).await?;
    let call = BackendCall::new("auth.total_users", Method::GET)
        .path("stats/total")
        .identity((&caller).into())
        .failure_message("Failed to fetch total users statistics");
    forward(&app_state, DOMAIN, call).await
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/register", web::post().to(register))
        .route("/register-admin", web::post().to(register_admin))
        .route("/all-admin", web::get().to(all_admin))
        .route("/verify-otp", web::post().to(verify_otp))
        .route("/resend-otp", web::post().to(resend_otp))
        .route("/login", web::post().to(login))
        .route("/refresh", web::post().to(refresh))
        .route("/me", web::get().to(me))
        .route("/forgot-password", web::post().to(forgot_password))
        .route("/reset-password", web::post().to(reset_password))
        .route("/verify", web::post().to(verify))
        .route("/fcm-token", web::post().to(fcm_token))
        .route("/change-password", web::post().to(change_password))
        .route("/update-profile", web::post().to(update_profile))
        .route("/users", web::get().to(list_users))
        .route("/users/{id}", web::delete().to(delete_user))
        .route("/users/{id}/deactivate", web::patch().to(deactivate_user))
        .route("/users/{id}/reactivate", web::patch().to(reactivate_user))
        .route("/stats/users-over-time", web::get().to(users_over_time))
        .route("/stats/total", web::get().to(total_users));
}
