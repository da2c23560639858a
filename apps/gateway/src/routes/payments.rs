use actix_web::http::Method;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use super::{check_not_blank, forward};
use crate::dispatch::{path_segment, BackendCall, BackendDomain};
use crate::error::AppError;
use crate::extractors::{Caller, ValidatedJson};
use crate::state::app_state::AppState;

const DOMAIN: BackendDomain = BackendDomain::Payment;

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePayment {
    pub subscription_id: String,
    pub plan_id: String,
}

async fn create(
    caller: Caller,
    app_state: web::Data<AppState>,
    body: ValidatedJson<CreatePayment>,
) -> Result<HttpResponse, AppError> {
    check_not_blank("subscriptionId", &body.subscription_id)?;
    check_not_blank("planId", &body.plan_id)?;
    let payload = serde_json::to_value(&*body)
        .map_err(|e| AppError::internal(format!("payload serialization failed: {e}")))?;
    let call = BackendCall::new("payment.create", Method::POST)
        .json(payload)
        .identity((&caller).into())
        .failure_message("Failed to create payment");
    forward(&app_state, DOMAIN, call).await
}

/// Payment provider callback. The signed query string is relayed untouched,
/// without a decode/encode pass that could alter the signed bytes.
async fn vnpay_ipn(app_state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, AppError> {
    let call = BackendCall::new("payment.vnpay_ipn", Method::GET)
        .path(ipn_path(req.query_string()))
        .failure_message("Failed to handle VNPay IPN");
    forward(&app_state, DOMAIN, call).await
}

async fn status(
    caller: Caller,
    app_state: web::Data<AppState>,
    reference: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let call = BackendCall::new("payment.status", Method::GET)
        .path(path_segment(&reference)?)
        .identity((&caller).into())
        .failure_message("Failed to get payment status");
    forward(&app_state, DOMAIN, call).await
}

fn ipn_path(raw_query: &str) -> String {
    if raw_query.is_empty() {
        "vnpay/ipn".to_string()
    } else {
        format!("vnpay/ipn?{raw_query}")
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::post().to(create))
        .route("/vnpay/ipn", web::get().to(vnpay_ipn))
        .route("/{reference}", web::get().to(status));
}
