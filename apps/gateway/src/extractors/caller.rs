use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};

use super::bearer::BearerToken;
use crate::auth::{verify_access_token, IdentityClaims};
use crate::dispatch::ForwardedIdentity;
use crate::state::app_state::AppState;
use crate::AppError;

/// Verified caller: resolved identity plus the original bearer credential,
/// which HTTP backends receive verbatim.
#[derive(Debug, Clone)]
pub struct Caller {
    pub claims: IdentityClaims,
    pub token: String,
}

impl Caller {
    pub fn subject_id(&self) -> &str {
        &self.claims.subject_id
    }

    pub fn extract(req: &HttpRequest) -> Result<Self, AppError> {
        let BearerToken(token) = BearerToken::from_request_headers(req)?;

        let state = req
            .app_data::<web::Data<AppState>>()
            .ok_or_else(|| AppError::internal("AppState not available"))?;

        let claims = verify_access_token(&token, &state.security)?;
        Ok(Caller { claims, token })
    }
}

impl FromRequest for Caller {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Self::extract(req))
    }
}

impl From<&Caller> for ForwardedIdentity {
    fn from(caller: &Caller) -> Self {
        ForwardedIdentity {
            subject_id: caller.claims.subject_id.clone(),
            token: caller.token.clone(),
        }
    }
}
