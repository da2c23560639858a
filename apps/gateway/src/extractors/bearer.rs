use actix_web::{dev::Payload, http::header, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};

use crate::AppError;

/// Raw bearer credential from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl BearerToken {
    pub fn from_request_headers(req: &HttpRequest) -> Result<Self, AppError> {
        let auth_header = req
            .headers()
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::unauthenticated("Missing bearer token"))?;

        let auth_value = auth_header
            .to_str()
            .map_err(|_| AppError::unauthenticated("Malformed authorization header"))?;

        // Auth schemes are case-insensitive.
        let parts: Vec<&str> = auth_value.split_whitespace().collect();
        if parts.len() != 2 || !parts[0].eq_ignore_ascii_case("Bearer") {
            return Err(AppError::unauthenticated("Malformed authorization header"));
        }

        Ok(BearerToken(parts[1].to_string()))
    }
}

impl FromRequest for BearerToken {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Self::from_request_headers(req))
    }
}
