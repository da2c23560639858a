use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde_json::Value;

use super::claims::{IdentityClaims, Role, TokenPayload};
use crate::state::security_config::SecurityConfig;
use crate::AppError;

/// Mint an HS256 access token shaped like the ones the auth service issues.
///
/// The gateway never issues tokens in production; this exists for tests and
/// local tooling.
pub fn mint_access_token(
    subject_id: &str,
    email: Option<&str>,
    role: Option<Role>,
    now: SystemTime,
    ttl: Duration,
    security: &SecurityConfig,
) -> Result<String, AppError> {
    let iat = now
        .duration_since(UNIX_EPOCH)
        .map_err(|_| AppError::internal("Failed to get current time"))?
        .as_secs() as i64;

    let payload = TokenPayload {
        user_id: Some(Value::String(subject_id.to_string())),
        email: email.map(str::to_string),
        role: role.map(|r| Value::String(r.as_str().to_string())),
        iat: Some(iat),
        exp: iat + ttl.as_secs() as i64,
    };

    encode(
        &Header::new(security.algorithm),
        &payload,
        &EncodingKey::from_secret(&security.jwt_secret),
    )
    .map_err(|e| AppError::internal(format!("Failed to encode JWT: {e}")))
}

/// Verify a bearer token and resolve the caller identity.
///
/// Signature, algorithm and `exp` are checked; a token without a usable
/// `userId` is rejected even when correctly signed. Every failure is
/// `Unauthenticated`.
pub fn verify_access_token(
    token: &str,
    security: &SecurityConfig,
) -> Result<IdentityClaims, AppError> {
    let mut validation = Validation::new(security.algorithm);
    // Expiry is exact: no clock tolerance past `exp`.
    validation.leeway = 0;

    let payload = decode::<TokenPayload>(
        token,
        &DecodingKey::from_secret(&security.jwt_secret),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::unauthenticated("Token has expired"),
        ErrorKind::InvalidSignature => AppError::unauthenticated("Invalid token signature"),
        _ => AppError::unauthenticated("Invalid token"),
    })?;

    payload
        .into_identity()
        .ok_or_else(|| AppError::unauthenticated("Token payload is missing the subject id"))
}
