//! Identity carried by a verified access token.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Caller role. Matching is case-sensitive on the wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "USER")]
    User,
    #[serde(rename = "ADMIN")]
    Admin,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    /// Parse the wire form. Anything other than exactly `USER` or `ADMIN` is
    /// "no role".
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "USER" => Some(Role::User),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw token payload as signed by the auth service.
///
/// Fields are loose on purpose so that a well-signed token with a bad
/// `userId` or unknown `role` reaches [`TokenPayload::into_identity`] instead
/// of failing as a generic decode error.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenPayload {
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    pub exp: i64,
}

impl TokenPayload {
    /// Resolve the subject id; `None` when absent or not a string/number.
    pub fn subject_id(&self) -> Option<String> {
        match self.user_id.as_ref()? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.role.as_ref().and_then(Value::as_str).and_then(Role::parse)
    }

    pub fn into_identity(self) -> Option<IdentityClaims> {
        let subject_id = self.subject_id()?;
        let role = self.role();
        Some(IdentityClaims {
            subject_id,
            email: self.email,
            role,
        })
    }
}

/// Verified caller identity, attached to one request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    pub subject_id: String,
    pub email: Option<String>,
    pub role: Option<Role>,
}
