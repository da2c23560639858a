use jsonwebtoken::Algorithm;

/// Token verification settings shared by every request.
#[derive(Clone)]
pub struct SecurityConfig {
    /// HS256 shared secret; the auth service signs with the same bytes
    pub jwt_secret: Vec<u8>,
    /// Pinned algorithm; tokens signed with anything else are rejected
    pub algorithm: Algorithm,
}

impl SecurityConfig {
    pub fn new(jwt_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            algorithm: Algorithm::HS256,
        }
    }
}

// Keeps the secret out of logs.
impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("jwt_secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}
