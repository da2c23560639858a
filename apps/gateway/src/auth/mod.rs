pub mod claims;
pub mod jwt;


pub use claims::{IdentityClaims, Role, TokenPayload};
pub use jwt::{mint_access_token, verify_access_token};
