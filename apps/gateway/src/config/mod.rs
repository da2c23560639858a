pub mod env;
pub mod gateway;

pub use env::EnvSource;
pub use gateway::{BackendTarget, GatewayConfig, RateLimitConfig, UploadConfig, UploadStorage};
