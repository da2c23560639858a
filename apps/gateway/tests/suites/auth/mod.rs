pub mod entitlements;
pub mod gate;
pub mod login;
