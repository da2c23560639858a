//! Gateway test support utilities
//!
//! Helpers shared by the gateway's unit and integration tests: unified
//! logging initialization and assertions for the stable error envelope.
//! Nothing here depends on gateway types.

pub mod envelope;
pub mod logging;
