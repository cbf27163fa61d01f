//! # riskdesk_core
//!
//! Core session-authentication logic for Riskdesk: credential checks, token
//! issuance, and the single-slot refresh-token store.

pub mod auth;
pub mod migrate;
pub mod models;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
