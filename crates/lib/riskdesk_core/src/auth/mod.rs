//! Authentication and session logic.
//!
//! Provides password verification, token issuance, and the single-slot
//! refresh-token store shared by `riskdesk_api` and the CLI.

pub mod jwt;
pub mod password;
pub mod store;

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("No refresh token provided")]
    MissingRefreshToken,

    #[error("Session expired or invalid")]
    SessionInvalid,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token invalid")]
    TokenInvalid,

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// SHA-256 hex digest of a refresh token, as stored in the session slot.
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
