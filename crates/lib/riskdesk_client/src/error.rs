//! Client error types.

use http::StatusCode;
use thiserror::Error;

/// Errors surfaced by the client and its session guard.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure; passed through the guard unchanged.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Session renewal failed or timed out; the user must log in again.
    #[error("Session expired. Please log in again.")]
    SessionExpired,

    #[error("Request failed ({status}): {message}")]
    Status { status: StatusCode, message: String },

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}
