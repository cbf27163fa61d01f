//! # riskdesk_client
//!
//! HTTP client for the Riskdesk API. All calls go through a [`SessionGuard`],
//! which turns an expired access token into one silent session renewal and a
//! single retry, and reports a failed renewal as [`ClientError::SessionExpired`].

pub mod error;
pub mod guard;
pub mod models;
pub mod transport;

pub use error::ClientError;
pub use guard::{GuardConfig, SessionGuard, SessionState};
pub use models::AdminProfile;
pub use transport::{ApiRequest, ApiResponse, ApiTransport, HttpTransport};
