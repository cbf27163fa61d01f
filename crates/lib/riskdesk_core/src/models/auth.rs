//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API wire envelopes
//! (which carry `success`/`message` alongside the data).

use serde::{Deserialize, Serialize};

/// Admin account as stored, including the password hash and session slot.
#[derive(Debug, Clone)]
pub struct AdminAccount {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    /// SHA-256 digest of the single currently-valid refresh token, if any.
    pub refresh_token_hash: Option<String>,
}

impl AdminAccount {
    /// Public projection; never carries the password hash or tokens.
    pub fn profile(&self) -> AdminProfile {
        AdminProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }
}

/// Public admin profile returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: String,
}

/// Input for provisioning a new admin account.
#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

/// Which half of the token pair a JWT belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims embedded in access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (admin account ID).
    pub sub: String,
    /// Admin role (e.g. `"admin"`).
    pub role: String,
    /// Token kind; an access token is never accepted as a refresh token.
    pub typ: TokenKind,
    /// Unique token ID. Present on refresh tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}

/// A freshly minted access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}
