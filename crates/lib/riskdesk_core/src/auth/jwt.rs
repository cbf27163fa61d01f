//! JWT token issuance and verification.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::info;
use uuid::Uuid;

use super::{AuthError, token_digest};
use crate::models::auth::{AdminAccount, TokenClaims, TokenKind, TokenPair};

/// Access token lifetime: 15 minutes.
pub const ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;

/// Refresh token lifetime: 7 days.
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Mints and validates HS256 access and refresh tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl: Duration::seconds(ACCESS_TOKEN_TTL_SECS),
            refresh_ttl: Duration::seconds(REFRESH_TOKEN_TTL_SECS),
        }
    }

    /// Issue a fresh access/refresh pair for an account.
    pub fn issue(&self, account_id: &str, role: &str) -> Result<TokenPair, AuthError> {
        self.issue_at(account_id, role, Utc::now())
    }

    /// Issue a pair as if the clock read `now`.
    pub fn issue_at(
        &self,
        account_id: &str,
        role: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, AuthError> {
        let access = TokenClaims {
            sub: account_id.to_string(),
            role: role.to_string(),
            typ: TokenKind::Access,
            jti: None,
            exp: (now + self.access_ttl).timestamp(),
            iat: now.timestamp(),
        };
        let refresh = TokenClaims {
            sub: account_id.to_string(),
            role: role.to_string(),
            typ: TokenKind::Refresh,
            jti: Some(Uuid::new_v4().to_string()),
            exp: (now + self.refresh_ttl).timestamp(),
            iat: now.timestamp(),
        };
        Ok(TokenPair {
            access_token: self.sign(&access)?,
            refresh_token: self.sign(&refresh)?,
        })
    }

    /// Verify an access token, returning its claims.
    pub fn verify_access(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.verify(token, TokenKind::Access)
    }

    /// Verify the signature, expiry, and kind of a refresh token.
    ///
    /// Passing this check does not make the token current; only equality with
    /// the stored slot does (see [`TokenIssuer::rotate`]).
    pub fn verify_refresh(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.verify(token, TokenKind::Refresh)
    }

    /// Mint a replacement pair, provided `presented` is the account's stored token.
    ///
    /// A superseded token fails with [`AuthError::SessionInvalid`]. The caller
    /// persists the new refresh token before responding.
    pub fn rotate(&self, presented: &str, account: &AdminAccount) -> Result<TokenPair, AuthError> {
        let presented_digest = token_digest(presented);
        match account.refresh_token_hash.as_deref() {
            Some(stored) if stored == presented_digest => self.issue(&account.id, &account.role),
            _ => Err(AuthError::SessionInvalid),
        }
    }

    fn sign(&self, claims: &TokenClaims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))
    }

    fn verify(&self, token: &str, kind: TokenKind) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        let claims = decode::<TokenClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            })?;
        if claims.typ != kind {
            return Err(AuthError::TokenInvalid);
        }
        Ok(claims)
    }
}

/// Resolve the JWT secret: env var `JWT_SECRET` → `AUTH_SECRET` → persisted file.
pub fn resolve_jwt_secret() -> String {
    if let Ok(secret) = std::env::var("JWT_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    if let Ok(secret) = std::env::var("AUTH_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    load_or_generate_secret(&jwt_secret_path())
}

/// Read the secret persisted at `path`, generating and writing one if absent.
pub fn load_or_generate_secret(path: &Path) -> String {
    if let Ok(existing) = std::fs::read_to_string(path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(path, &secret);
    info!(path = %path.display(), "generated new JWT secret");
    secret
}

/// Path to the persisted JWT secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("riskdesk")
        .join("jwt-secret")
}
