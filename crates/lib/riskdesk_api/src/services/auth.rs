//! Authentication service: login, rotation, and logout over the session slot.
//!
//! Every successful login or rotation rewrites the account's single refresh
//! slot, so a new login elsewhere silently ends any earlier session.

use std::sync::Arc;

use axum_extra::extract::cookie::CookieJar;
use riskdesk_core::auth::jwt::TokenIssuer;
use riskdesk_core::auth::password::verify_credentials;
use riskdesk_core::auth::store::{AdminDirectory, SessionStore};
use riskdesk_core::auth::AuthError;
use riskdesk_core::models::auth::{AdminProfile, TokenClaims};
use tracing::{info, warn};

use super::cookies;
use crate::config::Environment;
use crate::error::{AppError, AppResult};

/// Server-side session state machine.
#[derive(Clone)]
pub struct AuthService {
    directory: Arc<dyn AdminDirectory>,
    sessions: Arc<dyn SessionStore>,
    issuer: TokenIssuer,
    environment: Environment,
}

impl AuthService {
    pub fn new(
        directory: Arc<dyn AdminDirectory>,
        sessions: Arc<dyn SessionStore>,
        issuer: TokenIssuer,
        environment: Environment,
    ) -> Self {
        Self {
            directory,
            sessions,
            issuer,
            environment,
        }
    }

    /// Authenticate with email or username + password and open a session.
    pub async fn login(
        &self,
        jar: CookieJar,
        identifier: &str,
        password: &str,
    ) -> AppResult<(CookieJar, AdminProfile)> {
        let identifier = identifier.trim();
        if identifier.is_empty() || password.is_empty() {
            warn!("login rejected: blank identifier or password");
            return Err(AppError::InvalidCredentials);
        }

        let found = self.directory.find_by_identifier(identifier).await?;
        let account = verify_credentials(found, password).inspect_err(|e| {
            if matches!(e, AuthError::InvalidCredentials) {
                warn!("login rejected");
            }
        })?;

        let tokens = self.issuer.issue(&account.id, &account.role)?;
        self.sessions.set(&account.id, &tokens.refresh_token).await?;

        info!(admin_id = %account.id, "admin logged in");
        let jar = cookies::attach(jar, &tokens, self.environment);
        Ok((jar, account.profile()))
    }

    /// Exchange the presented refresh token for a new pair (single-use rotation).
    ///
    /// A missing token fails with `MissingRefreshToken`; anything else that
    /// prevents rotation, store failures included, fails with
    /// `SessionInvalid`, which clients treat as terminal.
    pub async fn refresh(
        &self,
        jar: CookieJar,
        presented: Option<&str>,
    ) -> AppResult<(CookieJar, AdminProfile)> {
        let presented = match presented {
            Some(token) if !token.is_empty() => token,
            _ => return Err(AppError::MissingRefreshToken),
        };

        self.issuer
            .verify_refresh(presented)
            .map_err(|_| AppError::SessionInvalid)?;

        let account = match self.sessions.find_by_refresh(presented).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                warn!("refresh rejected: token is not the current session");
                return Err(AppError::SessionInvalid);
            }
            Err(e) => {
                warn!(error = %e, "refresh rejected: session lookup failed");
                return Err(AppError::SessionInvalid);
            }
        };

        let tokens = self
            .issuer
            .rotate(presented, &account)
            .map_err(|_| AppError::SessionInvalid)?;

        match self.sessions.rotate(presented, &tokens.refresh_token).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(admin_id = %account.id, "refresh rejected: lost concurrent rotation");
                return Err(AppError::SessionInvalid);
            }
            Err(e) => {
                warn!(admin_id = %account.id, error = %e, "refresh rejected: rotation failed");
                return Err(AppError::SessionInvalid);
            }
        }

        info!(admin_id = %account.id, "session rotated");
        let jar = cookies::attach(jar, &tokens, self.environment);
        Ok((jar, account.profile()))
    }

    /// Clear the session slot holding `presented` (if any) and expire both cookies.
    ///
    /// Best-effort on the store side: logout succeeds even if the slot could
    /// not be cleared.
    pub async fn logout(&self, jar: CookieJar, presented: Option<&str>) -> CookieJar {
        if let Some(token) = presented.filter(|t| !t.is_empty()) {
            match self.sessions.clear(token).await {
                Ok(()) => info!("session cleared"),
                Err(e) => warn!(error = %e, "failed to clear session slot on logout"),
            }
        }
        cookies::clear(jar, self.environment)
    }

    /// Verify an access token for the protected API surface.
    pub fn verify_access(&self, token: &str) -> AppResult<TokenClaims> {
        self.issuer.verify_access(token).map_err(AppError::from)
    }

    /// Profile of the admin named by verified access claims.
    pub async fn profile(&self, claims: &TokenClaims) -> AppResult<AdminProfile> {
        self.directory
            .find_by_id(&claims.sub)
            .await?
            .map(|account| account.profile())
            .ok_or_else(|| AppError::Unauthorized("Account not found".into()))
    }
}
