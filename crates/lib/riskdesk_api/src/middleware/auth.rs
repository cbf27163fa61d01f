//! Authentication middleware: access-token extraction and JWT verification.
//!
//! The token is read from the `accessToken` cookie, falling back to an
//! `Authorization: Bearer` header. Expired and invalid tokens both end in 401,
//! which is what the client session guard reacts to.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use riskdesk_core::models::auth::TokenClaims;

use crate::AppState;
use crate::error::AppError;
use crate::services::cookies;

/// Key used to store `TokenClaims` in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin(pub TokenClaims);

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Axum middleware: verifies the access token and injects `AuthenticatedAdmin`
/// into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let jar = CookieJar::from_headers(request.headers());
    let token = cookies::read_access(&jar)
        .or_else(|| bearer_token(&request))
        .ok_or_else(|| AppError::Unauthorized("Not authorized, no token".into()))?;

    let claims = state.auth.verify_access(&token)?;

    request.extensions_mut().insert(AuthenticatedAdmin(claims));

    Ok(next.run(request).await)
}
