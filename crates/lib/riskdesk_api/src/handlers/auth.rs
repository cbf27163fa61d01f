//! Authentication request handlers.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::{Extension, Json};
use axum_extra::extract::cookie::CookieJar;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedAdmin;
use crate::models::{AdminProfile, ApiResponse, LoginRequest};
use crate::services::cookies;

/// `POST /auth/login`: authenticate with email or username + password.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<(CookieJar, Json<ApiResponse<AdminProfile>>)> {
    let Json(body) = body?;
    let (jar, profile) = state
        .auth
        .login(jar, &body.identifier, &body.password)
        .await?;
    Ok((jar, Json(ApiResponse::ok("Login successful", profile))))
}

/// `POST /auth/refresh-token`: rotate the session carried by the refresh cookie.
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<ApiResponse<AdminProfile>>)> {
    let presented = cookies::read_refresh(&jar);
    let (jar, profile) = state.auth.refresh(jar, presented.as_deref()).await?;
    Ok((jar, Json(ApiResponse::ok("Tokens refreshed", profile))))
}

/// `POST /auth/logout`: clear the session slot and both cookies. Always 200.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<ApiResponse<()>>) {
    let presented = cookies::read_refresh(&jar);
    let jar = state.auth.logout(jar, presented.as_deref()).await;
    (jar, Json(ApiResponse::message("Logged out successfully")))
}

/// `GET /auth/me`: profile of the authenticated admin. Requires authentication.
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedAdmin(claims)): Extension<AuthenticatedAdmin>,
) -> AppResult<Json<ApiResponse<AdminProfile>>> {
    let profile = state.auth.profile(&claims).await?;
    Ok(Json(ApiResponse::ok("Authenticated", profile)))
}
