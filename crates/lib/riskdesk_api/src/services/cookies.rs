//! Cookie service: set/get/clear httpOnly session cookies.
//!
//! In production both cookies are `Secure; SameSite=None` so a cross-origin
//! frontend can send them; in development they are `SameSite=Lax` without
//! `Secure` so plain HTTP works.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use riskdesk_core::auth::jwt::{ACCESS_TOKEN_TTL_SECS, REFRESH_TOKEN_TTL_SECS};
use riskdesk_core::models::auth::TokenPair;
use time::Duration;

use crate::config::Environment;

/// Cookie name for the access token.
pub const ACCESS_COOKIE: &str = "accessToken";
/// Cookie name for the refresh token.
pub const REFRESH_COOKIE: &str = "refreshToken";

fn session_cookie(
    name: &'static str,
    value: String,
    max_age: Duration,
    env: Environment,
) -> Cookie<'static> {
    let same_site = if env.is_production() {
        SameSite::None
    } else {
        SameSite::Lax
    };
    Cookie::build((name, value))
        .http_only(true)
        .secure(env.is_production())
        .same_site(same_site)
        .path("/")
        .max_age(max_age)
        .build()
}

/// Build the access-token cookie (15 minutes).
pub fn access_cookie(token: &str, env: Environment) -> Cookie<'static> {
    session_cookie(
        ACCESS_COOKIE,
        token.to_string(),
        Duration::seconds(ACCESS_TOKEN_TTL_SECS),
        env,
    )
}

/// Build the refresh-token cookie (7 days).
pub fn refresh_cookie(token: &str, env: Environment) -> Cookie<'static> {
    session_cookie(
        REFRESH_COOKIE,
        token.to_string(),
        Duration::seconds(REFRESH_TOKEN_TTL_SECS),
        env,
    )
}

/// Set both session cookies for a freshly issued pair.
pub fn attach(jar: CookieJar, tokens: &TokenPair, env: Environment) -> CookieJar {
    jar.add(access_cookie(&tokens.access_token, env))
        .add(refresh_cookie(&tokens.refresh_token, env))
}

/// Expire both session cookies. Path must match the one they were set with.
pub fn clear(jar: CookieJar, env: Environment) -> CookieJar {
    jar.add(session_cookie(ACCESS_COOKIE, String::new(), Duration::ZERO, env))
        .add(session_cookie(REFRESH_COOKIE, String::new(), Duration::ZERO, env))
}

fn non_empty(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Access token carried by the request, if any.
pub fn read_access(jar: &CookieJar) -> Option<String> {
    non_empty(jar, ACCESS_COOKIE)
}

/// Refresh token carried by the request, if any.
pub fn read_refresh(jar: &CookieJar) -> Option<String> {
    non_empty(jar, REFRESH_COOKIE)
}
