//! # riskdesk_api
//!
//! HTTP API library for Riskdesk session authentication.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use riskdesk_core::auth::jwt::TokenIssuer;
use riskdesk_core::auth::store::PgAdminStore;
use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::handlers::auth;
use crate::services::auth::AuthService;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session orchestration over the admin store.
    pub auth: AuthService,
}

impl AppState {
    /// State backed by the PostgreSQL `admins` table.
    pub fn with_pool(pool: PgPool, config: &ApiConfig) -> Self {
        let store = Arc::new(PgAdminStore::new(pool));
        let auth = AuthService::new(
            store.clone(),
            store,
            TokenIssuer::new(config.jwt_secret.as_bytes()),
            config.environment,
        );
        Self { auth }
    }
}

/// Run embedded database migrations.
///
/// Delegates to `riskdesk_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    riskdesk_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route(routes::POST_AUTH_REFRESH, post(auth::refresh_handler))
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route(routes::GET_AUTH_ME, get(auth::me_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .with_state(state)
}
