//! End-to-end: the session guard over a real HTTP transport against the API
//! router bound to a loopback port.

use std::sync::Arc;

use reqwest::cookie::Jar;
use riskdesk_api::config::Environment;
use riskdesk_api::services::auth::AuthService;
use riskdesk_api::{AppState, router};
use riskdesk_client::{ApiRequest, ClientError, HttpTransport, SessionGuard, SessionState};
use riskdesk_core::auth::jwt::TokenIssuer;
use riskdesk_core::auth::password::hash_password;
use riskdesk_core::auth::store::{AdminDirectory, MemoryAdminStore};
use riskdesk_core::models::auth::NewAdmin;
use serde_json::Value;
use url::Url;

const SECRET: &str = "roundtrip-secret";

async fn spawn_api() -> String {
    let store = Arc::new(MemoryAdminStore::new());
    store
        .create_admin(NewAdmin {
            username: "riskops".into(),
            email: "riskops@example.com".into(),
            password_hash: hash_password("hunter2-hunter2").unwrap(),
            role: "admin".into(),
        })
        .await
        .unwrap();
    let environment = Environment::Development;
    let auth = AuthService::new(
        store.clone(),
        store,
        TokenIssuer::new(SECRET.as_bytes()),
        environment,
    );
    let app = router(AppState { auth });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn login_renew_and_logout_over_http() {
    let base = spawn_api().await;
    let jar = Arc::new(Jar::default());
    let guard = SessionGuard::new(HttpTransport::with_cookie_jar(&base, jar.clone()).unwrap());

    let who = guard.login("riskops@example.com", "hunter2-hunter2").await.unwrap();
    assert_eq!(who.username, "riskops");

    let me: Value = guard.get_json("/auth/me").await.unwrap();
    assert_eq!(me["data"]["email"], "riskops@example.com");

    // Spoil the access cookie; the refresh cookie is still good.
    let url = Url::parse(&base).unwrap();
    jar.add_cookie_str("accessToken=spoiled; Path=/", &url);
    let me: Value = guard.get_json("/auth/me").await.unwrap();
    assert_eq!(me["data"]["username"], "riskops");
    assert_eq!(guard.identity().map(|p| p.username), Some("riskops".into()));

    guard.logout().await.unwrap();
    assert_eq!(guard.state(), SessionState::Anonymous);

    let err = guard.send(ApiRequest::get("/auth/me")).await.unwrap_err();
    assert!(matches!(err, ClientError::SessionExpired));
    assert_eq!(guard.state(), SessionState::Expired);
}

#[tokio::test]
async fn wrong_password_over_http() {
    let base = spawn_api().await;
    let guard = SessionGuard::new(HttpTransport::new(&base).unwrap());

    let err = guard.login("riskops", "nope").await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidCredentials));
    assert_eq!(guard.restore().await, None);
}

#[tokio::test]
async fn restore_picks_up_existing_session() {
    let base = spawn_api().await;
    let jar = Arc::new(Jar::default());

    let first = SessionGuard::new(HttpTransport::with_cookie_jar(&base, jar.clone()).unwrap());
    first.login("riskops", "hunter2-hunter2").await.unwrap();

    // A second client sharing the cookie jar, as after an app restart.
    let second = SessionGuard::new(HttpTransport::with_cookie_jar(&base, jar).unwrap());
    let restored = second.restore().await.unwrap();
    assert_eq!(restored.username, "riskops");
    assert!(matches!(second.state(), SessionState::Authenticated(_)));
}
