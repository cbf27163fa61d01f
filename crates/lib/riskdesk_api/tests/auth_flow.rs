//! Integration tests: build the router over the in-memory admin store and
//! drive the auth endpoints end to end.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Request, StatusCode};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use riskdesk_api::config::Environment;
use riskdesk_api::services::auth::AuthService;
use riskdesk_api::{AppState, router};
use riskdesk_core::auth::jwt::TokenIssuer;
use riskdesk_core::auth::password::hash_password;
use riskdesk_core::auth::store::{AdminDirectory, MemoryAdminStore};
use riskdesk_core::models::auth::NewAdmin;
use tower::ServiceExt;

const SECRET: &str = "integration-secret";

struct Reply {
    status: StatusCode,
    cookies: Vec<Cookie<'static>>,
    raw_cookies: Vec<String>,
    json: serde_json::Value,
}

impl Reply {
    fn cookie(&self, name: &str) -> &Cookie<'static> {
        self.cookies
            .iter()
            .find(|c| c.name() == name)
            .unwrap_or_else(|| panic!("missing cookie {name}"))
    }

    fn raw_cookie(&self, name: &str) -> &str {
        self.raw_cookies
            .iter()
            .find(|c| c.starts_with(&format!("{name}=")))
            .unwrap_or_else(|| panic!("missing cookie {name}"))
    }
}

async fn app(environment: Environment) -> Router {
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
    let auth = AuthService::new(
        store.clone(),
        store,
        TokenIssuer::new(SECRET.as_bytes()),
        environment,
    );
    router(AppState { auth })
}

async fn send(app: &Router, req: Request<Body>) -> Reply {
    let resp = app.clone().oneshot(req).await.expect("request");
    let status = resp.status();
    let raw_cookies: Vec<String> = resp
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    let cookies = raw_cookies
        .iter()
        .map(|raw| Cookie::parse(raw.clone()).expect("parse set-cookie"))
        .collect();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).expect("parse JSON")
    };
    Reply {
        status,
        cookies,
        raw_cookies,
        json,
    }
}

fn login_request(identifier: &str, password: &str) -> Request<Body> {
    let body = serde_json::json!({ "identifier": identifier, "password": password });
    Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_with_cookie(uri: &str, cookie: Option<String>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn refresh_request(refresh: &str) -> Request<Body> {
    post_with_cookie("/auth/refresh-token", Some(format!("refreshToken={refresh}")))
}

fn me_request(access: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/auth/me");
    if let Some(access) = access {
        builder = builder.header(COOKIE, format!("accessToken={access}"));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn login_sets_development_cookie_contract() {
    let app = app(Environment::Development).await;
    let reply = send(&app, login_request("riskops", "hunter2-hunter2")).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json["success"], true);
    assert_eq!(reply.json["message"], "Login successful");

    let access = reply.cookie("accessToken");
    assert_eq!(access.http_only(), Some(true));
    assert_eq!(access.secure(), None);
    assert_eq!(access.same_site(), Some(SameSite::Lax));
    assert_eq!(access.max_age(), Some(time::Duration::seconds(900)));
    assert_eq!(access.path(), Some("/"));

    let refresh = reply.cookie("refreshToken");
    assert_eq!(refresh.http_only(), Some(true));
    assert_eq!(refresh.secure(), None);
    assert_eq!(refresh.same_site(), Some(SameSite::Lax));
    assert_eq!(refresh.max_age(), Some(time::Duration::seconds(604_800)));
    assert_eq!(refresh.path(), Some("/"));

    assert!(!reply.raw_cookie("accessToken").contains("Secure"));
}

#[tokio::test]
async fn login_sets_production_cookie_contract() {
    let app = app(Environment::Production).await;
    let reply = send(&app, login_request("riskops@example.com", "hunter2-hunter2")).await;

    assert_eq!(reply.status, StatusCode::OK);
    for (name, max_age) in [("accessToken", 900), ("refreshToken", 604_800)] {
        let cookie = reply.cookie(name);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::None));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(max_age)));
        assert_eq!(cookie.path(), Some("/"));
        assert!(reply.raw_cookie(name).contains("SameSite=None"));
    }
}

#[tokio::test]
async fn login_body_exposes_only_the_public_profile() {
    let app = app(Environment::Development).await;
    let reply = send(&app, login_request("riskops", "hunter2-hunter2")).await;

    let data = reply.json["data"].as_object().expect("data object");
    let mut keys: Vec<&str> = data.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, ["email", "id", "role", "username"]);
    assert!(reply.json.get("accessToken").is_none());
    assert!(reply.json.get("refreshToken").is_none());
}

#[tokio::test]
async fn login_accepts_email_alias_field() {
    let app = app(Environment::Development).await;
    let body = serde_json::json!({ "email": "riskops@example.com", "password": "hunter2-hunter2" });
    let req = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    assert_eq!(send(&app, req).await.status, StatusCode::OK);
}

#[tokio::test]
async fn bad_credentials_are_401_without_cookies() {
    let app = app(Environment::Development).await;
    let reply = send(&app, login_request("riskops", "wrong")).await;

    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json["success"], false);
    assert_eq!(reply.json["error"], "invalid_credentials");
    assert!(reply.cookies.is_empty());
}

#[tokio::test]
async fn refresh_rotates_and_rejects_replayed_token() {
    let app = app(Environment::Development).await;
    let a = send(&app, login_request("riskops", "hunter2-hunter2")).await;
    let a_refresh = a.cookie("refreshToken").value().to_string();

    let b = send(&app, refresh_request(&a_refresh)).await;
    assert_eq!(b.status, StatusCode::OK);
    assert_eq!(b.json["message"], "Tokens refreshed");
    assert_eq!(b.json["data"]["username"], "riskops");
    let b_refresh = b.cookie("refreshToken").value().to_string();
    assert_ne!(a_refresh, b_refresh);
    assert_eq!(
        b.cookie("accessToken").max_age(),
        Some(time::Duration::seconds(900))
    );

    let replay = send(&app, refresh_request(&a_refresh)).await;
    assert_eq!(replay.status, StatusCode::UNAUTHORIZED);
    assert_eq!(replay.json["error"], "session_invalid");

    let c = send(&app, refresh_request(&b_refresh)).await;
    assert_eq!(c.status, StatusCode::OK);
}

#[tokio::test]
async fn refresh_without_cookie_is_missing_token() {
    let app = app(Environment::Development).await;
    let reply = send(&app, post_with_cookie("/auth/refresh-token", None)).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json["error"], "missing_refresh_token");
}

#[tokio::test]
async fn logout_clears_slot_and_cookies() {
    let app = app(Environment::Development).await;
    let login = send(&app, login_request("riskops", "hunter2-hunter2")).await;
    let refresh = login.cookie("refreshToken").value().to_string();

    let out = send(
        &app,
        post_with_cookie("/auth/logout", Some(format!("refreshToken={refresh}"))),
    )
    .await;
    assert_eq!(out.status, StatusCode::OK);
    assert_eq!(out.json["success"], true);
    for name in ["accessToken", "refreshToken"] {
        let cookie = out.cookie(name);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
        assert_eq!(cookie.path(), Some("/"));
    }

    let after = send(&app, refresh_request(&refresh)).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    assert_eq!(after.json["error"], "session_invalid");
}

#[tokio::test]
async fn logout_without_session_still_succeeds() {
    let app = app(Environment::Development).await;
    let out = send(&app, post_with_cookie("/auth/logout", None)).await;
    assert_eq!(out.status, StatusCode::OK);
    assert_eq!(out.cookies.len(), 2);
}

#[tokio::test]
async fn protected_route_requires_a_live_access_token() {
    let app = app(Environment::Development).await;
    let login = send(&app, login_request("riskops", "hunter2-hunter2")).await;
    let access = login.cookie("accessToken").value().to_string();
    let admin_id = login.json["data"]["id"].as_str().unwrap().to_string();

    let ok = send(&app, me_request(Some(&access))).await;
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(ok.json["data"]["id"], admin_id.as_str());

    let bearer = Request::builder()
        .uri("/auth/me")
        .header("authorization", format!("Bearer {access}"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, bearer).await.status, StatusCode::OK);

    let anonymous = send(&app, me_request(None)).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let stale = TokenIssuer::new(SECRET.as_bytes())
        .issue_at(&admin_id, "admin", Utc::now() - Duration::hours(1))
        .unwrap();
    let expired = send(&app, me_request(Some(&stale.access_token))).await;
    assert_eq!(expired.status, StatusCode::UNAUTHORIZED);
    assert_eq!(expired.json["error"], "token_expired");

    let forged = send(&app, me_request(Some("not.a.token"))).await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
    assert_eq!(forged.json["error"], "token_invalid");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_refreshes_have_exactly_one_winner() {
    let app = app(Environment::Development).await;
    let login = send(&app, login_request("riskops", "hunter2-hunter2")).await;
    let refresh = login.cookie("refreshToken").value().to_string();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let app = app.clone();
        let refresh = refresh.clone();
        handles.push(tokio::spawn(async move {
            send(&app, refresh_request(&refresh)).await
        }));
    }

    let mut winners = Vec::new();
    let mut losers = 0;
    for handle in handles {
        let reply = handle.await.unwrap();
        match reply.status {
            StatusCode::OK => winners.push(reply.cookie("refreshToken").value().to_string()),
            StatusCode::UNAUTHORIZED => {
                assert_eq!(reply.json["error"], "session_invalid");
                losers += 1;
            }
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(winners.len(), 1);
    assert_eq!(losers, 7);

    // The single winner's token is the one persisted.
    let next = send(&app, refresh_request(&winners[0])).await;
    assert_eq!(next.status, StatusCode::OK);
}

#[tokio::test]
async fn new_login_ends_the_previous_session() {
    let app = app(Environment::Development).await;
    let first = send(&app, login_request("riskops", "hunter2-hunter2")).await;
    let _second = send(&app, login_request("riskops", "hunter2-hunter2")).await;

    let stale = send(
        &app,
        refresh_request(first.cookie("refreshToken").value()),
    )
    .await;
    assert_eq!(stale.status, StatusCode::UNAUTHORIZED);
    assert_eq!(stale.json["error"], "session_invalid");
}

#[tokio::test]
async fn blank_credentials_are_invalid_credentials() {
    let app = app(Environment::Development).await;
    for (identifier, password) in [("riskops", ""), ("   ", "hunter2-hunter2")] {
        let reply = send(&app, login_request(identifier, password)).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.json["error"], "invalid_credentials");
        assert!(reply.cookies.is_empty());
    }
}

#[tokio::test]
async fn malformed_login_body_uses_error_envelope() {
    let app = app(Environment::Development).await;
    for body in [r#"{"identifier":"riskops"}"#, "not json"] {
        let req = Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        let reply = send(&app, req).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.json["success"], false);
        assert_eq!(reply.json["error"], "validation_error");
        assert!(reply.json["message"].as_str().is_some_and(|m| !m.is_empty()));
    }
}
