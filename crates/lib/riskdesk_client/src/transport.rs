//! Request transport seam.
//!
//! [`ApiTransport`] sends one request and returns the raw response; it never
//! retries. [`HttpTransport`] is the reqwest implementation, holding session
//! cookies in its cookie store.

use std::sync::Arc;

use async_trait::async_trait;
use http::{Method, StatusCode};
use reqwest::cookie::Jar;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::ClientError;
use crate::models::ErrorBody;

/// Login endpoint.
pub const LOGIN_PATH: &str = "/auth/login";
/// Session renewal endpoint. A 401 from this path never triggers renewal.
pub const REFRESH_PATH: &str = "/auth/refresh-token";
/// Logout endpoint.
pub const LOGOUT_PATH: &str = "/auth/logout";

/// An outbound API call, relative to the transport's base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: Some(body),
        }
    }

    /// Whether this request targets the renewal endpoint.
    pub fn is_renewal(&self) -> bool {
        self.path == REFRESH_PATH
    }
}

/// Status and body of a completed call.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Turn a non-2xx response into [`ClientError::Status`].
    pub fn error_for_status(self) -> Result<Self, ClientError> {
        if self.status.is_success() {
            return Ok(self);
        }
        let message = serde_json::from_slice::<ErrorBody>(&self.body)
            .map(|b| b.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                self.status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        Err(ClientError::Status {
            status: self.status,
            message,
        })
    }
}

/// Sends a single request. Implementations carry the session cookies.
#[async_trait]
pub trait ApiTransport: Send + Sync + 'static {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError>;
}

#[async_trait]
impl<T: ApiTransport + ?Sized> ApiTransport for Arc<T> {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        (**self).execute(request).await
    }
}

/// reqwest-backed transport with a cookie store.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Build a transport for `base_url` (e.g. `http://localhost:5000`).
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_cookie_jar(base_url, Arc::new(Jar::default()))
    }

    /// Build a transport whose session cookies live in a caller-owned jar.
    pub fn with_cookie_jar(base_url: &str, jar: Arc<Jar>) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url)?;
        let client = reqwest::Client::builder().cookie_provider(jar).build()?;
        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(method = %request.method, url = %url, "sending request");

        let mut builder = self.client.request(request.method.clone(), &url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        Ok(ApiResponse { status, body })
    }
}
