//! Client session guard.
//!
//! Wraps every call to the protected API. On a 401 from anything other than
//! the renewal endpoint, the guard renews the session once and resends the
//! original request once. Renewals are coalesced: concurrent callers share a
//! single in-flight refresh, and a caller whose request was already on the
//! wire when a refresh completed reuses that outcome instead of starting
//! another one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use http::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::models::{AdminProfile, Envelope};
use crate::transport::{
    ApiRequest, ApiResponse, ApiTransport, LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH,
};

/// Default time a caller waits for a renewal before failing safe.
pub const DEFAULT_RENEWAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Identity as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated(AdminProfile),
    /// Renewal failed; observers should send the user to the login screen.
    Expired,
}

/// Guard tuning.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    pub renewal_timeout: Duration,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            renewal_timeout: DEFAULT_RENEWAL_TIMEOUT,
        }
    }
}

/// Why a renewal did not produce a fresh session.
#[derive(Debug, Clone, Error)]
enum RenewalFailure {
    #[error("renewal rejected with status {0}")]
    Rejected(StatusCode),

    #[error("renewal transport failure: {0}")]
    Network(String),

    #[error("renewal response unreadable: {0}")]
    Decode(String),

    #[error("renewal task aborted")]
    Aborted,

    #[error("renewal timed out")]
    TimedOut,
}

type RenewalResult = Result<AdminProfile, RenewalFailure>;
type Flight = Shared<BoxFuture<'static, RenewalResult>>;

/// Bookkeeping for coalescing renewals.
#[derive(Default)]
struct RenewalSlot {
    /// Number of completed renewals.
    generation: u64,
    /// Outcome of the most recent completed renewal.
    last: Option<RenewalResult>,
    in_flight: Option<Flight>,
}

struct Inner<T> {
    transport: T,
    config: GuardConfig,
    state: watch::Sender<SessionState>,
    renewal: Mutex<RenewalSlot>,
    /// Mirror of `RenewalSlot::generation`, readable without the lock.
    completed: AtomicU64,
}

/// Owns the client session for one transport. Cheap to clone; clones share
/// the same session.
pub struct SessionGuard<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for SessionGuard<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: ApiTransport> SessionGuard<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, GuardConfig::default())
    }

    pub fn with_config(transport: T, config: GuardConfig) -> Self {
        let (state, _) = watch::channel(SessionState::Anonymous);
        Self {
            inner: Arc::new(Inner {
                transport,
                config,
                state,
                renewal: Mutex::new(RenewalSlot::default()),
                completed: AtomicU64::new(0),
            }),
        }
    }

    /// Current identity state.
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Authenticated profile, if any.
    pub fn identity(&self) -> Option<AdminProfile> {
        match &*self.inner.state.borrow() {
            SessionState::Authenticated(profile) => Some(profile.clone()),
            _ => None,
        }
    }

    /// Watch identity changes (e.g. to redirect to login on `Expired`).
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Log in. A 401 is reported as [`ClientError::InvalidCredentials`] and
    /// never triggers renewal.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<AdminProfile, ClientError> {
        let request = ApiRequest::post(
            LOGIN_PATH,
            serde_json::json!({
                "identifier": identifier.trim(),
                "password": password,
            }),
        );
        let response = self.inner.transport.execute(&request).await?;
        if response.status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::InvalidCredentials);
        }
        let profile = profile_from(response.error_for_status()?)?;
        info!(admin = %profile.username, "logged in");
        self.inner
            .state
            .send_replace(SessionState::Authenticated(profile.clone()));
        Ok(profile)
    }

    /// Log out. Local identity is dropped even if the server call fails.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let request = ApiRequest::post(LOGOUT_PATH, serde_json::json!({}));
        let result = self.inner.transport.execute(&request).await;
        self.inner.state.send_replace(SessionState::Anonymous);
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(error = %e, "logout request failed");
                Err(e)
            }
        }
    }

    /// Restore identity at startup from an existing refresh cookie.
    ///
    /// Returns `None` and leaves the guard `Anonymous` when there is no
    /// usable session; this is not treated as an expiry.
    pub async fn restore(&self) -> Option<AdminProfile> {
        let observed = self.inner.completed.load(Ordering::Acquire);
        match self.renew(observed).await {
            Ok(profile) => {
                self.inner
                    .state
                    .send_replace(SessionState::Authenticated(profile.clone()));
                Some(profile)
            }
            Err(failure) => {
                debug!(reason = %failure, "no session to restore");
                self.inner.state.send_if_modified(|state| {
                    if matches!(state, SessionState::Authenticated(_)) {
                        false
                    } else {
                        *state = SessionState::Anonymous;
                        true
                    }
                });
                None
            }
        }
    }

    /// Send a request, renewing the session once on 401.
    ///
    /// The resent request is final: its response is returned as-is, even
    /// if it is another 401.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let observed = self.inner.completed.load(Ordering::Acquire);
        let response = self.inner.transport.execute(&request).await?;
        if response.status != StatusCode::UNAUTHORIZED || request.is_renewal() {
            return Ok(response);
        }

        debug!(path = %request.path, "access rejected, renewing session");
        match self.renew(observed).await {
            Ok(_) => self.inner.transport.execute(&request).await,
            Err(failure) => {
                warn!(path = %request.path, reason = %failure, "session renewal failed");
                self.inner.state.send_replace(SessionState::Expired);
                Err(ClientError::SessionExpired)
            }
        }
    }

    /// [`send`](Self::send), then decode a 2xx JSON body.
    pub async fn send_json<R: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<R, ClientError> {
        self.send(request).await?.error_for_status()?.json()
    }

    /// GET `path` and decode the JSON body.
    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, ClientError> {
        self.send_json(ApiRequest::get(path)).await
    }

    /// Join or start a renewal, waiting at most the configured timeout.
    async fn renew(&self, observed: u64) -> RenewalResult {
        let flight = {
            let mut slot = self.inner.renewal.lock().await;
            if slot.generation > observed
                && let Some(last) = &slot.last
            {
                return last.clone();
            }
            match &slot.in_flight {
                Some(flight) => flight.clone(),
                None => {
                    let flight = self.start_renewal();
                    slot.in_flight = Some(flight.clone());
                    flight
                }
            }
        };

        match tokio::time::timeout(self.inner.config.renewal_timeout, flight).await {
            Ok(result) => result,
            Err(_) => Err(RenewalFailure::TimedOut),
        }
    }

    /// Spawn the refresh call so abandoning callers cannot cancel it.
    fn start_renewal(&self) -> Flight {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let result = inner.call_refresh().await;
            inner.finish_renewal(&result).await;
            result
        });
        async move { task.await.unwrap_or(Err(RenewalFailure::Aborted)) }
            .boxed()
            .shared()
    }
}

impl<T: ApiTransport> Inner<T> {
    async fn call_refresh(&self) -> RenewalResult {
        let request = ApiRequest::post(REFRESH_PATH, serde_json::json!({}));
        let response = self
            .transport
            .execute(&request)
            .await
            .map_err(|e| RenewalFailure::Network(e.to_string()))?;
        if !response.status.is_success() {
            return Err(RenewalFailure::Rejected(response.status));
        }
        profile_from(response).map_err(|e| RenewalFailure::Decode(e.to_string()))
    }

    async fn finish_renewal(&self, result: &RenewalResult) {
        let mut slot = self.renewal.lock().await;
        slot.generation += 1;
        slot.last = Some(result.clone());
        slot.in_flight = None;
        self.completed.store(slot.generation, Ordering::Release);

        if let Ok(profile) = result {
            debug!(generation = slot.generation, "session renewed");
            // An expiry already reported to the user stands.
            self.state.send_if_modified(|state| {
                if matches!(state, SessionState::Expired) {
                    false
                } else {
                    *state = SessionState::Authenticated(profile.clone());
                    true
                }
            });
        }
    }
}

fn profile_from(response: ApiResponse) -> Result<AdminProfile, ClientError> {
    let envelope: Envelope<AdminProfile> = response.json()?;
    envelope
        .data
        .ok_or_else(|| ClientError::Decode("response carries no profile".into()))
}
