//! simq HTTP Client
//!
//! A small, typed HTTP client for the remote quantitative-research API.
//!
//! The client owns the session: it signs in lazily, keeps the session cookie,
//! and when a request comes back `401 Unauthorized` it signs in again and
//! replays the request. Callers only ever see the final outcome.
//!
//! # Example
//!
//! ```no_run
//! use simq_client::{BrainClient, Credentials};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = BrainClient::new(
//!         "https://api.worldquantbrain.com",
//!         Credentials::new("user@example.com", "secret"),
//!     )?;
//!
//!     let alpha = client.get_alpha("w2zl935").await?;
//!     println!("Alpha {} is {:?}", alpha.id, alpha.status);
//!     Ok(())
//! }
//! ```

pub mod error;
mod alphas;
mod fields;
mod simulations;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use simulations::SimulationProgress;

use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Default base URL of the research API
pub const DEFAULT_API_URL: &str = "https://api.worldquantbrain.com";

/// Default number of replays after an expired session or a dropped connection
pub const DEFAULT_RETRY_TIMES: u32 = 3;

/// Sign-in credentials
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// HTTP client for the research API
///
/// Cheap to clone; clones share the session.
#[derive(Debug, Clone)]
pub struct BrainClient {
    /// Base URL of the API (e.g., "https://api.worldquantbrain.com")
    base_url: String,
    /// HTTP client instance, holds the session cookie
    client: Client,
    credentials: Credentials,
    retry_times: u32,
    /// Bumped on every successful sign-in; 0 means never signed in
    session: Arc<AtomicU64>,
    /// Serializes sign-ins so concurrent 401s renew the session once
    sign_in: Arc<Mutex<()>>,
}

impl BrainClient {
    /// Create a new client with a cookie-keeping HTTP client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the API
    /// * `credentials` - Account used to sign in
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Result<Self> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Self::with_client(base_url, credentials, client))
    }

    /// Create a new client with a custom HTTP client
    ///
    /// The given client must keep cookies, otherwise every request after
    /// sign-in is rejected.
    pub fn with_client(
        base_url: impl Into<String>,
        credentials: Credentials,
        client: Client,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            credentials,
            retry_times: DEFAULT_RETRY_TIMES,
            session: Arc::new(AtomicU64::new(0)),
            sign_in: Arc::new(Mutex::new(())),
        }
    }

    /// Set how many times a request is replayed after a 401 or a dropped connection
    pub fn with_retry_times(mut self, retry_times: u32) -> Self {
        self.retry_times = retry_times;
        self
    }

    /// Get the base URL of the API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an absolute URL from an API path or pass an absolute URL through
    pub(crate) fn url(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            path_or_url.to_string()
        } else {
            format!(
                "{}/{}",
                self.base_url,
                path_or_url.trim_start_matches('/')
            )
        }
    }

    // =============================================================================
    // Session
    // =============================================================================

    /// Sign in with the configured credentials
    pub async fn authenticate(&self) -> Result<()> {
        let seen = self.session.load(Ordering::Acquire);
        self.renew_session(seen).await
    }

    /// Signs in unless another task already renewed the session seen as `seen`
    async fn renew_session(&self, seen: u64) -> Result<()> {
        let _guard = self.sign_in.lock().await;

        if self.session.load(Ordering::Acquire) != seen {
            debug!("Session already renewed by another request");
            return Ok(());
        }

        let url = self.url("authentication");
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.credentials.user, Some(&self.credentials.password))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::Authentication {
                status: status.as_u16(),
                message,
            });
        }

        self.session.fetch_add(1, Ordering::AcqRel);
        info!("Signed in as {}", self.credentials.user);
        Ok(())
    }

    /// Send a request inside the session
    ///
    /// Signs in first if needed. A `401` renews the session and replays the
    /// request; a connection failure replays it as well. Both are bounded by
    /// `retry_times`, after which the last response or error is returned.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response> {
        if self.session.load(Ordering::Acquire) == 0 {
            self.renew_session(0).await?;
        }

        let mut attempt = 0;
        loop {
            let seen = self.session.load(Ordering::Acquire);
            let replay = request.try_clone().ok_or_else(|| {
                ClientError::InvalidRequest("request body cannot be replayed".to_string())
            })?;

            match replay.send().await {
                Ok(response)
                    if response.status() == StatusCode::UNAUTHORIZED
                        && attempt < self.retry_times =>
                {
                    debug!("Session expired, signing in again");
                    self.renew_session(seen).await?;
                }
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.retry_times && (e.is_connect() || e.is_timeout()) => {
                    warn!(
                        "Request failed (attempt {}/{}): {}",
                        attempt + 1,
                        self.retry_times + 1,
                        e
                    );
                }
                Err(e) => return Err(e.into()),
            }

            attempt += 1;
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Map a non-success status to an error, passing successful responses through
    pub(crate) async fn check_status(&self, response: Response) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let hint = rate_limit_hint(status, response.headers());
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Authentication {
                status: status.as_u16(),
                message: error_text,
            });
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ClientError::RateLimited {
                retry_after: hint,
                message: error_text,
            });
        }

        Err(ClientError::api_error(status.as_u16(), error_text))
    }

    /// Handle an API response and deserialize JSON
    pub(crate) async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let response = self.check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}

/// The `Retry-After` of a throttled response
///
/// A malformed hint on an error response is dropped rather than turned into
/// a protocol error; the caller falls back to its own backoff.
fn rate_limit_hint(status: StatusCode, headers: &HeaderMap) -> Option<Duration> {
    if status != StatusCode::TOO_MANY_REQUESTS {
        return None;
    }

    match simulations::retry_after(headers) {
        Ok(hint) => hint,
        Err(e) => {
            debug!("Ignoring rate-limit hint: {}", e);
            None
        }
    }
}
