//! Storefront backend REST client.
//!
//! # Architecture
//!
//! - One `reqwest::Client` shared behind an `Arc`; clones are cheap
//! - Every operation goes through [`ApiClient::send`], the single place that
//!   attaches the bearer token, tags the request with an `x-request-id`, and
//!   applies the authorization policy
//! - A 401 from any endpoint clears the session store and fires the
//!   [`LoginRedirect`] before the error reaches the caller
//! - Product reads are cached via `moka` (TTL from configuration) and
//!   invalidated when a product is created
//! - No automatic retries
//!
//! # Example
//!
//! ```rust,ignore
//! use shopfront_storefront::{ApiClient, ClientConfig};
//!
//! let api = ApiClient::from_config(&ClientConfig::from_env()?)?;
//! api.login(&email, &password).await?;
//! api.add_cart_item(ProductId::new(7), 1).await?;
//! let cart = api.get_cart().await?;
//! ```

mod auth;
mod cache;
mod cart;
mod orders;
mod products;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{Span, debug, error, instrument, warn};
use uuid::Uuid;

use crate::config::{ClientConfig, MAX_PRODUCT_CACHE_TTL};
use crate::error::ApiError;
use crate::session::{
    FileSessionStore, LogRedirect, LoginRedirect, MemorySessionStore, SessionCredential,
    SessionStore,
};

pub use auth::NewAccount;
pub use orders::OrderLineInput;
pub use products::{FormValue, ImageFile, NewProduct, ProductFilter, ProductImage};

use cache::{CacheKey, CacheValue};

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Upper bound on cached catalog entries.
const CACHE_CAPACITY: u64 = 1000;

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the storefront backend.
///
/// Holds the injected session store and login redirect; never touches global
/// state.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    session: Arc<dyn SessionStore>,
    redirect: Arc<dyn LoginRedirect>,
    cache: Option<Cache<CacheKey, CacheValue>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field("cache", &self.inner.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client with an explicit session store and login redirect.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(
        config: &ClientConfig,
        session: Arc<dyn SessionStore>,
        redirect: Arc<dyn LoginRedirect>,
    ) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let cache = config.product_cache_enabled().then(|| {
            Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(config.product_cache_ttl.min(MAX_PRODUCT_CACHE_TTL))
                .build()
        });

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                session,
                redirect,
                cache,
            }),
        })
    }

    /// Create a client whose session store follows the configuration
    /// (file-backed when `session_file` is set, in-memory otherwise) and whose
    /// login redirect only logs.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let session: Arc<dyn SessionStore> = match &config.session_file {
            Some(path) => Arc::new(FileSessionStore::new(path)),
            None => Arc::new(MemorySessionStore::new()),
        };
        Self::new(config, session, Arc::new(LogRedirect))
    }

    /// Backend base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// The stored session credential, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be read.
    pub fn current_session(&self) -> Result<Option<SessionCredential>, ApiError> {
        Ok(self.inner.session.get()?)
    }

    /// Whether a session credential is stored.
    ///
    /// An unreadable store counts as signed out.
    #[must_use]
    pub fn has_session(&self) -> bool {
        self.current_session().is_ok_and(|session| session.is_some())
    }

    // =========================================================================
    // Transport
    // =========================================================================

    /// Start a request against `path` (which must begin with `/`).
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.inner
            .client
            .request(method, format!("{}{path}", self.inner.base_url))
    }

    /// Execute a request with the cross-cutting policies applied.
    ///
    /// Attaches the bearer token when a readable session exists and a fresh
    /// request ID.
    /// Success responses are returned untouched. A 401 ends the session and
    /// fires the login redirect. Any other non-2xx becomes a typed error.
    #[instrument(skip(self, request), fields(request_id))]
    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let request_id = Uuid::new_v4().to_string();
        Span::current().record("request_id", &request_id);

        let mut request = request.header(REQUEST_ID_HEADER, &request_id);
        if let Some(credential) = self.stored_credential() {
            request = request.bearer_auth(credential.token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            debug!(status = %status, url = %response.url(), "Backend request succeeded");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            self.end_session();
        } else {
            error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Backend returned non-success status"
            );
        }

        Err(ApiError::from_status(status, &body))
    }

    /// The credential to send, if any. An unreadable store is discarded so a
    /// fresh login can replace it.
    fn stored_credential(&self) -> Option<SessionCredential> {
        match self.inner.session.get() {
            Ok(credential) => credential,
            Err(e) => {
                warn!(error = %e, "Session store unreadable, sending request without a credential");
                if let Err(e) = self.inner.session.clear() {
                    error!(error = %e, "Failed to clear unreadable session");
                }
                None
            }
        }
    }

    /// Tear down the session after an authorization failure.
    fn end_session(&self) {
        warn!("Backend rejected the session credential, clearing it");
        if let Err(e) = self.inner.session.clear() {
            error!(error = %e, "Failed to clear session after 401");
        }
        self.inner.redirect.redirect_to_login();
    }

    /// Send a request and decode its JSON body.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        let text = response.text().await?;

        serde_json::from_str(&text).map_err(|e| {
            error!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            ApiError::Decode {
                message: e.to_string(),
            }
        })
    }

    /// Send a request whose response body is irrelevant.
    async fn send_discard(&self, request: RequestBuilder) -> Result<(), ApiError> {
        self.send(request).await.map(drop)
    }

    // =========================================================================
    // Cache
    // =========================================================================

    async fn cache_get(&self, key: &CacheKey) -> Option<CacheValue> {
        let value = self.inner.cache.as_ref()?.get(key).await;
        if value.is_some() {
            debug!(key = ?key, "Cache hit");
        }
        value
    }

    async fn cache_put(&self, key: CacheKey, value: CacheValue) {
        if let Some(cache) = &self.inner.cache {
            cache.insert(key, value).await;
        }
    }

    /// Drop every cached catalog entry.
    pub fn invalidate_products(&self) {
        if let Some(cache) = &self.inner.cache {
            cache.invalidate_all();
        }
    }

    /// Configured product cache TTL, if caching is enabled.
    #[must_use]
    pub fn product_cache_ttl(&self) -> Option<Duration> {
        self.inner
            .cache
            .as_ref()
            .and_then(|cache| cache.policy().time_to_live())
    }
}
