//! API client: strategy selection, cached sessions, and the 401 retry
//!
//! `Client` is what the per-endpoint API layer calls. It picks the active
//! auth strategy once at construction (password when credentials were given,
//! SMS otherwise), consults the session cache before touching the network,
//! and wraps outbound calls in the single forced-refresh-and-retry on 401.
//!
//! Refreshes are serialized per client instance by a `tokio::sync::Mutex`:
//! when a batch of concurrent calls all hit 401 at once, one refresh runs and
//! the rest wait, instead of each clobbering the token with its own refresh.
//! The caller that takes the lock still performs its own forced rebuild even
//! if a waiter just finished one — refreshing twice is wasteful, never
//! incorrect.

use std::sync::Arc;

use chrono::Duration;
use lknpd_auth::{
    AuthStrategy, Credentials, FreshnessPolicy, PasswordAuth, Session, SmsAuth, Transport,
    TransportConfig, bearer_headers,
};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::Result;
use crate::storage::{AuthStorage, deserialize_session, serialize_session};

/// Client for the lknpd.nalog.ru API.
///
/// Construct through [`Client::builder`]. The endpoint layer issues calls via
/// [`Client::request`]; the SMS flow is driven explicitly through
/// [`Client::auth_by_sms`].
pub struct Client {
    transport: Arc<Transport>,
    password_auth: Option<PasswordAuth>,
    sms_auth: SmsAuth,
    storage: Option<Arc<dyn AuthStorage>>,
    storage_key: Option<String>,
    storage_ttl: Option<u64>,
    freshness: FreshnessPolicy,
    refresh_lock: Mutex<()>,
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    credentials: Option<Credentials>,
    transport: TransportConfig,
    storage: Option<Arc<dyn AuthStorage>>,
    storage_key: Option<String>,
    storage_ttl: Option<u64>,
    freshness_margin: Duration,
}

impl ClientBuilder {
    fn new() -> Self {
        Self {
            credentials: None,
            transport: TransportConfig::default(),
            storage: None,
            storage_key: None,
            storage_ttl: None,
            freshness_margin: FreshnessPolicy::default().margin(),
        }
    }

    /// Authenticate by INN and password. Without credentials the SMS flow
    /// is the active strategy.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Override the main API base URL (tests, alternate deployments).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.transport.base_url = base_url.into();
        self
    }

    /// Override the SMS challenge base URL.
    pub fn challenge_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.transport.challenge_base_url = base_url.into();
        self
    }

    /// Total per-request timeout (default 5 s).
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.transport.timeout = timeout;
        self
    }

    /// Connection establishment timeout (default 5 s).
    pub fn connect_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.transport.connect_timeout = timeout;
        self
    }

    /// Persist/restore the session through `storage` under `key`.
    pub fn storage(mut self, storage: Arc<dyn AuthStorage>, key: impl Into<String>) -> Self {
        self.storage = Some(storage);
        self.storage_key = Some(key.into());
        self
    }

    /// TTL in seconds for saved sessions (default: no expiry).
    pub fn storage_ttl(mut self, seconds: u64) -> Self {
        self.storage_ttl = Some(seconds);
        self
    }

    /// Safety margin of the token freshness check (default 45 minutes).
    pub fn freshness_margin(mut self, margin: Duration) -> Self {
        self.freshness_margin = margin;
        self
    }

    /// Build the client. Fails only if the HTTP client cannot be constructed.
    pub fn build(self) -> Result<Client> {
        let transport = Arc::new(Transport::new(self.transport)?);
        let freshness = FreshnessPolicy::new(self.freshness_margin);

        Ok(Client {
            password_auth: self
                .credentials
                .map(|c| PasswordAuth::new(Arc::clone(&transport), c, freshness)),
            sms_auth: SmsAuth::new(Arc::clone(&transport), freshness),
            transport,
            storage: self.storage,
            storage_key: self.storage_key,
            storage_ttl: self.storage_ttl,
            freshness,
            refresh_lock: Mutex::new(()),
        })
    }
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Password strategy, present when credentials were supplied.
    pub fn auth_by_password(&self) -> Option<&PasswordAuth> {
        self.password_auth.as_ref()
    }

    /// SMS strategy: `start_challenge(phone)`, then `verify_and_login(phone, code)`.
    pub fn auth_by_sms(&self) -> &SmsAuth {
        &self.sms_auth
    }

    /// Low-level transport shared with the strategies.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// The strategy chosen at construction, fixed for the client's lifetime.
    fn active_auth(&self) -> &dyn AuthStrategy {
        match &self.password_auth {
            Some(password) => password,
            None => &self.sms_auth,
        }
    }

    async fn load_cached_session(&self) -> Option<Session> {
        let storage = self.storage.as_ref()?;
        let key = self.storage_key.as_ref()?;
        let raw = storage.get(key).await?;
        deserialize_session(&raw)
    }

    async fn save_session(&self, session: &Session) {
        if let (Some(storage), Some(key)) = (&self.storage, &self.storage_key) {
            storage
                .set(key, serialize_session(session), self.storage_ttl)
                .await;
            debug!(key = %key, "session saved to storage");
        }
    }

    /// Bearer headers for an API call.
    ///
    /// Unless forcing, a fresh cached session answers directly — no network,
    /// no strategy involvement. Otherwise the active strategy logs in or
    /// refreshes as needed (a forced call on an existing session refreshes
    /// first), and whatever session results is written back to the cache.
    pub async fn authorization_headers(&self, force_refresh: bool) -> Result<HeaderMap> {
        if !force_refresh {
            if let Some(cached) = self.load_cached_session().await {
                if self.freshness.is_fresh(cached.token.access_expires_at) {
                    debug!("using cached session");
                    return Ok(bearer_headers(&cached.token.access_token)?);
                }
            }
        }

        let auth = self.active_auth();
        if force_refresh && auth.is_authenticated().await {
            auth.refresh_token().await?;
        }
        let headers = auth.authorization_headers().await?;

        if let Some(session) = auth.session().await {
            self.save_session(&session).await;
        }

        Ok(headers)
    }

    /// Issue an authenticated API call.
    ///
    /// On 401, takes the per-instance refresh lock, rebuilds headers with a
    /// forced refresh, and retries exactly once. The response is returned
    /// as-is either way — this method never raises on non-2xx statuses;
    /// interpreting them is the caller's job.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Response> {
        let headers = self.authorization_headers(false).await?;
        let mut response = self.send(method.clone(), path, headers, body).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(path, "got 401, refreshing token and retrying once");
            let _guard = self.refresh_lock.lock().await;
            let headers = self.authorization_headers(true).await?;
            response = self.send(method, path, headers, body).await?;
        }

        Ok(response)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
        body: Option<&Value>,
    ) -> Result<reqwest::Response> {
        let mut request = self
            .transport
            .raw()
            .request(method, self.transport.url(path))
            .headers(headers);
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }
}
