//! Username/password login strategy
//!
//! Authenticates with the INN and password supplied at construction.
//! State machine: Unauthenticated → Authenticated(fresh) → Authenticated(stale)
//! → refreshed back to fresh. `authorization_headers` drives the transitions
//! implicitly, so holding a `PasswordAuth` is enough to keep a session alive.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::info;

use crate::constants::LOGIN_PATH;
use crate::device::DeviceInfo;
use crate::error::{Error, Result};
use crate::freshness::FreshnessPolicy;
use crate::session::{Credentials, Session};
use crate::strategy::{AuthStrategy, bearer_headers, decode_auth_response, refresh_session};
use crate::transport::Transport;

/// Login by INN and password.
pub struct PasswordAuth {
    transport: Arc<Transport>,
    credentials: Credentials,
    device: DeviceInfo,
    policy: FreshnessPolicy,
    session: RwLock<Option<Session>>,
}

impl PasswordAuth {
    /// Create a strategy with a fresh device identity.
    pub fn new(transport: Arc<Transport>, credentials: Credentials, policy: FreshnessPolicy) -> Self {
        Self {
            transport,
            credentials,
            device: DeviceInfo::default(),
            policy,
            session: RwLock::new(None),
        }
    }

    /// Log in with the stored credentials and keep the resulting session.
    pub async fn obtain_token(&self) -> Result<Session> {
        let body = json!({
            "deviceInfo": self.device,
            "username": self.credentials.username,
            "password": self.credentials.password,
        });
        let data = decode_auth_response(self.transport.post(LOGIN_PATH, &body).await).await?;
        let session = Session::from_login_response(&data)?;

        *self.session.write().await = Some(session.clone());
        info!(inn = %session.inn, "password login succeeded");
        Ok(session)
    }
}

#[async_trait]
impl AuthStrategy for PasswordAuth {
    async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    async fn token_is_fresh(&self) -> bool {
        match self.session.read().await.as_ref() {
            Some(session) => self.policy.is_fresh(session.token.access_expires_at),
            None => false,
        }
    }

    async fn refresh_token(&self) -> Result<String> {
        refresh_session(&self.transport, &self.device, &self.session).await
    }

    async fn authorization_headers(&self) -> Result<HeaderMap> {
        if !self.is_authenticated().await {
            self.obtain_token().await?;
        }
        if !self.token_is_fresh().await {
            self.refresh_token().await?;
        }

        let session = self
            .session()
            .await
            .ok_or_else(|| Error::authorization("no session after login/refresh"))?;
        bearer_headers(&session.token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportConfig;
    use anyhow::anyhow;
    use chrono::{Duration, Utc};
    use reqwest::header::AUTHORIZATION;
    use serde_json::{Value, json};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn auth_response(expires_in: Duration) -> Value {
        json!({
            "profile": {"inn": "770000000000", "displayName": "Test"},
            "token": "at_first",
            "tokenExpireIn": (Utc::now() + expires_in).to_rfc3339(),
            "refreshToken": "rt_first",
        })
    }

    async fn strategy(server: &MockServer) -> PasswordAuth {
        let transport = Transport::new(TransportConfig {
            base_url: server.uri(),
            challenge_base_url: server.uri(),
            ..TransportConfig::default()
        })
        .unwrap();
        PasswordAuth::new(
            Arc::new(transport),
            Credentials::new("770000000000", "secret"),
            FreshnessPolicy::default(),
        )
    }

    #[tokio::test]
    async fn obtain_token_stores_session() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/lkfl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_response(Duration::hours(1))))
            .expect(1)
            .mount(&server)
            .await;

        let auth = strategy(&server).await;
        let session = auth.obtain_token().await?;

        assert_eq!(session.inn, "770000000000");
        assert_eq!(session.token.access_token, "at_first");
        assert!(auth.is_authenticated().await);
        assert!(auth.token_is_fresh().await);
        Ok(())
    }

    #[tokio::test]
    async fn login_body_carries_device_and_credentials() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/lkfl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_response(Duration::hours(1))))
            .mount(&server)
            .await;

        strategy(&server).await.obtain_token().await?;

        let requests = server.received_requests().await.ok_or_else(|| anyhow!("no requests"))?;
        let body: Value = serde_json::from_slice(&requests[0].body)?;
        assert_eq!(body["username"], "770000000000");
        assert_eq!(body["password"], "secret");
        assert_eq!(body["deviceInfo"]["sourceType"], "WEB");
        assert_eq!(
            body["deviceInfo"]["sourceDeviceId"].as_str().unwrap().len(),
            22
        );
        Ok(())
    }

    #[tokio::test]
    async fn headers_auto_obtain_with_exactly_one_login() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/lkfl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_response(Duration::hours(1))))
            .expect(1)
            .mount(&server)
            .await;

        let auth = strategy(&server).await;
        let headers = auth.authorization_headers().await?;

        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer at_first");
        Ok(())
    }

    #[tokio::test]
    async fn refresh_replaces_only_the_access_token() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/lkfl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_response(Duration::hours(1))))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "at_new"})))
            .expect(1)
            .mount(&server)
            .await;

        let auth = strategy(&server).await;
        auth.obtain_token().await?;

        let new_token = auth.refresh_token().await?;
        assert_eq!(new_token, "at_new");

        let session = auth.session().await.ok_or_else(|| anyhow!("no session"))?;
        assert_eq!(session.token.access_token, "at_new");
        assert_eq!(session.token.refresh_token, "rt_first");
        assert_eq!(session.inn, "770000000000");
        Ok(())
    }

    #[tokio::test]
    async fn refresh_request_carries_the_refresh_token() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/lkfl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_response(Duration::hours(1))))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "at_new"})))
            .mount(&server)
            .await;

        let auth = strategy(&server).await;
        auth.obtain_token().await?;
        auth.refresh_token().await?;

        let requests = server.received_requests().await.ok_or_else(|| anyhow!("no requests"))?;
        let refresh: &Request = requests
            .iter()
            .find(|r| r.url.path() == "/auth/token")
            .ok_or_else(|| anyhow!("no refresh request"))?;
        let body: Value = serde_json::from_slice(&refresh.body)?;
        assert_eq!(body["refreshToken"], "rt_first");
        assert!(body["deviceInfo"]["sourceDeviceId"].is_string());
        Ok(())
    }

    #[tokio::test]
    async fn refresh_without_session_is_missing_access_token() {
        let server = MockServer::start().await;
        let auth = strategy(&server).await;

        let err = auth.refresh_token().await.unwrap_err();
        assert!(matches!(err, Error::MissingAccessToken(_)), "got: {err}");
    }

    #[tokio::test]
    async fn refresh_response_without_token_is_missing_access_token() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/lkfl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_response(Duration::hours(1))))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let auth = strategy(&server).await;
        auth.obtain_token().await?;

        let err = auth.refresh_token().await.unwrap_err();
        assert!(matches!(err, Error::MissingAccessToken(_)), "got: {err}");
        Ok(())
    }

    #[tokio::test]
    async fn server_error_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/lkfl"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "Bad creds"})),
            )
            .mount(&server)
            .await;

        let auth = strategy(&server).await;
        let err = auth.obtain_token().await.unwrap_err();

        assert!(matches!(err, Error::Authorization { .. }), "got: {err}");
        assert!(err.to_string().contains("Bad creds"), "got: {err}");
    }

    #[tokio::test]
    async fn unexpected_response_shape_is_authorization_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/lkfl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
            .mount(&server)
            .await;

        let auth = strategy(&server).await;
        let err = auth.obtain_token().await.unwrap_err();
        assert!(matches!(err, Error::Authorization { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn stale_session_refreshes_on_header_build() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        // Expires within the 45-minute margin, so it is immediately stale
        Mock::given(method("POST"))
            .and(path("/auth/lkfl"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(auth_response(Duration::minutes(5))),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "at_new"})))
            .expect(1)
            .mount(&server)
            .await;

        let auth = strategy(&server).await;
        let headers = auth.authorization_headers().await?;

        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer at_new");
        Ok(())
    }
}
