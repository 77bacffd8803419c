//! Phone + SMS one-time-code login strategy
//!
//! Two-phase: `start_challenge` asks the service to text a code,
//! `verify_and_login` trades the code for a session. The two calls may run in
//! different processes (a stateless web handler answering two separate user
//! requests), so no in-memory continuity is assumed: the challenge token is
//! returned to the caller, who can pass it back explicitly at verify time.
//!
//! Unlike [`PasswordAuth`](crate::password::PasswordAuth), there is no
//! password to silently retry with, so `authorization_headers` never logs in
//! implicitly; it fails when unauthenticated.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::{Value, json};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::constants::{CHALLENGE_START_PATH, CHALLENGE_VERIFY_PATH, SOURCE_TYPE};
use crate::device::DeviceInfo;
use crate::error::{Error, Result};
use crate::freshness::FreshnessPolicy;
use crate::session::Session;
use crate::strategy::{AuthStrategy, bearer_headers, decode_auth_response, refresh_session};
use crate::transport::Transport;

/// Pending challenge between start and verify. Single slot: each new
/// `start_challenge` overwrites it, a successful verify clears it.
#[derive(Debug, Clone)]
struct ChallengeState {
    phone: String,
    challenge_token: String,
}

/// Login by phone number and the code from an SMS.
pub struct SmsAuth {
    transport: Arc<Transport>,
    device: DeviceInfo,
    policy: FreshnessPolicy,
    session: RwLock<Option<Session>>,
    challenge: Mutex<Option<ChallengeState>>,
}

impl SmsAuth {
    /// Create a strategy with a fresh device identity.
    pub fn new(transport: Arc<Transport>, policy: FreshnessPolicy) -> Self {
        Self {
            transport,
            device: DeviceInfo::default(),
            policy,
            session: RwLock::new(None),
            challenge: Mutex::new(None),
        }
    }

    /// Ask the service to send an SMS code. Returns the challenge token the
    /// verify step will need.
    ///
    /// `require_active_taxpayer` makes the service reject phones without an
    /// active self-employment registration (the service default).
    pub async fn start_challenge(&self, phone: &str, require_active_taxpayer: bool) -> Result<String> {
        let body = json!({
            "phone": phone,
            "requireTpToBeActive": require_active_taxpayer,
            "deviceData": {"sourceType": SOURCE_TYPE},
        });
        let data =
            decode_auth_response(self.transport.post_challenge(CHALLENGE_START_PATH, &body).await)
                .await?;

        let token = data
            .get("challengeToken")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                Error::SmsChallenge("challenge start response did not include challengeToken".into())
            })?;

        *self.challenge.lock().await = Some(ChallengeState {
            phone: phone.to_owned(),
            challenge_token: token.to_owned(),
        });
        info!(phone, "sms challenge started");
        Ok(token.to_owned())
    }

    /// Verify the SMS code and establish a session.
    ///
    /// An explicitly passed `challenge_token` always wins over the one stored
    /// by the last `start_challenge` on this instance; pass it explicitly when
    /// start and verify run in different processes.
    pub async fn verify_and_login(
        &self,
        phone: &str,
        code: &str,
        challenge_token: Option<&str>,
    ) -> Result<Session> {
        let token = match challenge_token {
            Some(token) => token.to_owned(),
            None => {
                let challenge = self.challenge.lock().await;
                let state = challenge.as_ref().ok_or_else(|| {
                    Error::SmsChallenge(
                        "no challenge token: pass one explicitly or call start_challenge first"
                            .into(),
                    )
                })?;
                if state.phone != phone {
                    warn!(
                        started = %state.phone,
                        verifying = %phone,
                        "verifying a different phone than the stored challenge was started for"
                    );
                }
                state.challenge_token.clone()
            }
        };

        let body = json!({
            "phone": phone,
            "code": code,
            "challengeToken": token,
            "deviceInfo": self.device,
        });
        let data =
            decode_auth_response(self.transport.post(CHALLENGE_VERIFY_PATH, &body).await).await?;
        let session = Session::from_login_response(&data)?;

        *self.session.write().await = Some(session.clone());
        *self.challenge.lock().await = None;
        info!(inn = %session.inn, "sms login verified");
        Ok(session)
    }
}

#[async_trait]
impl AuthStrategy for SmsAuth {
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
            return Err(Error::authorization(
                "no session: call start_challenge(phone), then verify_and_login(phone, code)",
            ));
        }
        if !self.token_is_fresh().await {
            self.refresh_token().await?;
        }

        let session = self
            .session()
            .await
            .ok_or_else(|| Error::authorization("no session after refresh"))?;
        bearer_headers(&session.token.access_token)
    }
}
