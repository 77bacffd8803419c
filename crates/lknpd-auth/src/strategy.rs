//! Authentication strategy contract and shared auth-endpoint plumbing
//!
//! The two login flows (password, SMS) share no state, only this contract
//! plus the refresh and response-decoding helpers below. Token refresh is
//! identical for both flows, so it operates on the session slot directly.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::debug;

use crate::constants::REFRESH_PATH;
use crate::device::DeviceInfo;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::transport::Transport;

/// One login flow against the service.
///
/// `authorization_headers` is the only entry point that may perform network
/// I/O as a side effect of "just getting headers"; callers must expect it to
/// suspend.
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    /// Current session, if a login has succeeded.
    async fn session(&self) -> Option<Session>;

    /// Whether a session exists at all (fresh or stale).
    async fn is_authenticated(&self) -> bool {
        self.session().await.is_some()
    }

    /// Whether the current access token is still usable under the freshness policy.
    async fn token_is_fresh(&self) -> bool;

    /// Exchange the refresh token for a new access token and return it.
    async fn refresh_token(&self) -> Result<String>;

    /// Ready-to-send `Authorization: Bearer ..` headers, logging in or
    /// refreshing first when the strategy's flow allows it.
    async fn authorization_headers(&self) -> Result<HeaderMap>;
}

/// `{Authorization: Bearer <token>}` header map.
pub fn bearer_headers(access_token: &str) -> Result<HeaderMap> {
    let value = HeaderValue::from_str(&format!("Bearer {access_token}"))
        .map_err(|e| Error::authorization_from("access token is not a valid header value", e))?;
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

/// Decode an auth-endpoint response, wrapping every failure mode.
///
/// Non-success statuses become `Error::Authorization` carrying the server's
/// `message` field when the body has one; undecodable bodies on a success
/// status are wrapped the same way with the parse error as cause.
pub(crate) async fn decode_auth_response(
    result: reqwest::Result<reqwest::Response>,
) -> Result<Value> {
    let response = result.map_err(|e| Error::authorization_from("auth request failed", e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.json::<Value>().await.ok();
        let message = auth_error_message(body.as_ref());
        return Err(Error::authorization(format!(
            "auth endpoint returned {status}: {message}"
        )));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| Error::authorization_from("malformed JSON in auth response", e))
}

/// Error message from an auth failure body, `"Unknown"` when absent.
fn auth_error_message(body: Option<&Value>) -> String {
    body.and_then(|b| b.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_owned()
}

/// Exchange the refresh token held in `slot` for a new access token.
///
/// On success the stored session is replaced wholesale with a copy carrying
/// the new access token; concurrent readers never observe a partial update.
/// Two overlapping calls may both refresh — wasteful but never incorrect,
/// since each replacement is a complete valid session. The orchestrator
/// serializes forced refreshes with its own lock.
pub(crate) async fn refresh_session(
    transport: &Transport,
    device: &DeviceInfo,
    slot: &RwLock<Option<Session>>,
) -> Result<String> {
    let session = slot
        .read()
        .await
        .clone()
        .ok_or_else(|| Error::MissingAccessToken("no session to refresh".into()))?;

    let body = json!({
        "deviceInfo": device,
        "refreshToken": session.token.refresh_token,
    });
    let data = decode_auth_response(transport.post(REFRESH_PATH, &body).await).await?;

    let new_token = data
        .get("token")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            Error::MissingAccessToken("refresh response did not include a token".into())
        })?;

    *slot.write().await = Some(session.with_access_token(new_token));
    debug!("access token refreshed");
    Ok(new_token.to_owned())
}
