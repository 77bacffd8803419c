//! Credentials, tokens, and authenticated session state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Username (INN) and password, supplied once at construction and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Access/refresh token pair with expiry instants.
///
/// Field renames follow the wire shape of the login response, so this type
/// deserializes straight off `/auth/lkfl` and `/auth/challenge/sms/verify`
/// bodies. Both token strings are non-empty once a `Token` exists; response
/// decoding enforces this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    #[serde(rename = "token")]
    pub access_token: String,
    #[serde(rename = "tokenExpireIn")]
    pub access_expires_at: DateTime<Utc>,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    #[serde(
        rename = "refreshTokenExpiresIn",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_expires_at: Option<DateTime<Utc>>,
}

impl Token {
    /// Copy of this token with only the access token string replaced.
    ///
    /// The refresh token and both expiries are preserved; a refresh response
    /// carries no new expiry, so the original one keeps governing freshness.
    pub fn with_access_token(&self, access_token: impl Into<String>) -> Token {
        Token {
            access_token: access_token.into(),
            ..self.clone()
        }
    }
}

/// Authenticated identity plus its current token pair.
///
/// Replaced wholesale on refresh (value replacement, never in-place mutation),
/// so concurrent readers never observe a half-updated token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Tax identifier (ИНН) of the authenticated subject
    pub inn: String,
    pub token: Token,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Session {
    /// Decode a session from a login/verify response body.
    ///
    /// The token fields sit at the top level of the response next to a
    /// `profile` object. A missing profile degrades to an empty inn; missing
    /// or empty token fields are an error.
    pub(crate) fn from_login_response(data: &Value) -> Result<Session> {
        let token: Token = serde_json::from_value(data.clone())
            .map_err(|e| Error::authorization_from("unexpected auth response shape", e))?;
        if token.access_token.is_empty() || token.refresh_token.is_empty() {
            return Err(Error::authorization("auth response contains an empty token"));
        }

        let profile = data.get("profile");
        Ok(Session {
            inn: profile
                .and_then(|p| p.get("inn"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
            display_name: profile
                .and_then(|p| p.get("displayName"))
                .and_then(Value::as_str)
                .map(str::to_owned),
            token,
        })
    }

    /// Copy of this session with only the access token replaced.
    pub fn with_access_token(&self, access_token: impl Into<String>) -> Session {
        Session {
            token: self.token.with_access_token(access_token),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn login_response() -> Value {
        json!({
            "profile": {"inn": "770000000000", "displayName": "Test User"},
            "token": "at_abc",
            "tokenExpireIn": "2026-08-30T12:00:00Z",
            "refreshToken": "rt_def",
            "refreshTokenExpiresIn": "2026-09-30T12:00:00Z",
        })
    }

    #[test]
    fn decodes_login_response() {
        let session = Session::from_login_response(&login_response()).unwrap();
        assert_eq!(session.inn, "770000000000");
        assert_eq!(session.display_name.as_deref(), Some("Test User"));
        assert_eq!(session.token.access_token, "at_abc");
        assert_eq!(session.token.refresh_token, "rt_def");
        assert!(session.token.refresh_expires_at.is_some());
    }

    #[test]
    fn missing_profile_degrades_to_empty_inn() {
        let mut data = login_response();
        data.as_object_mut().unwrap().remove("profile");
        let session = Session::from_login_response(&data).unwrap();
        assert_eq!(session.inn, "");
        assert_eq!(session.display_name, None);
    }

    #[test]
    fn missing_token_field_is_an_error() {
        let mut data = login_response();
        data.as_object_mut().unwrap().remove("refreshToken");
        let err = Session::from_login_response(&data).unwrap_err();
        assert!(matches!(err, Error::Authorization { .. }));
    }

    #[test]
    fn empty_token_is_an_error() {
        let mut data = login_response();
        data["token"] = json!("");
        let err = Session::from_login_response(&data).unwrap_err();
        assert!(matches!(err, Error::Authorization { .. }));
    }

    #[test]
    fn with_access_token_replaces_only_the_access_token() {
        let session = Session::from_login_response(&login_response()).unwrap();
        let updated = session.with_access_token("at_new");

        assert_eq!(updated.token.access_token, "at_new");
        assert_eq!(updated.token.refresh_token, session.token.refresh_token);
        assert_eq!(updated.token.access_expires_at, session.token.access_expires_at);
        assert_eq!(updated.inn, session.inn);
        assert_eq!(updated.display_name, session.display_name);
    }

    #[test]
    fn token_serde_roundtrip_uses_wire_names() {
        let session = Session::from_login_response(&login_response()).unwrap();
        let value = serde_json::to_value(&session.token).unwrap();
        assert_eq!(value["token"], "at_abc");
        assert_eq!(value["refreshToken"], "rt_def");
        assert!(value.get("tokenExpireIn").is_some());

        let back: Token = serde_json::from_value(value).unwrap();
        assert_eq!(back, session.token);
    }
}
