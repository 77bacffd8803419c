//! Error types for authentication operations
//!
//! Transport and parse failures never cross the crate boundary as their raw
//! types; they are wrapped into [`Error::Authorization`] with the original
//! error preserved as the source for diagnostics.

/// Boxed cause attached to authorization failures.
type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors from login, refresh, and challenge operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Login/refresh/verify failed: transport error, non-success status,
    /// malformed JSON, or an unexpected response shape.
    #[error("authorization failed: {message}")]
    Authorization {
        message: String,
        #[source]
        source: Option<Cause>,
    },

    /// Refresh attempted with no prior session, or the refresh response
    /// omitted the new access token.
    #[error("access token unavailable: {0}")]
    MissingAccessToken(String),

    /// Challenge start returned no challenge token, or verify was called
    /// without a usable one.
    #[error("SMS challenge failed: {0}")]
    SmsChallenge(String),
}

impl Error {
    pub(crate) fn authorization(message: impl Into<String>) -> Self {
        Error::Authorization {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn authorization_from(message: impl Into<String>, source: impl Into<Cause>) -> Self {
        Error::Authorization {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
