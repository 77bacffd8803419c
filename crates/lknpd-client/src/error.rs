//! Error types for client operations

/// Errors from authenticated API calls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Login, refresh, or challenge failure from the active auth strategy.
    #[error("authentication failed: {0}")]
    Auth(#[from] lknpd_auth::Error),

    /// Wire failure of the outer API call itself (the call whose headers
    /// were already built). Non-2xx responses are NOT errors — they are
    /// returned to the caller as responses.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
