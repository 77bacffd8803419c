//! Client for the lknpd.nalog.ru ("Мой налог") API
//!
//! Sits on top of [`lknpd_auth`] and adds what a long-running service needs
//! around it: session caching through a pluggable key-value store, automatic
//! strategy selection, and the single forced-refresh-and-retry on 401.
//!
//! Request flow:
//! 1. Caller issues [`Client::request`] with method, path, and optional body
//! 2. Headers come from the cache (fresh session) or the active strategy
//!    (login/refresh as needed); the resulting session is saved back
//! 3. The call goes out; a 401 answer takes the per-client refresh lock,
//!    forces a refresh, and retries exactly once
//! 4. The response is returned untouched — status interpretation belongs to
//!    the endpoint layer, not this crate

pub mod client;
pub mod error;
pub mod storage;

pub use client::{Client, ClientBuilder};
pub use error::{Error, Result};
pub use storage::{AuthStorage, MemoryStorage, deserialize_session, serialize_session};

// Auth-layer types callers need when driving the strategies directly
pub use lknpd_auth::{AuthStrategy, Credentials, FreshnessPolicy, Session, Token};
