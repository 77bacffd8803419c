//! Session persistence through an external key-value store
//!
//! The client optionally saves its session to a shared cache (typically
//! Redis) so a new process handling the next request resumes without
//! re-authenticating. The cache is a shared resource with no locking
//! discipline: multiple client instances may race to write it and the last
//! write wins. That race is accepted — a stale entry momentarily masking a
//! newer token self-corrects, because any client that finds its cached token
//! unusable falls through to a network refresh.
//!
//! This crate owns the serialization format of the cache slot. Nothing else
//! should write it.

use std::collections::HashMap;

use async_trait::async_trait;
use lknpd_auth::Session;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tracing::debug;

/// Minimal capability interface over a key-value cache with TTL.
///
/// Implementations map their own backend failures to `None`/no-op: a broken
/// or unreachable cache must never break the request path, it only costs a
/// re-login.
#[async_trait]
pub trait AuthStorage: Send + Sync {
    /// Value stored under `key`, or `None` when absent, expired, or unreadable.
    async fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store `value` under `key`. `ttl_seconds = None` stores without expiry.
    async fn set(&self, key: &str, value: Vec<u8>, ttl_seconds: Option<u64>);
}

/// In-process [`AuthStorage`] for tests and single-process deployments.
///
/// TTLs are enforced lazily at read time. Uses `tokio::time::Instant` so
/// paused-clock tests can advance time deterministically.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, (Vec<u8>, Option<Instant>)>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((_, Some(deadline))) if Instant::now() >= *deadline => {
                entries.remove(key);
                None
            }
            Some((value, _)) => Some(value.clone()),
            None => None,
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl_seconds: Option<u64>) {
        let deadline = ttl_seconds.map(|secs| Instant::now() + Duration::from_secs(secs));
        self.entries
            .lock()
            .await
            .insert(key.to_owned(), (value, deadline));
    }
}

/// Serialize a session for the cache slot.
pub fn serialize_session(session: &Session) -> Vec<u8> {
    // Serialization of these plain types cannot fail; an empty payload would
    // simply decode to None on the next read
    serde_json::to_vec(session).unwrap_or_default()
}

/// Decode a cached session.
///
/// Malformed payloads, missing fields, and wrong types all yield `None`:
/// a corrupt or stale cache entry triggers a fresh login, never an error.
pub fn deserialize_session(payload: &[u8]) -> Option<Session> {
    match serde_json::from_slice(payload) {
        Ok(session) => Some(session),
        Err(e) => {
            debug!(error = %e, "discarding undecodable cached session");
            None
        }
    }
}
