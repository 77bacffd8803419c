//! Token freshness policy
//!
//! Decides whether a held access token may still be used. Deliberately
//! conservative: a token inside the safety margin of its expiry is treated
//! as stale, so a request started under a "fresh" token does not expire
//! mid-flight.

use chrono::{DateTime, Duration, Utc};

use crate::constants::DEFAULT_FRESHNESS_MARGIN_MINUTES;

/// Pure freshness check with a configurable safety margin.
///
/// `is_fresh(t)` holds iff `t > now + margin`. The default 45-minute margin
/// assumes the service's one-hour access token lifetime; deployments with
/// shorter-lived tokens should tune it down or nearly every call will refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    margin: Duration,
}

impl FreshnessPolicy {
    pub fn new(margin: Duration) -> Self {
        Self { margin }
    }

    /// Whether a token expiring at `expires_at` may still be used now.
    pub fn is_fresh(&self, expires_at: DateTime<Utc>) -> bool {
        self.is_fresh_at(expires_at, Utc::now())
    }

    /// Freshness relative to an explicit `now`, for deterministic tests.
    pub fn is_fresh_at(&self, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        expires_at > now + self.margin
    }

    pub fn margin(&self) -> Duration {
        self.margin
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_FRESHNESS_MARGIN_MINUTES))
    }
}
