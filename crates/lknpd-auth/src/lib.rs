//! Authentication for the lknpd.nalog.ru ("Мой налог") API
//!
//! Implements the service's two login flows and the session state they
//! maintain. This crate is a standalone library with no dependency on the
//! API client — it can be tested and used independently.
//!
//! Session flow:
//! 1. Pick a strategy: [`PasswordAuth`] (INN + password) or [`SmsAuth`]
//!    (phone + one-time code, two-phase)
//! 2. The strategy logs in, decodes the response into a [`Session`]
//! 3. [`AuthStrategy::authorization_headers`] hands out `Bearer` headers,
//!    refreshing through `/auth/token` when the access token goes stale
//!    per [`FreshnessPolicy`]
//! 4. The orchestrating client persists/restores the [`Session`] as it
//!    sees fit; both types serialize with serde

pub mod constants;
pub mod device;
pub mod error;
pub mod freshness;
pub mod password;
pub mod session;
pub mod sms;
pub mod strategy;
pub mod transport;

pub use device::{DeviceInfo, MetaDetails, generate_device_id};
pub use error::{Error, Result};
pub use freshness::FreshnessPolicy;
pub use password::PasswordAuth;
pub use session::{Credentials, Session, Token};
pub use sms::SmsAuth;
pub use strategy::{AuthStrategy, bearer_headers};
pub use transport::{Transport, TransportConfig};
