//! Per-session device identity
//!
//! Every login, refresh, and verify call carries a `deviceInfo` payload that
//! stands in for a browser fingerprint. The identifier is generated once per
//! strategy instance and reused for that strategy's lifetime, so the service
//! sees one consistent "device" per client.

use rand::RngExt;
use serde::Serialize;

use crate::constants::{APP_VERSION, DEVICE_ID_LENGTH, SOURCE_TYPE, USER_AGENT};

const DEVICE_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a random 22-character device identifier.
///
/// Drawn uniformly from lowercase ASCII letters and digits using the
/// thread-local CSPRNG. The id is sent to the remote service as a
/// pseudo-device identity, so it must not be predictable or collide
/// across concurrent clients.
pub fn generate_device_id() -> String {
    let mut rng = rand::rng();
    (0..DEVICE_ID_LENGTH)
        .map(|_| DEVICE_ID_ALPHABET[rng.random_range(0..DEVICE_ID_ALPHABET.len())] as char)
        .collect()
}

/// Device payload attached to auth requests.
///
/// Serializes to the wire shape the service expects:
/// `{"sourceDeviceId":..,"sourceType":"WEB","appVersion":"1.0.0","metaDetails":{"userAgent":..}}`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub source_device_id: String,
    pub source_type: String,
    pub app_version: String,
    pub meta_details: MetaDetails,
}

/// Nested `metaDetails` object of the device payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaDetails {
    pub user_agent: String,
}

impl DeviceInfo {
    /// Build a device payload, generating a random id when none is given.
    pub fn new(device_id: Option<String>) -> Self {
        Self {
            source_device_id: device_id.unwrap_or_else(generate_device_id),
            source_type: SOURCE_TYPE.to_owned(),
            app_version: APP_VERSION.to_owned(),
            meta_details: MetaDetails {
                user_agent: USER_AGENT.to_owned(),
            },
        }
    }
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_id_has_fixed_length() {
        assert_eq!(generate_device_id().len(), DEVICE_ID_LENGTH);
    }

    #[test]
    fn device_id_uses_lowercase_alphanumeric_alphabet() {
        let id = generate_device_id();
        assert!(
            id.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()),
            "unexpected character in device id: {id}"
        );
    }

    #[test]
    fn consecutive_device_ids_are_distinct() {
        let ids: Vec<String> = (0..10).map(|_| generate_device_id()).collect();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b, "two generated device ids must not collide");
            }
        }
    }

    #[test]
    fn explicit_device_id_is_kept() {
        let device = DeviceInfo::new(Some("my-device-id".into()));
        assert_eq!(device.source_device_id, "my-device-id");
    }

    #[test]
    fn serializes_to_wire_shape() {
        let device = DeviceInfo::new(Some("abc123".into()));
        let value = serde_json::to_value(&device).unwrap();
        assert_eq!(value["sourceDeviceId"], "abc123");
        assert_eq!(value["sourceType"], "WEB");
        assert_eq!(value["appVersion"], "1.0.0");
        assert!(value["metaDetails"]["userAgent"].as_str().unwrap().starts_with("Mozilla/5.0"));
    }
}
