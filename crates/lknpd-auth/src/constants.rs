//! Endpoint and request constants for the lknpd.nalog.ru API
//!
//! The service splits its auth surface across two API versions: everything
//! lives under `/api/v1` except the SMS challenge start, which is `/api/v2`.
//! The device constants mimic the official web client; the server rejects
//! login bodies without a plausible `deviceInfo`.

/// Main API base (login, refresh, verify, all authenticated calls)
pub const BASE_URL_V1: &str = "https://lknpd.nalog.ru/api/v1";

/// Second API base, used only by the SMS challenge start endpoint
pub const BASE_URL_V2: &str = "https://lknpd.nalog.ru/api/v2";

/// Password login (INN + password)
pub const LOGIN_PATH: &str = "/auth/lkfl";

/// Access token refresh
pub const REFRESH_PATH: &str = "/auth/token";

/// SMS challenge start (v2 base)
pub const CHALLENGE_START_PATH: &str = "/auth/challenge/sms/start";

/// SMS challenge verify (v1 base, despite start living on v2)
pub const CHALLENGE_VERIFY_PATH: &str = "/auth/challenge/sms/verify";

/// `sourceType` reported in device payloads
pub const SOURCE_TYPE: &str = "WEB";

/// `appVersion` reported in device payloads
pub const APP_VERSION: &str = "1.0.0";

/// Browser user agent reported in `metaDetails`
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/144.0.0.0 Safari/537.36 Edg/144.0.0.0";

/// `accept` header sent on every request
pub const ACCEPT: &str = "application/json, text/plain, */*";

/// `accept-language` header sent on every request
pub const ACCEPT_LANGUAGE: &str = "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7";

/// Access tokens live about an hour; a token within this margin of its
/// expiry is treated as stale so a request started under it cannot outlive it.
pub const DEFAULT_FRESHNESS_MARGIN_MINUTES: i64 = 45;

/// Length of a generated device identifier
pub const DEVICE_ID_LENGTH: usize = 22;
