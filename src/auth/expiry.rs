// Expiry normalization and token state classification

use chrono::Utc;

use super::types::{CredentialRecord, TokenState};

/// Expiries above this value are in milliseconds
pub const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Access tokens expiring within this many seconds are treated as stale
pub const DEFAULT_REFRESH_MARGIN: i64 = 60 * 60 * 24;

/// Largest accepted refresh margin (one year)
pub const MAX_REFRESH_MARGIN: i64 = 60 * 60 * 24 * 365;

/// Normalize an expiry timestamp to whole seconds
///
/// Values above [`MILLIS_THRESHOLD`] are millisecond timestamps and are
/// divided down, rounding half up.
pub fn normalize_expiry(expires_at: i64) -> i64 {
    if expires_at > MILLIS_THRESHOLD {
        expires_at / 1000 + i64::from(expires_at % 1000 >= 500)
    } else {
        expires_at
    }
}

/// Current time in whole seconds since the epoch
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Classify a stored record at `now`
///
/// `record` must already be normalized.
pub fn classify(record: &CredentialRecord, now: i64, margin: i64) -> TokenState {
    if now.saturating_add(margin) < record.access_token.expires_at {
        TokenState::Fresh
    } else if now < record.refresh_token.expires_at {
        TokenState::Renewable
    } else {
        TokenState::Dead
    }
}
