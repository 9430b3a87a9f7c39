// Credential types

use serde::{Deserialize, Serialize};

use super::expiry::normalize_expiry;

/// Opaque light identifier, passed through unchanged
pub type LightId = serde_json::Value;

/// A token value with its expiry in seconds since the epoch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub value: String,
    pub expires_at: i64,
}

impl Token {
    pub fn new(value: impl Into<String>, expires_at: i64) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Copy of this token with the expiry normalized to seconds
    pub fn normalized(&self) -> Self {
        Self {
            value: self.value.clone(),
            expires_at: normalize_expiry(self.expires_at),
        }
    }
}

/// Access and refresh token returned by the token issuer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: Token,
    pub refresh_token: Token,
}

/// Persisted credentials for one session
///
/// Field names match the document layout in the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    #[serde(rename = "session")]
    pub session_id: String,
    pub username: String,
    pub access_token: Token,
    pub refresh_token: Token,
    /// The store drops empty arrays, so a missing field reads as empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub active_lights: Vec<LightId>,
}

impl CredentialRecord {
    /// Copy of this record with both expiries normalized to seconds
    pub fn normalized(self) -> Self {
        Self {
            access_token: self.access_token.normalized(),
            refresh_token: self.refresh_token.normalized(),
            ..self
        }
    }
}

/// Partial document overwriting only the token fields
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUpdate<'a> {
    pub access_token: &'a Token,
    pub refresh_token: &'a Token,
}

/// Partial document overwriting only the active lights
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveLightsUpdate<'a> {
    pub active_lights: &'a [LightId],
}

/// A record together with the store key it lives under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLocation {
    pub key: String,
    pub record: CredentialRecord,
}

/// Usability of a stored token pair at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// Access token is valid beyond the refresh margin
    Fresh,
    /// Access token is stale but the refresh token still works
    Renewable,
    /// Refresh token has expired; authentication must start over
    Dead,
}

/// Outcome of initializing a session
#[derive(Debug)]
pub enum Session<C> {
    /// Credentials are usable
    Ready {
        client: C,
        active_lights: Vec<LightId>,
    },
    /// The record exists but can no longer be refreshed
    Expired,
}

impl<C> Session<C> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Session::Ready { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_deserializes_store_layout() {
        let raw = serde_json::json!({
            "session": "sess-1",
            "username": "bridge-user",
            "accessToken": { "value": "at", "expiresAt": 1_700_000_000_000i64 },
            "refreshToken": { "value": "rt", "expiresAt": 1_710_000_000 },
            "activeLights": ["1", "4"]
        });

        let record: CredentialRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(record.session_id, "sess-1");
        assert_eq!(
            record.active_lights,
            vec![serde_json::json!("1"), serde_json::json!("4")]
        );

        let record = record.normalized();
        assert_eq!(record.access_token.expires_at, 1_700_000_000);
        assert_eq!(record.refresh_token.expires_at, 1_710_000_000);
    }

    #[test]
    fn test_active_lights_kept_as_stored() {
        let raw = serde_json::json!({
            "session": "sess-1",
            "username": "bridge-user",
            "accessToken": { "value": "at", "expiresAt": 1 },
            "refreshToken": { "value": "rt", "expiresAt": 2 },
            "activeLights": [1, "4", { "id": "abc" }]
        });

        let record: CredentialRecord = serde_json::from_value(raw).unwrap();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["activeLights"], serde_json::json!([1, "4", { "id": "abc" }]));
    }

    #[test]
    fn test_missing_active_lights_reads_as_empty() {
        let raw = serde_json::json!({
            "session": "sess-1",
            "username": "bridge-user",
            "accessToken": { "value": "at", "expiresAt": 1 },
            "refreshToken": { "value": "rt", "expiresAt": 2 }
        });

        let record: CredentialRecord = serde_json::from_value(raw).unwrap();
        assert!(record.active_lights.is_empty());
    }

    #[test]
    fn test_record_serializes_without_empty_lights() {
        let record = CredentialRecord {
            session_id: "sess-1".to_string(),
            username: "bridge-user".to_string(),
            access_token: Token::new("at", 10),
            refresh_token: Token::new("rt", 20),
            active_lights: Vec::new(),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["session"], "sess-1");
        assert_eq!(value["accessToken"]["expiresAt"], 10);
        assert!(value.get("activeLights").is_none());
    }

    #[test]
    fn test_token_update_touches_only_tokens() {
        let access = Token::new("at", 10);
        let refresh = Token::new("rt", 20);
        let value = serde_json::to_value(TokenUpdate {
            access_token: &access,
            refresh_token: &refresh,
        })
        .unwrap();

        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(value["refreshToken"]["value"], "rt");
    }
}
