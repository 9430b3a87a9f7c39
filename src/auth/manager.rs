use serde_json::Value;

use super::expiry::{classify, unix_now, DEFAULT_REFRESH_MARGIN};
use super::issuer::{ClientFactory, TokenIssuer};
use super::types::{
    ActiveLightsUpdate, CredentialRecord, LightId, Session, StoreLocation, TokenPair, TokenState,
    TokenUpdate,
};
use crate::error::{CredentialError, Result};
use crate::store::DocumentStore;

/// Credential lifecycle manager
/// Resolves stored credentials for a session and renews them before expiry
pub struct CredentialManager<S, I> {
    /// Remote document store holding one record per session
    store: S,

    /// Exchanges refresh tokens for new token pairs
    issuer: I,

    /// Access tokens expiring within this many seconds are refreshed
    refresh_margin: i64,
}

impl<S, I> CredentialManager<S, I>
where
    S: DocumentStore,
{
    pub fn new(store: S, issuer: I) -> Self {
        Self {
            store,
            issuer,
            refresh_margin: DEFAULT_REFRESH_MARGIN,
        }
    }

    /// Override the refresh margin in seconds
    pub fn with_refresh_margin(mut self, refresh_margin: i64) -> Self {
        self.refresh_margin = refresh_margin;
        self
    }

    /// Find the first stored record for `session_id`
    ///
    /// Returns `Ok(None)` when no document matches. Expiries in the returned
    /// record are normalized to seconds.
    pub async fn find_record(&self, session_id: &str) -> Result<Option<StoreLocation>> {
        tracing::debug!(session = %session_id, "Looking up credential record");

        let documents = self.store.fetch_all().await.map_err(|e| {
            tracing::error!("Credential store read failed: {}", e);
            CredentialError::StoreUnreachable(e.to_string())
        })?;

        for (key, document) in documents {
            if document.get("session").and_then(Value::as_str) != Some(session_id) {
                continue;
            }

            let record: CredentialRecord = serde_json::from_value(document).map_err(|e| {
                tracing::error!(key = %key, "Stored credential record is malformed: {}", e);
                CredentialError::StoreUnreachable(format!("record {} is malformed: {}", key, e))
            })?;

            tracing::debug!(session = %session_id, key = %key, "Credential record found");
            return Ok(Some(StoreLocation {
                key,
                record: record.normalized(),
            }));
        }

        tracing::debug!(session = %session_id, "No credential record for session");
        Ok(None)
    }

    /// Append a new record for `session_id`
    ///
    /// Not idempotent: a second call for the same session adds a second
    /// document, and lookups return whichever the store lists first.
    pub async fn create_record(
        &self,
        session_id: &str,
        username: &str,
        tokens: &TokenPair,
    ) -> Result<()> {
        let record = CredentialRecord {
            session_id: session_id.to_string(),
            username: username.to_string(),
            access_token: tokens.access_token.normalized(),
            refresh_token: tokens.refresh_token.normalized(),
            active_lights: Vec::new(),
        };

        let document = serde_json::to_value(&record)
            .map_err(|e| CredentialError::StoreWriteFailed(e.to_string()))?;

        self.store.insert(&document).await.map_err(|e| {
            tracing::error!(session = %session_id, "Failed to create credential record: {}", e);
            CredentialError::StoreWriteFailed(e.to_string())
        })?;

        tracing::info!(session = %session_id, "Credential record created");
        Ok(())
    }

    /// Overwrite the token fields of the record for `session_id`
    ///
    /// Never creates a record; an unknown session fails without writing.
    pub async fn update_tokens(&self, session_id: &str, tokens: &TokenPair) -> Result<()> {
        let location = self.find_record(session_id).await?.ok_or_else(|| {
            CredentialError::TokenUpdateFailed(format!("no record for session {}", session_id))
        })?;

        let access_token = tokens.access_token.normalized();
        let refresh_token = tokens.refresh_token.normalized();

        let fields = serde_json::to_value(TokenUpdate {
            access_token: &access_token,
            refresh_token: &refresh_token,
        })
        .map_err(|e| CredentialError::TokenUpdateFailed(e.to_string()))?;

        self.store
            .patch(&location.key, &fields)
            .await
            .map_err(|e| {
                tracing::error!(session = %session_id, "Could not update tokens: {}", e);
                CredentialError::TokenUpdateFailed(e.to_string())
            })?;

        tracing::info!(
            session = %session_id,
            access_expires_at = access_token.expires_at,
            "Tokens written to credential store"
        );
        Ok(())
    }

    /// Overwrite the active lights of the record for `session_id`
    pub async fn update_active_lights(&self, session_id: &str, lights: &[LightId]) -> Result<()> {
        let location = self.find_record(session_id).await?.ok_or_else(|| {
            CredentialError::PayloadUpdateFailed(format!("no record for session {}", session_id))
        })?;

        let fields = serde_json::to_value(ActiveLightsUpdate {
            active_lights: lights,
        })
        .map_err(|e| CredentialError::PayloadUpdateFailed(e.to_string()))?;

        self.store
            .patch(&location.key, &fields)
            .await
            .map_err(|e| {
                tracing::error!(session = %session_id, "Could not update active lights: {}", e);
                CredentialError::PayloadUpdateFailed(e.to_string())
            })?;

        tracing::debug!(session = %session_id, count = lights.len(), "Active lights written");
        Ok(())
    }

    /// Read the active lights stored for `session_id`
    pub async fn get_active_lights(&self, session_id: &str) -> Result<Vec<LightId>> {
        self.find_record(session_id)
            .await?
            .map(|location| location.record.active_lights)
            .ok_or_else(|| CredentialError::SessionUnknown(session_id.to_string()))
    }

    /// Resolve `session_id` into a ready client, refreshing tokens if needed
    ///
    /// - unknown session: `Err(SessionUnknown)`
    /// - access token valid beyond the margin: client from stored tokens
    /// - access token stale, refresh token valid: refresh, persist, then
    ///   client from the new tokens
    /// - refresh token expired: `Ok(Session::Expired)`
    pub async fn initialize<F>(&self, session_id: &str, factory: &F) -> Result<Session<F::Client>>
    where
        F: ClientFactory,
        I: TokenIssuer<F::Client>,
    {
        let Some(StoreLocation { record, .. }) = self.find_record(session_id).await? else {
            tracing::warn!(session = %session_id, "Session is not in the credential store");
            return Err(CredentialError::SessionUnknown(session_id.to_string()));
        };

        let now = unix_now();
        let state = classify(&record, now, self.refresh_margin);
        tracing::debug!(session = %session_id, state = ?state, "Classified stored tokens");

        match state {
            TokenState::Fresh => Ok(Session::Ready {
                client: factory.connect(
                    &record.access_token.value,
                    &record.refresh_token.value,
                    &record.username,
                ),
                active_lights: record.active_lights,
            }),
            TokenState::Renewable => {
                let tokens = self.refresh_tokens(session_id, &record, factory).await?;

                Ok(Session::Ready {
                    client: factory.connect(
                        &tokens.access_token.value,
                        &tokens.refresh_token.value,
                        &record.username,
                    ),
                    active_lights: record.active_lights,
                })
            }
            TokenState::Dead => {
                tracing::warn!(
                    session = %session_id,
                    "Refresh token expired, authentication must start over"
                );
                Ok(Session::Expired)
            }
        }
    }

    /// Obtain a new token pair through a provisional client and persist it
    async fn refresh_tokens<F>(
        &self,
        session_id: &str,
        record: &CredentialRecord,
        factory: &F,
    ) -> Result<TokenPair>
    where
        F: ClientFactory,
        I: TokenIssuer<F::Client>,
    {
        tracing::info!(session = %session_id, "Access token stale, refreshing...");

        let provisional = factory.connect("", &record.refresh_token.value, &record.username);

        let tokens = self
            .issuer
            .refresh(&provisional)
            .await
            .inspect_err(|e| tracing::error!(session = %session_id, "Token refresh failed: {}", e))?;

        self.update_tokens(session_id, &tokens).await?;

        tracing::info!(session = %session_id, "Tokens refreshed");
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::Token;
    use crate::error::{ErrorKind, StoreError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Store that serves a fixed collection and records patches
    #[derive(Default)]
    struct StaticStore {
        documents: Vec<(String, Value)>,
        patches: Mutex<Vec<(String, Value)>>,
        fail_patch: bool,
    }

    #[async_trait]
    impl DocumentStore for StaticStore {
        async fn fetch_all(&self) -> std::result::Result<Vec<(String, Value)>, StoreError> {
            Ok(self.documents.clone())
        }

        async fn insert(&self, _document: &Value) -> std::result::Result<(), StoreError> {
            Ok(())
        }

        async fn patch(&self, key: &str, fields: &Value) -> std::result::Result<(), StoreError> {
            if self.fail_patch {
                return Err(StoreError::Status {
                    status: 500,
                    body: String::new(),
                });
            }
            self.patches
                .lock()
                .unwrap()
                .push((key.to_string(), fields.clone()));
            Ok(())
        }
    }

    struct NoIssuer;

    fn document(session: &str, access_expiry: i64) -> Value {
        json!({
            "session": session,
            "username": "bridge-user",
            "accessToken": { "value": "at", "expiresAt": access_expiry },
            "refreshToken": { "value": "rt", "expiresAt": 2_000_000_000_000i64 },
            "activeLights": ["1"]
        })
    }

    fn tokens() -> TokenPair {
        TokenPair {
            access_token: Token::new("new-at", 1_800_000_000_000),
            refresh_token: Token::new("new-rt", 1_900_000_000),
        }
    }

    #[tokio::test]
    async fn test_find_record_first_match() {
        let store = StaticStore {
            documents: vec![
                ("-Na".to_string(), document("other", 1)),
                ("-Nb".to_string(), document("sess", 1_700_000_000_000)),
                ("-Nc".to_string(), document("sess", 5)),
            ],
            ..Default::default()
        };
        let manager = CredentialManager::new(store, NoIssuer);

        let location = manager.find_record("sess").await.unwrap().unwrap();
        assert_eq!(location.key, "-Nb");
        assert_eq!(location.record.access_token.expires_at, 1_700_000_000);
        assert_eq!(location.record.refresh_token.expires_at, 2_000_000_000);
    }

    #[tokio::test]
    async fn test_find_record_skips_malformed_non_matching() {
        let store = StaticStore {
            documents: vec![
                ("-Na".to_string(), json!({ "garbage": true })),
                ("-Nb".to_string(), document("sess", 1)),
            ],
            ..Default::default()
        };
        let manager = CredentialManager::new(store, NoIssuer);

        assert!(manager.find_record("sess").await.unwrap().is_some());
        assert!(manager.find_record("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_record_malformed_match() {
        let store = StaticStore {
            documents: vec![("-Na".to_string(), json!({ "session": "sess" }))],
            ..Default::default()
        };
        let manager = CredentialManager::new(store, NoIssuer);

        let err = manager.find_record("sess").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreUnreachable);
    }

    #[tokio::test]
    async fn test_update_tokens_normalizes_and_patches_key() {
        let store = StaticStore {
            documents: vec![("-Nb".to_string(), document("sess", 1))],
            ..Default::default()
        };
        let manager = CredentialManager::new(store, NoIssuer);

        manager.update_tokens("sess", &tokens()).await.unwrap();

        let patches = manager.store.patches.lock().unwrap();
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].0, "-Nb");
        assert_eq!(
            patches[0].1,
            json!({
                "accessToken": { "value": "new-at", "expiresAt": 1_800_000_000 },
                "refreshToken": { "value": "new-rt", "expiresAt": 1_900_000_000 }
            })
        );
    }

    #[tokio::test]
    async fn test_update_tokens_patch_failure() {
        let store = StaticStore {
            documents: vec![("-Nb".to_string(), document("sess", 1))],
            fail_patch: true,
            ..Default::default()
        };
        let manager = CredentialManager::new(store, NoIssuer);

        let err = manager.update_tokens("sess", &tokens()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenUpdateFailed);
    }

    #[tokio::test]
    async fn test_update_active_lights() {
        let store = StaticStore {
            documents: vec![("-Nb".to_string(), document("sess", 1))],
            ..Default::default()
        };
        let manager = CredentialManager::new(store, NoIssuer);

        let lights = vec![json!("2"), json!(7)];
        manager.update_active_lights("sess", &lights).await.unwrap();

        let patches = manager.store.patches.lock().unwrap();
        assert_eq!(patches[0].1, json!({ "activeLights": ["2", 7] }));

        drop(patches);
        let err = manager
            .update_active_lights("missing", &lights)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PayloadUpdateFailed);
    }

    #[tokio::test]
    async fn test_get_active_lights() {
        let store = StaticStore {
            documents: vec![("-Nb".to_string(), document("sess", 1))],
            ..Default::default()
        };
        let manager = CredentialManager::new(store, NoIssuer);

        assert_eq!(
            manager.get_active_lights("sess").await.unwrap(),
            vec![json!("1")]
        );
        let err = manager.get_active_lights("missing").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SessionUnknown);
    }
}
