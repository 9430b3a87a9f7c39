// Token refresh against the Hue OAuth endpoint

use async_trait::async_trait;
use serde::Deserialize;

use super::expiry::unix_now;
use super::issuer::TokenIssuer;
use super::types::{Token, TokenPair};
use crate::error::{CredentialError, Result};
use crate::hue::RemoteClient;

/// Default Hue OAuth token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://api.meethue.com/v2/oauth2/token";

/// Access token lifetime when the response omits `expires_in` (7 days)
const DEFAULT_ACCESS_LIFETIME: i64 = 7 * 24 * 60 * 60;

/// Refresh token lifetime when the response omits it (100 days)
const DEFAULT_REFRESH_LIFETIME: i64 = 100 * 24 * 60 * 60;

/// OAuth refresh response
#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    refresh_token_expires_in: Option<i64>,
}

/// Hue OAuth client credentials
#[derive(Clone)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
}

/// Token issuer using `grant_type=refresh_token`
///
/// Requests go through the HTTP client of the handle being refreshed.
pub struct HueTokenIssuer {
    token_url: String,
    oauth_client: Option<OAuthClient>,
}

impl HueTokenIssuer {
    pub fn new(token_url: &str, oauth_client: Option<OAuthClient>) -> Self {
        Self {
            token_url: token_url.to_string(),
            oauth_client,
        }
    }
}

#[async_trait]
impl TokenIssuer<RemoteClient> for HueTokenIssuer {
    async fn refresh(&self, client: &RemoteClient) -> Result<TokenPair> {
        tracing::info!("Refreshing Hue token...");

        if client.refresh_token().is_empty() {
            return Err(CredentialError::TokenRefreshFailed(
                "client has no refresh token".to_string(),
            ));
        }

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", client.refresh_token()),
        ];

        let mut request = client.http().post(&self.token_url).form(&form);
        if let Some(ref oauth) = self.oauth_client {
            request = request.basic_auth(&oauth.client_id, Some(&oauth.client_secret));
        }

        let response = request.send().await.map_err(|e| {
            CredentialError::TokenRefreshFailed(format!("failed to send refresh request: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                "Hue token refresh failed: status={}, body={}",
                status,
                error_text
            );
            return Err(CredentialError::TokenRefreshFailed(format!(
                "{} - {}",
                status, error_text
            )));
        }

        let data: RefreshResponse = response.json().await.map_err(|e| {
            CredentialError::TokenRefreshFailed(format!("failed to parse refresh response: {}", e))
        })?;

        if data.access_token.is_empty() {
            return Err(CredentialError::TokenRefreshFailed(
                "response does not contain access_token".to_string(),
            ));
        }

        let now = unix_now();
        let access_expires_at = expires_at(
            now,
            "expires_in",
            data.expires_in.unwrap_or(DEFAULT_ACCESS_LIFETIME),
        )?;
        let refresh_expires_at = expires_at(
            now,
            "refresh_token_expires_in",
            data.refresh_token_expires_in
                .unwrap_or(DEFAULT_REFRESH_LIFETIME),
        )?;

        let access_token = Token::new(data.access_token, access_expires_at);
        let refresh_token = Token::new(
            data.refresh_token
                .unwrap_or_else(|| client.refresh_token().to_string()),
            refresh_expires_at,
        );

        tracing::info!(
            "Token refreshed via Hue OAuth, expires at {}",
            access_token.expires_at
        );

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}

/// Absolute expiry for a lifetime reported by the issuer
fn expires_at(now: i64, field: &str, lifetime: i64) -> Result<i64> {
    if lifetime <= 0 {
        return Err(CredentialError::TokenRefreshFailed(format!(
            "{} must be positive, got {}",
            field, lifetime
        )));
    }

    now.checked_add(lifetime).ok_or_else(|| {
        CredentialError::TokenRefreshFailed(format!("{} is out of range: {}", field, lifetime))
    })
}
