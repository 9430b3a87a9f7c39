// Collaborator seams for client construction and token refresh

use async_trait::async_trait;

use super::types::TokenPair;
use crate::error::Result;

/// Builds downstream API clients from credentials
///
/// Construction is pure; the manager never inspects the returned handle.
pub trait ClientFactory: Send + Sync {
    type Client: Send + Sync;

    /// Create a client from token values and the bridge username.
    /// An empty `access_token` yields a provisional client that can only
    /// be used for a token exchange.
    fn connect(&self, access_token: &str, refresh_token: &str, username: &str) -> Self::Client;
}

/// Exchanges a refresh token for a new token pair
///
/// Implementations must report failures as typed [`CredentialError`]s.
///
/// [`CredentialError`]: crate::error::CredentialError
#[async_trait]
pub trait TokenIssuer<C: Sync>: Send + Sync {
    async fn refresh(&self, client: &C) -> Result<TokenPair>;
}
