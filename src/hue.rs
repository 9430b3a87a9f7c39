// Hue remote API client handle

use reqwest::Client;
use std::fmt;

use crate::auth::ClientFactory;

/// Credentials bound to a Hue remote API session
///
/// The handle is cheap to clone; the HTTP client is shared.
#[derive(Clone)]
pub struct RemoteClient {
    http: Client,
    access_token: String,
    refresh_token: String,
    username: String,
}

impl RemoteClient {
    pub fn new(http: Client, access_token: &str, refresh_token: &str, username: &str) -> Self {
        Self {
            http,
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            username: username.to_string(),
        }
    }

    /// Access token, empty for a provisional client
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Refresh token used for token exchange
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// Bridge whitelist username
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Provisional clients carry no access token
    pub fn is_provisional(&self) -> bool {
        self.access_token.is_empty()
    }

    /// Shared HTTP client for requests made on behalf of this session
    pub fn http(&self) -> &Client {
        &self.http
    }
}

impl fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteClient")
            .field("username", &self.username)
            .field("provisional", &self.is_provisional())
            .finish_non_exhaustive()
    }
}

/// Builds [`RemoteClient`]s sharing one HTTP client
#[derive(Clone)]
pub struct RemoteClientFactory {
    http: Client,
}

impl RemoteClientFactory {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

impl ClientFactory for RemoteClientFactory {
    type Client = RemoteClient;

    fn connect(&self, access_token: &str, refresh_token: &str, username: &str) -> RemoteClient {
        RemoteClient::new(self.http.clone(), access_token, refresh_token, username)
    }
}
