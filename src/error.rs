// Error handling module
// Defines the credential error taxonomy and store transport errors

use thiserror::Error;

/// Stable classification of a [`CredentialError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    StoreUnreachable,
    StoreWriteFailed,
    SessionUnknown,
    TokenUpdateFailed,
    PayloadUpdateFailed,
    TokenRefreshFailed,
}

/// Errors surfaced by credential lifecycle operations
///
/// Every collaborator failure is converted into one of these variants at the
/// point where it is first observed. None of them is retried.
#[derive(Error, Debug)]
pub enum CredentialError {
    /// The store could not be read, or returned unusable data
    #[error("Credential store unreachable: {0}")]
    StoreUnreachable(String),

    /// A new document could not be appended to the store
    #[error("Failed to write credential record: {0}")]
    StoreWriteFailed(String),

    /// No record exists for the session
    #[error("Session is not in the credential store: {0}")]
    SessionUnknown(String),

    /// Refreshed tokens could not be persisted
    #[error("Failed to update tokens: {0}")]
    TokenUpdateFailed(String),

    /// The active lights could not be persisted
    #[error("Failed to update active lights: {0}")]
    PayloadUpdateFailed(String),

    /// The token issuer did not produce a new token pair
    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),
}

impl CredentialError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CredentialError::StoreUnreachable(_) => ErrorKind::StoreUnreachable,
            CredentialError::StoreWriteFailed(_) => ErrorKind::StoreWriteFailed,
            CredentialError::SessionUnknown(_) => ErrorKind::SessionUnknown,
            CredentialError::TokenUpdateFailed(_) => ErrorKind::TokenUpdateFailed,
            CredentialError::PayloadUpdateFailed(_) => ErrorKind::PayloadUpdateFailed,
            CredentialError::TokenRefreshFailed(_) => ErrorKind::TokenRefreshFailed,
        }
    }
}

/// Transport-level failures from the document store
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store answered with a non-success status
    #[error("store returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never produced a response
    #[error("store request failed: {0}")]
    Transport(String),

    /// The response body could not be decoded
    #[error("malformed store response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// Result type alias for credential operations
pub type Result<T> = std::result::Result<T, CredentialError>;
