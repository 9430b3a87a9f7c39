// Credential lifecycle module
// Token state classification, refresh orchestration, and store consistency

mod expiry;
mod issuer;
mod manager;
mod refresh;
mod types;

pub use expiry::{
    classify, normalize_expiry, unix_now, DEFAULT_REFRESH_MARGIN, MAX_REFRESH_MARGIN,
    MILLIS_THRESHOLD,
};
pub use issuer::{ClientFactory, TokenIssuer};
pub use manager::CredentialManager;
pub use refresh::{HueTokenIssuer, OAuthClient, DEFAULT_TOKEN_URL};
pub use types::{CredentialRecord, LightId, Session, StoreLocation, Token, TokenPair, TokenState};
