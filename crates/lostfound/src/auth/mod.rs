//! Credential handling: password hashing and signed bearer tokens.

mod password;
mod token;

pub use password::{hash_password, verify_password};
pub use token::{AccessToken, TokenClaims, TokenSigner};

/// Failure raised while hashing credentials or validating a token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("malformed access token")]
    MalformedToken,
    #[error("access token signature mismatch")]
    BadSignature,
    #[error("access token expired")]
    Expired,
    #[error("invalid signing key: {0}")]
    Key(String),
}
