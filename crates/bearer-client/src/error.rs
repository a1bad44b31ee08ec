//! Error types for client operations
//!
//! The enum derives `Clone` because a refresh outcome is delivered
//! through a shared future to every caller that joined the in-flight
//! operation; all payloads are strings for that reason.

use bearer_auth::DecodeError;

/// Errors from client operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("no refresh credential stored, re-authentication required")]
    NoRefreshCredential,

    #[error("refresh credential rejected: {0}")]
    RefreshRejected(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("credential decode failed: {0}")]
    Decode(String),

    #[error("credential store error: {0}")]
    Credential(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<bearer_auth::Error> for Error {
    fn from(err: bearer_auth::Error) -> Self {
        match err {
            bearer_auth::Error::RefreshRejected(msg) => Error::RefreshRejected(msg),
            bearer_auth::Error::AuthenticationFailed(msg) => Error::Authentication(msg),
            bearer_auth::Error::Decode(e) => Error::Decode(e.to_string()),
            bearer_auth::Error::CredentialParse(msg) | bearer_auth::Error::Io(msg) => {
                Error::Credential(msg)
            }
            bearer_auth::Error::Http(msg) => Error::Transport(msg),
        }
    }
}

impl From<DecodeError> for Error {
    fn from(err: DecodeError) -> Self {
        Error::Decode(err.to_string())
    }
}
