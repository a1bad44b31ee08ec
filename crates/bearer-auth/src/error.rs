//! Error types for authentication operations

/// Errors from a structurally bad bearer token.
///
/// These indicate local data corruption (or a backend handing out
/// tokens this client was never written for) and are never retried.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("unreadable token payload: {0}")]
    Payload(String),

    #[error("token is missing required claim `{0}`")]
    MissingClaim(&'static str),
}

/// Errors from authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("refresh credential rejected: {0}")]
    RefreshRejected(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
