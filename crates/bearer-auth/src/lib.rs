//! Bearer token authentication library
//!
//! Provides JWT claim decoding, durable credential storage, and the
//! login/refresh wire calls against the backend token endpoints. This
//! crate is a standalone library with no opinion about when to refresh —
//! the `bearer-client` crate layers the coordination and request
//! pipeline on top.
//!
//! Credential flow:
//! 1. Caller authenticates via `token::login()`
//! 2. Both returned tokens are decoded via `claims::decode()`
//! 3. The pair is stored via `credentials::CredentialStore::set_session()`
//! 4. When the access token nears expiry, `token::refresh_token()`
//!    exchanges the refresh token for a new pair
//! 5. A rejected refresh clears the store; the caller re-authenticates

pub mod claims;
pub mod credentials;
pub mod error;
pub mod token;

pub use claims::Claims;
pub use credentials::{Credential, CredentialKind, CredentialStore, Session};
pub use error::{DecodeError, Error, Result};
pub use token::{TokenPair, login, refresh_token};
