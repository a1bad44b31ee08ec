//! Authenticated HTTP client
//!
//! Wraps outgoing requests with bearer credential management: the
//! access token is attached automatically, refreshed proactively when
//! it nears expiry, and refreshed reactively (with a single resend)
//! when the backend answers 401. Concurrent requests that all observe a
//! stale credential converge on one refresh network call.
//!
//! Layering:
//! - [`refresh::RefreshCoordinator`] — single-flight token refresh
//! - [`pipeline::RequestPipeline`] — pre-send / post-response hooks
//! - [`client::AuthClient`] — the facade collaborators call:
//!   `login`, `current_user_id`, `logout`, `send`

pub mod client;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod refresh;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::AuthClient;
pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::RequestPipeline;
pub use refresh::RefreshCoordinator;
