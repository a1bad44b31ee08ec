//! Single-flight token refresh
//!
//! Every request path that discovers a stale or rejected access
//! credential converges here. At most one refresh network call is in
//! flight per coordinator: the first caller creates a shared future and
//! parks it in the slot, later callers clone the handle and await the
//! same outcome. Without this the backend would see a thundering herd
//! of refresh attempts, and one-time-use refresh semantics would
//! invalidate tokens out from under sibling requests.
//!
//! The operation is destroyed on completion (success or failure) and a
//! new one is created lazily the next time a caller needs one.

use std::sync::Arc;

use bearer_auth::{CredentialKind, CredentialStore, Session, token};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

type RefreshHandle = Shared<BoxFuture<'static, Result<Session>>>;

/// Coordinates refresh calls so concurrent observers of a stale
/// credential share one network round trip.
pub struct RefreshCoordinator {
    store: Arc<CredentialStore>,
    http: reqwest::Client,
    base_url: String,
    in_flight: Mutex<Option<RefreshHandle>>,
}

impl RefreshCoordinator {
    pub fn new(store: Arc<CredentialStore>, http: reqwest::Client, base_url: String) -> Self {
        Self {
            store,
            http,
            base_url,
            in_flight: Mutex::new(None),
        }
    }

    /// Exchange the stored refresh credential for a new session.
    ///
    /// Joins the in-flight operation if one exists instead of issuing a
    /// second network call. On success the new pair is written to the
    /// store atomically before any waiter resumes. A definitive
    /// rejection clears the store (the session is dead, callers must
    /// re-authenticate); a transient transport failure leaves the
    /// stored credentials in place for a later attempt.
    pub async fn refresh(&self) -> Result<Session> {
        let handle = {
            let mut slot = self.in_flight.lock().await;
            match slot.as_ref() {
                Some(handle) => {
                    debug!("joining in-flight refresh");
                    handle.clone()
                }
                None => {
                    let handle = drive(
                        self.store.clone(),
                        self.http.clone(),
                        self.base_url.clone(),
                    )
                    .boxed()
                    .shared();
                    *slot = Some(handle.clone());
                    handle
                }
            }
        };

        let result = handle.await;

        // Destroy the completed operation so the next staleness check
        // starts a fresh one. A newer, still-pending operation in the
        // slot is left alone.
        let mut slot = self.in_flight.lock().await;
        if slot.as_ref().is_some_and(|h| h.peek().is_some()) {
            *slot = None;
        }

        result
    }
}

/// The actual refresh round trip, shared by all joined waiters.
async fn drive(
    store: Arc<CredentialStore>,
    http: reqwest::Client,
    base_url: String,
) -> Result<Session> {
    let refresh = store
        .get(CredentialKind::Refresh)
        .await
        .ok_or(Error::NoRefreshCredential)?;

    match token::refresh_token(&http, &base_url, &refresh.value).await {
        Ok(pair) => {
            let session = Session::from_pair(&pair)?;
            store.set_session(session.clone()).await?;
            info!(
                expires_at = session.access.expires_at,
                "token refresh succeeded"
            );
            Ok(session)
        }
        Err(bearer_auth::Error::RefreshRejected(msg)) => {
            warn!(error = %msg, "refresh credential rejected, clearing session");
            if let Err(e) = store.clear().await {
                warn!(error = %e, "failed to clear credential store");
            }
            Err(Error::RefreshRejected(msg))
        }
        Err(e) => {
            warn!(error = %e, "refresh failed (transient), keeping stored credentials");
            Err(e.into())
        }
    }
}
