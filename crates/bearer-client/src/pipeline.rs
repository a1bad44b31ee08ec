//! Request interception pipeline
//!
//! Two named hooks around every outgoing request:
//!
//! - pre-send: read the stored access credential; if it is absent or
//!   within the expiry margin, await a (single-flight) refresh, then
//!   attach `Authorization: Bearer <token>`.
//! - post-response: on 401, refresh once, re-attach the header with the
//!   new credential, and resend a buffered clone of the original
//!   request exactly once. The resend's response goes back to the
//!   caller unchanged, 401 or not — no second retry, no loop.
//!
//! Neither hook touches the caller-supplied request body.

use std::sync::Arc;
use std::time::Duration;

use bearer_auth::{CredentialKind, CredentialStore};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use tracing::debug;

use crate::error::{Error, Result};
use crate::refresh::RefreshCoordinator;

pub struct RequestPipeline {
    store: Arc<CredentialStore>,
    coordinator: Arc<RefreshCoordinator>,
    expiry_margin: Duration,
}

impl RequestPipeline {
    pub fn new(
        store: Arc<CredentialStore>,
        coordinator: Arc<RefreshCoordinator>,
        expiry_margin: Duration,
    ) -> Self {
        Self {
            store,
            coordinator,
            expiry_margin,
        }
    }

    /// Pre-send hook: attach a fresh bearer credential.
    ///
    /// With no session stored at all, the request goes out without an
    /// Authorization header — the backend's 401 is the caller's signal
    /// to authenticate. Any other refresh failure propagates.
    pub(crate) async fn authorize(&self, request: &mut reqwest::Request) -> Result<()> {
        let access = match self.store.get(CredentialKind::Access).await {
            Some(credential) if !credential.expires_within(self.expiry_margin) => Some(credential),
            _ => match self.coordinator.refresh().await {
                Ok(session) => Some(session.access),
                Err(Error::NoRefreshCredential) => None,
                Err(e) => return Err(e),
            },
        };

        if let Some(access) = access {
            attach_bearer(request, &access.value)?;
        }
        Ok(())
    }

    /// Send a request through both hooks.
    ///
    /// The replay clone is taken before the pre-send hook runs, so a
    /// retried request is re-authorized from scratch with the refreshed
    /// credential. Requests with streaming bodies cannot be replayed;
    /// for those the original 401 is returned as-is.
    pub async fn execute(
        &self,
        http: &reqwest::Client,
        mut request: reqwest::Request,
    ) -> Result<reqwest::Response> {
        let replay = request.try_clone();

        self.authorize(&mut request).await?;
        let response = http
            .execute(request)
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        let Some(mut retry) = replay else {
            return Ok(response);
        };

        debug!(url = %retry.url(), "401 response, refreshing and resending once");
        let session = self.coordinator.refresh().await?;
        attach_bearer(&mut retry, &session.access.value)?;
        http.execute(retry)
            .await
            .map_err(|e| Error::Transport(e.to_string()))
    }
}

fn attach_bearer(request: &mut reqwest::Request, token: &str) -> Result<()> {
    let value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| Error::Credential(format!("token is not header-safe: {e}")))?;
    request.headers_mut().insert(AUTHORIZATION, value);
    Ok(())
}
