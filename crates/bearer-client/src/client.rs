//! Client facade
//!
//! The only surface collaborators (forms, views) call: `login`,
//! `current_user_id`, `logout`, and `send`. Everything about token
//! lifetime lives behind it.

use std::sync::Arc;
use std::time::Duration;

use bearer_auth::{CredentialKind, CredentialStore, Session, token};
use common::Secret;
use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::pipeline::RequestPipeline;
use crate::refresh::RefreshCoordinator;

/// Authenticated HTTP client.
///
/// Cheap to share: wrap it in an `Arc` and hand clones of the handle to
/// collaborators. All of them converge on the same credential store and
/// refresh coordinator.
pub struct AuthClient {
    http: reqwest::Client,
    store: Arc<CredentialStore>,
    pipeline: RequestPipeline,
    base_url: String,
}

impl AuthClient {
    /// Build a client from configuration, loading the credential store
    /// from disk. A previously persisted session is picked up here, so
    /// a restarted process stays logged in until the tokens lapse.
    pub async fn new(config: Config) -> Result<Self> {
        let store = Arc::new(
            CredentialStore::load(config.credentials_path.clone())
                .await
                .map_err(Error::from)?,
        );
        Self::from_parts(config, store)
    }

    pub(crate) fn from_parts(config: Config, store: Arc<CredentialStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Transport(format!("building HTTP client: {e}")))?;
        let coordinator = Arc::new(RefreshCoordinator::new(
            store.clone(),
            http.clone(),
            config.base_url.clone(),
        ));
        let pipeline = RequestPipeline::new(
            store.clone(),
            coordinator,
            Duration::from_secs(config.expiry_margin_secs),
        );
        Ok(Self {
            http,
            store,
            pipeline,
            base_url: config.base_url,
        })
    }

    /// Authenticate with username and password and store the returned
    /// session. On failure nothing is written: the store holds either
    /// the previous state or the complete new pair, never half of one.
    pub async fn login(&self, username: &str, password: &Secret<String>) -> Result<()> {
        let pair = token::login(&self.http, &self.base_url, username, password).await?;
        let session = Session::from_pair(&pair)?;
        let user_id = session.access.subject_id;
        self.store.set_session(session).await?;
        info!(user_id, "login succeeded");
        Ok(())
    }

    /// Subject id of the stored access credential.
    ///
    /// Read-only and local: no network call, no refresh, answers even
    /// from an already-expired credential. `None` means logged out.
    pub async fn current_user_id(&self) -> Option<i64> {
        self.store
            .get(CredentialKind::Access)
            .await
            .map(|credential| credential.subject_id)
    }

    /// Drop the stored session. The next `login` starts from scratch.
    pub async fn logout(&self) -> Result<()> {
        self.store.clear().await?;
        Ok(())
    }

    /// Send a request through the interception pipeline.
    pub async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        self.pipeline.execute(&self.http, request).await
    }

    /// Start building a request against the configured backend.
    /// `path` is absolute, e.g. `/posts/1/`.
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
    }
}
