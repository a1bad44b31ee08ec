//! Durable credential storage
//!
//! Persists the access and refresh credentials as a JSON file keyed by
//! credential kind. All writes use atomic temp-file + rename to prevent
//! corruption on crash. A tokio Mutex serializes concurrent access, so
//! replacing the session pair is a single critical section: no other
//! writer can interleave between reading the old refresh credential and
//! writing the new pair.
//!
//! Absence of either entry is a normal "logged out" state, not an
//! error. Entries whose expiry has passed are dropped at load time, so
//! a restart never resurrects a dead token; within a run an entry stays
//! readable until it is replaced or cleared.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::claims;
use crate::error::{DecodeError, Error, Result};
use crate::token::TokenPair;

/// Which of the two stored credentials an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    Access,
    Refresh,
}

impl CredentialKind {
    /// Kind label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            CredentialKind::Access => "access",
            CredentialKind::Refresh => "refresh",
        }
    }
}

/// A single bearer credential with the claims this client cares about.
///
/// Immutable once issued: a refresh replaces the whole value, nothing
/// ever patches an existing credential in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// The opaque token string sent on the wire
    pub value: String,
    /// Expiry as a unix timestamp in seconds
    pub expires_at: u64,
    /// Subject id decoded from the token's `user_id` claim
    pub subject_id: i64,
}

impl Credential {
    /// Decode a raw token string into a stored credential.
    pub fn from_token(value: impl Into<String>) -> std::result::Result<Self, DecodeError> {
        let value = value.into();
        let claims = claims::decode(&value)?;
        Ok(Self {
            value,
            expires_at: claims.exp,
            subject_id: claims.user_id,
        })
    }

    /// Whether the credential expires within `margin` from now.
    pub fn expires_within(&self, margin: Duration) -> bool {
        self.expires_at <= unix_now() + margin.as_secs()
    }

    pub fn is_expired(&self) -> bool {
        self.expires_within(Duration::ZERO)
    }
}

/// The current access/refresh pair. Replaced wholesale on refresh.
#[derive(Debug, Clone)]
pub struct Session {
    pub access: Credential,
    pub refresh: Credential,
}

impl Session {
    /// Decode a wire token pair into a session.
    pub fn from_pair(pair: &TokenPair) -> std::result::Result<Self, DecodeError> {
        let access = Credential::from_token(pair.access_token.as_str())?;
        let refresh = Credential::from_token(pair.refresh_token.as_str())?;
        if refresh.expires_at < access.expires_at {
            // The backend always issues refresh tokens that outlive the
            // access token; log it if one ever doesn't.
            warn!(
                access_expires = access.expires_at,
                refresh_expires = refresh.expires_at,
                "refresh credential expires before access credential"
            );
        }
        Ok(Self { access, refresh })
    }
}

/// Thread-safe credential file manager.
///
/// The Mutex serializes all operations. Reads clone out of the
/// in-memory map, so callers never hold the lock across a network call.
pub struct CredentialStore {
    path: PathBuf,
    state: Mutex<HashMap<CredentialKind, Credential>>,
}

impl CredentialStore {
    /// Load credentials from the given file path.
    ///
    /// A missing file is a cold start: an empty `{}` file is created so
    /// future loads skip this path. Entries already past their expiry
    /// are evicted and the trimmed file written back.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading credential file: {e}")))?;
            let mut state: HashMap<CredentialKind, Credential> = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?;

            let before = state.len();
            state.retain(|_, credential| !credential.is_expired());
            if state.len() < before {
                debug!(evicted = before - state.len(), "dropped expired credentials");
                write_atomic(&path, &state).await?;
            }
            info!(path = %path.display(), entries = state.len(), "loaded credentials");
            state
        } else {
            info!(path = %path.display(), "credential file not found, starting logged out");
            let state = HashMap::new();
            write_atomic(&path, &state).await?;
            state
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Get a clone of the stored credential of the given kind.
    ///
    /// Absence is a normal state. An expired entry is still returned —
    /// callers that care about freshness check `expires_within`.
    pub async fn get(&self, kind: CredentialKind) -> Option<Credential> {
        let state = self.state.lock().await;
        state.get(&kind).cloned()
    }

    /// Store one credential and persist to disk.
    pub async fn set(&self, kind: CredentialKind, credential: Credential) -> Result<()> {
        let mut state = self.state.lock().await;
        state.insert(kind, credential);
        debug!(kind = kind.label(), "stored credential");
        write_atomic(&self.path, &state).await
    }

    /// Atomically replace both credentials with a new session.
    ///
    /// One lock acquisition and one file write, so readers observe
    /// either the old pair or the new pair, never a mix.
    pub async fn set_session(&self, session: Session) -> Result<()> {
        let mut state = self.state.lock().await;
        state.insert(CredentialKind::Access, session.access);
        state.insert(CredentialKind::Refresh, session.refresh);
        debug!("stored new session pair");
        write_atomic(&self.path, &state).await
    }

    /// Remove both credentials and persist. The stored state afterwards
    /// is the same as logged out.
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.clear();
        info!("cleared credential store");
        write_atomic(&self.path, &state).await
    }

    /// Whether neither credential is stored.
    pub async fn is_empty(&self) -> bool {
        let state = self.state.lock().await;
        state.is_empty()
    }
}

pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Write credentials to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it
/// over the target. Permissions are set to 0600 since the file contains
/// live tokens.
async fn write_atomic(path: &Path, data: &HashMap<CredentialKind, Credential>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::CredentialParse(format!("serializing credentials: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("credential path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".credentials.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credentials");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::test_support::mint_token;

    fn credential(suffix: &str, expires_at: u64) -> Credential {
        Credential {
            value: format!("token_{suffix}"),
            expires_at,
            subject_id: 42,
        }
    }

    const FAR_FUTURE: u64 = 4_102_444_800; // 2100-01-01

    #[tokio::test]
    async fn roundtrip_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = CredentialStore::load(path.clone()).await.unwrap();
        store
            .set_session(Session {
                access: credential("a", FAR_FUTURE),
                refresh: credential("r", FAR_FUTURE + 86_400),
            })
            .await
            .unwrap();

        let store2 = CredentialStore::load(path).await.unwrap();
        let access = store2.get(CredentialKind::Access).await.unwrap();
        let refresh = store2.get(CredentialKind::Refresh).await.unwrap();
        assert_eq!(access.value, "token_a");
        assert_eq!(refresh.value, "token_r");
        assert_eq!(access.subject_id, 42);
    }

    #[tokio::test]
    async fn cold_start_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        assert!(!path.exists());
        let store = CredentialStore::load(path.clone()).await.unwrap();
        assert!(store.is_empty().await);
        assert!(path.exists());

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: HashMap<CredentialKind, Credential> =
            serde_json::from_str(&contents).unwrap();
        assert!(parsed.is_empty());
    }

    #[tokio::test]
    async fn absence_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::load(dir.path().join("credentials.json"))
            .await
            .unwrap();
        assert!(store.get(CredentialKind::Access).await.is_none());
        assert!(store.get(CredentialKind::Refresh).await.is_none());
    }

    #[tokio::test]
    async fn expired_entries_evicted_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = CredentialStore::load(path.clone()).await.unwrap();
        store
            .set(CredentialKind::Access, credential("dead", 1))
            .await
            .unwrap();
        store
            .set(CredentialKind::Refresh, credential("alive", FAR_FUTURE))
            .await
            .unwrap();

        let store2 = CredentialStore::load(path).await.unwrap();
        assert!(store2.get(CredentialKind::Access).await.is_none());
        assert!(store2.get(CredentialKind::Refresh).await.is_some());
    }

    #[tokio::test]
    async fn expired_entry_still_readable_within_a_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::load(dir.path().join("credentials.json"))
            .await
            .unwrap();
        store
            .set(CredentialKind::Access, credential("stale", 1))
            .await
            .unwrap();

        // Already expired, but current_user_id-style reads still work.
        let stale = store.get(CredentialKind::Access).await.unwrap();
        assert!(stale.is_expired());
        assert_eq!(stale.subject_id, 42);
    }

    #[tokio::test]
    async fn clear_removes_both_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = CredentialStore::load(path.clone()).await.unwrap();
        store
            .set_session(Session {
                access: credential("a", FAR_FUTURE),
                refresh: credential("r", FAR_FUTURE),
            })
            .await
            .unwrap();
        store.clear().await.unwrap();

        assert!(store.is_empty().await);
        let store2 = CredentialStore::load(path).await.unwrap();
        assert!(store2.is_empty().await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_permissions_are_0600() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = CredentialStore::load(path.clone()).await.unwrap();
        store
            .set(CredentialKind::Access, credential("a", FAR_FUTURE))
            .await
            .unwrap();

        let metadata = tokio::fs::metadata(&path).await.unwrap();
        let mode = metadata.permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "credential file must be 0600, got {mode:o}");
    }

    #[tokio::test]
    async fn concurrent_writes_dont_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = std::sync::Arc::new(CredentialStore::load(path.clone()).await.unwrap());

        let mut handles = vec![];
        for i in 0..10u64 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .set_session(Session {
                        access: credential(&format!("a{i}"), FAR_FUTURE + i),
                        refresh: credential(&format!("r{i}"), FAR_FUTURE + i),
                    })
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        // File is valid JSON and holds exactly one coherent pair.
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: HashMap<CredentialKind, Credential> =
            serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.len(), 2);
        let access = &parsed[&CredentialKind::Access];
        let refresh = &parsed[&CredentialKind::Refresh];
        assert_eq!(
            access.value.trim_start_matches("token_a"),
            refresh.value.trim_start_matches("token_r"),
            "session pair must come from a single set_session call"
        );
    }

    #[tokio::test]
    async fn session_from_pair_decodes_both_tokens() {
        let pair = TokenPair {
            access_token: mint_token(FAR_FUTURE, "access", 7),
            refresh_token: mint_token(FAR_FUTURE + 86_400, "refresh", 7),
        };
        let session = Session::from_pair(&pair).unwrap();
        assert_eq!(session.access.expires_at, FAR_FUTURE);
        assert_eq!(session.refresh.expires_at, FAR_FUTURE + 86_400);
        assert_eq!(session.access.subject_id, 7);
    }

    #[tokio::test]
    async fn session_from_pair_rejects_malformed_access_token() {
        let pair = TokenPair {
            access_token: "garbage".into(),
            refresh_token: mint_token(FAR_FUTURE, "refresh", 7),
        };
        assert!(Session::from_pair(&pair).is_err());
    }

    #[test]
    fn expires_within_margin() {
        let soon = credential("soon", unix_now() + 30);
        let later = credential("later", unix_now() + 120);
        let margin = Duration::from_secs(60);
        assert!(soon.expires_within(margin));
        assert!(!later.expires_within(margin));
    }
}
