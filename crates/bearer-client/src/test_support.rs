//! Shared helpers for this crate's tests.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use bearer_auth::{Credential, CredentialStore, Session};

pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Mint an unsigned token carrying the given claims. Nothing in this
/// workspace verifies signatures, so the last segment is garbage.
pub fn mint_token(exp: u64, token_type: &str, user_id: i64) -> String {
    let b64 = |b: &[u8]| URL_SAFE_NO_PAD.encode(b);
    let header = b64(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = serde_json::json!({
        "exp": exp,
        "token_type": token_type,
        "user_id": user_id,
    });
    let payload = b64(payload.to_string().as_bytes());
    format!("{header}.{payload}.{}", b64(b"sig"))
}

/// A store on a temp dir holding a session whose tokens expire at the
/// given times. The temp dir must be kept alive by the caller.
pub async fn seeded_store(
    access_exp: u64,
    refresh_exp: u64,
) -> (tempfile::TempDir, Arc<CredentialStore>) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        CredentialStore::load(dir.path().join("credentials.json"))
            .await
            .unwrap(),
    );
    store
        .set_session(Session {
            access: Credential::from_token(mint_token(access_exp, "access", 1)).unwrap(),
            refresh: Credential::from_token(mint_token(refresh_exp, "refresh", 1)).unwrap(),
        })
        .await
        .unwrap();
    (dir, store)
}
