//! Login and refresh wire calls
//!
//! The two token endpoint interactions:
//! 1. `POST /user/login/` — username/password exchange for the initial pair
//! 2. `POST /users/token/refresh/` — refresh token exchange for a new pair
//!
//! Both return the same `{ accessToken, refreshToken }` body. Callers
//! decode the returned tokens via [`crate::claims`] before storing them.

use common::Secret;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Path of the login endpoint, relative to the backend base URL.
pub const LOGIN_PATH: &str = "/user/login/";
/// Path of the token refresh endpoint.
pub const REFRESH_PATH: &str = "/users/token/refresh/";

/// Response body from both token endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Exchange username/password for the initial token pair.
///
/// Any non-success status is an authentication failure from the
/// caller's point of view; the status and body are carried in the error
/// for diagnosis.
pub async fn login(
    client: &reqwest::Client,
    base_url: &str,
    username: &str,
    password: &Secret<String>,
) -> Result<TokenPair> {
    debug!(username, "logging in");
    let response = client
        .post(format!("{base_url}{LOGIN_PATH}"))
        .json(&LoginRequest {
            username,
            password: password.expose(),
        })
        .send()
        .await
        .map_err(|e| Error::Http(format!("login request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::AuthenticationFailed(format!(
            "login returned {status}: {body}"
        )));
    }

    response
        .json::<TokenPair>()
        .await
        .map_err(|e| Error::Http(format!("invalid login response: {e}")))
}

/// Exchange a refresh token for a new token pair.
///
/// 401/403 means the refresh token itself was rejected — the session is
/// dead and the caller must re-authenticate. Other failures are
/// transport-level and may succeed on a later attempt.
pub async fn refresh_token(
    client: &reqwest::Client,
    base_url: &str,
    refresh: &str,
) -> Result<TokenPair> {
    let response = client
        .post(format!("{base_url}{REFRESH_PATH}"))
        .json(&RefreshRequest {
            refresh_token: refresh,
        })
        .send()
        .await
        .map_err(|e| Error::Http(format!("refresh request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(Error::RefreshRejected(format!(
                "refresh endpoint returned {status}: {body}"
            )));
        }

        return Err(Error::Http(format!(
            "refresh endpoint returned {status}: {body}"
        )));
    }

    response
        .json::<TokenPair>()
        .await
        .map_err(|e| Error::Http(format!("invalid refresh response: {e}")))
}
