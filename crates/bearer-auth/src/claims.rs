//! JWT claim decoding
//!
//! Reads the expiry, token type, and subject claims out of a compact
//! JWS without verifying the signature — the backend is the verifier,
//! the client only needs to know when to refresh and who is logged in.
//! Decoding is pure and deterministic, so the pipeline can run it on
//! every request.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::error::DecodeError;

/// Claims this client reads from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Expiry as a unix timestamp in seconds (absolute, not a delta)
    pub exp: u64,
    /// "access" or "refresh"
    pub token_type: String,
    /// Subject id of the authenticated user
    pub user_id: i64,
}

/// Raw payload shape. Fields are optional so a missing claim surfaces
/// as `MissingClaim` rather than an opaque serde message.
#[derive(Deserialize)]
struct RawClaims {
    exp: Option<u64>,
    token_type: Option<String>,
    user_id: Option<i64>,
}

/// Decode the payload segment of a compact JWS into [`Claims`].
///
/// Fails on anything other than three dot-separated segments, a
/// non-base64url payload, non-JSON claims, or a missing required claim.
pub fn decode(token: &str) -> std::result::Result<Claims, DecodeError> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(DecodeError::Malformed(
            "expected three dot-separated segments".into(),
        ));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| DecodeError::Payload(format!("payload is not base64url: {e}")))?;
    let raw: RawClaims = serde_json::from_slice(&bytes)
        .map_err(|e| DecodeError::Payload(format!("claims are not valid JSON: {e}")))?;

    Ok(Claims {
        exp: raw.exp.ok_or(DecodeError::MissingClaim("exp"))?,
        token_type: raw.token_type.ok_or(DecodeError::MissingClaim("token_type"))?,
        user_id: raw.user_id.ok_or(DecodeError::MissingClaim("user_id"))?,
    })
}
