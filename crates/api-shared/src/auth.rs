//! Viewer claim extraction.
//!
//! The identity provider sits in front of this service and installs the
//! verified role, identity and session of the caller as trusted headers.
//! The engine never authenticates credentials itself, and no endpoint
//! accepts a role claim in its request body.

use axum::http::HeaderMap;
use cmr_core::Role;

/// Header installed by the gateway carrying the verified role.
pub const VIEWER_ROLE_HEADER: &str = "x-viewer-role";
/// Header carrying the verified display identity (name or email).
pub const VIEWER_ID_HEADER: &str = "x-viewer-id";
/// Header carrying the opaque session id used for verification grants.
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// The verified caller, as asserted by the identity provider.
#[derive(Clone, Debug)]
pub struct ViewerClaims {
    pub role: Role,
    pub identity: String,
    pub session_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ClaimsError {
    #[error("missing {VIEWER_ROLE_HEADER} header")]
    MissingRole,
    #[error("unrecognised viewer role: {0}")]
    InvalidRole(String),
    #[error("missing {VIEWER_ID_HEADER} header")]
    MissingIdentity,
}

/// Extracts the viewer claims from the trusted gateway headers.
///
/// # Errors
///
/// Returns a `ClaimsError` when the role header is absent or carries an
/// unknown role, or when the identity header is absent.
pub fn viewer_claims(headers: &HeaderMap) -> Result<ViewerClaims, ClaimsError> {
    let role_raw = headers
        .get(VIEWER_ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ClaimsError::MissingRole)?;
    let role: Role = role_raw
        .parse()
        .map_err(|_| ClaimsError::InvalidRole(role_raw.to_string()))?;

    let identity = headers
        .get(VIEWER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.trim().is_empty())
        .ok_or(ClaimsError::MissingIdentity)?
        .to_string();

    let session_id = headers
        .get(SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.to_string());

    Ok(ViewerClaims {
        role,
        identity,
        session_id,
    })
}
