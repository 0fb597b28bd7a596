// HTTP route handlers.
//
// Handlers are framework-agnostic: each takes the shared context plus a
// typed request (and the relevant request headers as plain strings) and
// returns a typed response or an ApiError carrying the HTTP status. The
// embedding server does body parsing and header plumbing; everything
// behavioral lives here.

pub mod billing;
pub mod onboard;
pub mod programs;
pub mod register;
pub mod session;
pub mod sign_in;
pub mod verify;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use vcorp_core::db::models::{Address, ProgramMembership, User};
use vcorp_core::error::{ApiError, ErrorCode, VcorpError};
use vcorp_core::program::AccountStatus;

use crate::context::AuthContext;
use crate::cookies;
use crate::session::{validate_session_token, SessionClaims};

/// The user shape returned to callers. Credential material (token and
/// PIN hashes, expiries) never leaves the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Address,
    /// Verification timestamp; absent while unverified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<DateTime<Utc>>,
    pub identity_verified: bool,
    pub status: AccountStatus,
    pub profile_completeness: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_last4: Option<String>,
    pub programs: Vec<ProgramMembership>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone: user.phone.clone(),
            address: user.address.clone(),
            email_verified: user.email_verified,
            identity_verified: user.identity_verified,
            status: user.status,
            profile_completeness: user.profile_completeness,
            card_brand: user.card_brand.clone(),
            card_last4: user.card_last4.clone(),
            programs: user.programs.clone(),
            last_login: user.last_login,
            created_at: user.created_at,
        }
    }
}

/// Collapse an internal error into the ApiError surfaced to callers.
/// Non-API internals become opaque 500s.
pub(crate) fn to_api_error(err: VcorpError) -> ApiError {
    match err {
        VcorpError::Api(api) => api,
        _ => ApiError::internal(ErrorCode::InternalServerError),
    }
}

/// Resolve the signed-in user from a Cookie header: extract the session
/// token, validate the JWT, and re-read the user record so the response
/// reflects current state rather than the claims snapshot.
pub(crate) async fn require_session(
    ctx: &Arc<AuthContext>,
    cookie_header: Option<&str>,
) -> Result<(SessionClaims, User), ApiError> {
    let token = cookie_header
        .and_then(|h| cookies::session_token_from_header(ctx, h))
        .ok_or_else(|| ApiError::unauthorized(ErrorCode::Unauthorized))?;

    let claims = validate_session_token(ctx, &token)
        .ok_or_else(|| ApiError::unauthorized(ErrorCode::Unauthorized))?;

    let user = crate::verification::find_user_by_email(ctx, &claims.email)
        .await
        .map_err(to_api_error)?
        .filter(|u| u.id == claims.user_id)
        .ok_or_else(|| ApiError::unauthorized(ErrorCode::Unauthorized))?;

    Ok((claims, user))
}
