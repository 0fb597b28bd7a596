// Session routes: read the current session and sign out.

use std::sync::Arc;

use serde::Serialize;

use vcorp_core::error::ApiError;

use crate::context::AuthContext;
use crate::cookies::{build_session_cookie, clear_session_cookie};
use crate::session::mint_session_token;

use super::{require_session, to_api_error, UserView};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: UserView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOutResponse {
    pub success: bool,
    /// Set-Cookie header value that clears the session cookie.
    #[serde(skip)]
    pub set_cookie: String,
}

/// Return the signed-in user, re-read from the database so membership
/// and profile changes made after sign-in are visible.
pub async fn handle_get_session(
    ctx: Arc<AuthContext>,
    cookie_header: Option<&str>,
) -> Result<SessionResponse, ApiError> {
    let (_claims, user) = require_session(&ctx, cookie_header).await?;
    Ok(SessionResponse {
        user: UserView::from(&user),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub token: String,
    /// Set-Cookie header value for the refreshed session cookie.
    #[serde(skip)]
    pub set_cookie: String,
}

/// Re-issue the session token from current database state, so claims
/// pick up memberships and payment details added since sign-in. The
/// old cookie keeps working until its own expiry.
pub async fn handle_refresh_token(
    ctx: Arc<AuthContext>,
    cookie_header: Option<&str>,
) -> Result<RefreshResponse, ApiError> {
    let (_claims, user) = require_session(&ctx, cookie_header).await?;
    let token = mint_session_token(&ctx, &user).map_err(to_api_error)?;
    let set_cookie = build_session_cookie(&ctx, &token);
    Ok(RefreshResponse { token, set_cookie })
}

/// Sign out. Sessions are stateless JWTs, so signing out is clearing
/// the cookie; the token itself ages out at its expiry.
pub async fn handle_sign_out(ctx: Arc<AuthContext>) -> Result<SignOutResponse, ApiError> {
    Ok(SignOutResponse {
        success: true,
        set_cookie: clear_session_cookie(&ctx),
    })
}
