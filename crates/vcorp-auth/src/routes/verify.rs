// Verification routes: redeem a magic link or a PIN for a session.
//
// Both paths end the same way: activation side effects applied, a JWT
// minted, and the Set-Cookie value for the session cookie returned to
// the embedding server. Redirect targets are only honored when their
// origin is on the trust list; a redirect into a program site also
// runs the access gate, so members not yet onboarded detour to
// onboarding instead of landing on a page that will bounce them.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use vcorp_core::db::models::User;
use vcorp_core::error::{ApiError, ErrorCode};

use crate::context::AuthContext;
use crate::cookies::build_session_cookie;
use crate::enrollment::{check_access, AccessOutcome};
use crate::resolver;
use crate::session::mint_session_token;
use crate::verification;

use super::{to_api_error, UserView};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyMagicLinkRequest {
    pub email: String,
    pub token: String,
    #[serde(default)]
    pub redirect: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPinRequest {
    pub email: String,
    pub pin: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub user: UserView,
    pub token: String,
    /// Set-Cookie header value for the session cookie.
    #[serde(skip)]
    pub set_cookie: String,
    /// Trusted redirect target with the session token appended, when
    /// the caller supplied one and access was allowed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    /// Onboarding detour, when the redirect targets a program the user
    /// is not an active member of.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onboarding_url: Option<String>,
}

fn issue_session(ctx: &AuthContext, user: &User) -> Result<(String, String), ApiError> {
    let token = mint_session_token(ctx, user).map_err(to_api_error)?;
    let cookie = build_session_cookie(ctx, &token);
    Ok((token, cookie))
}

/// Redeem a magic-link token.
///
/// The token stays valid until expiry, so a link opened by a mail
/// scanner and then by the user works both times. The redirect is
/// validated against the trust list; an untrusted target is a 400, not
/// a silent drop, so misconfigured program sites surface immediately.
pub async fn handle_verify_magic_link(
    ctx: Arc<AuthContext>,
    body: VerifyMagicLinkRequest,
) -> Result<VerifyResponse, ApiError> {
    let now = Utc::now();

    let redirect = match body.redirect.as_deref().filter(|r| !r.is_empty()) {
        Some(target) => Some(
            resolver::sanitize_redirect(&ctx.options, target)
                .ok_or_else(|| ApiError::bad_request(ErrorCode::InvalidRedirectUrl))?,
        ),
        None => None,
    };

    let user = verification::verify_magic_link(&ctx, &body.email, &body.token, now)
        .await
        .map_err(to_api_error)?;

    // A redirect into a program site goes through the access gate; the
    // gate's token (fresh snapshot, post-activation) backs the cookie.
    if let Some(target) = redirect {
        if let Some(program) = resolver::resolve_program_from_origin(&ctx.options, target) {
            let check = check_access(&ctx, &user, program, Some(target), now)
                .await
                .map_err(to_api_error)?;
            ctx.logger
                .success(&format!("Magic-link sign-in for user {}", user.id));
            return Ok(match check.outcome {
                AccessOutcome::Allow {
                    token,
                    redirect_url,
                } => VerifyResponse {
                    user: UserView::from(&user),
                    set_cookie: build_session_cookie(&ctx, &token),
                    token,
                    redirect_url,
                    onboarding_url: None,
                },
                AccessOutcome::RequireOnboarding { onboarding_url } => {
                    let (token, set_cookie) = issue_session(&ctx, &user)?;
                    VerifyResponse {
                        user: UserView::from(&user),
                        token,
                        set_cookie,
                        redirect_url: None,
                        onboarding_url: Some(onboarding_url),
                    }
                }
            });
        }
    }

    let (token, set_cookie) = issue_session(&ctx, &user)?;
    ctx.logger
        .success(&format!("Magic-link sign-in for user {}", user.id));

    Ok(VerifyResponse {
        user: UserView::from(&user),
        token,
        set_cookie,
        redirect_url: redirect.map(str::to_string),
        onboarding_url: None,
    })
}

/// Redeem a sign-in PIN. PINs are single-use and cleared here.
pub async fn handle_verify_pin(
    ctx: Arc<AuthContext>,
    body: VerifyPinRequest,
) -> Result<VerifyResponse, ApiError> {
    let now = Utc::now();

    let user = verification::verify_pin(&ctx, &body.email, &body.pin, now)
        .await
        .map_err(to_api_error)?;

    let (token, set_cookie) = issue_session(&ctx, &user)?;
    ctx.logger.success(&format!("PIN sign-in for user {}", user.id));

    Ok(VerifyResponse {
        user: UserView::from(&user),
        token,
        set_cookie,
        redirect_url: None,
        onboarding_url: None,
    })
}
