// Onboarding route. Session-gated: the payment method and dependents
// always attach to the signed-in user, never to an email in the body.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use vcorp_core::db::models::{Dependent, ProgramAccount};
use vcorp_core::error::{ApiError, ErrorCode};

use crate::context::AuthContext;
use crate::cookies::build_session_cookie;
use crate::enrollment::{complete_onboarding, OnboardingRequest};
use crate::resolver;
use crate::session::mint_session_token;
use crate::verification;

use super::{require_session, to_api_error};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardRequest {
    /// Explicit program, used only when the origin does not resolve.
    #[serde(default)]
    pub program: Option<String>,
    #[serde(flatten)]
    pub onboarding: OnboardingRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardResponse {
    pub account: ProgramAccount,
    pub dependents: Vec<Dependent>,
    /// Whether the immediate first charge went through. Onboarding
    /// succeeds either way; a failed charge is retried by the sweep.
    pub charge_success: bool,
    /// Fresh session token carrying the now-active membership.
    pub token: String,
    /// Set-Cookie header value for the refreshed session cookie.
    #[serde(skip)]
    pub set_cookie: String,
}

/// Complete onboarding for the signed-in user.
///
/// 1. Gate on the session cookie
/// 2. Resolve the serving program from the origin
/// 3. Run onboarding: customer, account, dependents, first charge
/// 4. Re-issue the session so its claims include the new membership
pub async fn handle_onboard(
    ctx: Arc<AuthContext>,
    body: OnboardRequest,
    origin: Option<&str>,
    cookie_header: Option<&str>,
) -> Result<OnboardResponse, ApiError> {
    let (_claims, user) = require_session(&ctx, cookie_header).await?;

    let program = resolver::resolve_program(&ctx.options, origin, body.program.as_deref())
        .ok_or_else(|| ApiError::bad_request(ErrorCode::InvalidProgram))?;

    let result = complete_onboarding(&ctx, &user, program, body.onboarding, Utc::now())
        .await
        .map_err(to_api_error)?;

    // Re-read so the token snapshot reflects the flipped membership.
    let user = verification::find_user_by_email(&ctx, &user.email)
        .await
        .map_err(to_api_error)?
        .unwrap_or(user);
    let token = mint_session_token(&ctx, &user).map_err(to_api_error)?;
    let set_cookie = build_session_cookie(&ctx, &token);

    Ok(OnboardResponse {
        account: result.account,
        dependents: result.dependents,
        charge_success: result.charge_success,
        token,
        set_cookie,
    })
}
