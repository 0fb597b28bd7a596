// Internal sign-in routes: magic-link and PIN requests from the
// platform's own sites. Unknown emails surface `UserNotFound` here so
// the sign-in page can offer registration; the federated variant in
// `routes::programs` is the non-enumerating one.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use vcorp_core::error::{ApiError, ErrorCode};

use crate::context::AuthContext;
use crate::mailer::{magic_link_email, pin_email};
use crate::resolver;
use crate::verification;

use super::register::build_magic_link;
use super::to_api_error;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub email: String,
    /// Explicit program, used only when the origin does not resolve.
    #[serde(default)]
    pub program: Option<String>,
    /// Where the magic link should land the user after verification.
    #[serde(default)]
    pub callback_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub sent: bool,
    /// Whether the email delivery itself succeeded; the issued
    /// credential stays valid either way.
    pub email_sent: bool,
}

/// Request a magic-link email.
pub async fn handle_sign_in(
    ctx: Arc<AuthContext>,
    body: SignInRequest,
    origin: Option<&str>,
) -> Result<SignInResponse, ApiError> {
    let now = Utc::now();
    let program = resolver::resolve_program(&ctx.options, origin, body.program.as_deref())
        .ok_or_else(|| ApiError::bad_request(ErrorCode::InvalidProgram))?;

    let user = verification::find_user_by_email(&ctx, &body.email)
        .await
        .map_err(to_api_error)?
        .ok_or_else(|| ApiError::not_found(ErrorCode::UserNotFound))?;

    let token = verification::issue_magic_link(&ctx, &user, now)
        .await
        .map_err(to_api_error)?;
    let link = build_magic_link(&ctx, &user.email, &token, body.callback_url.as_deref());

    let email_sent = match ctx
        .mailer
        .send(magic_link_email(&user.email, program, &link))
        .await
    {
        Ok(()) => true,
        Err(err) => {
            ctx.logger
                .warn(&format!("Sign-in email to {} failed: {err}", user.email));
            false
        }
    };

    Ok(SignInResponse {
        sent: true,
        email_sent,
    })
}

/// Request a 6-digit sign-in PIN by email.
pub async fn handle_request_pin(
    ctx: Arc<AuthContext>,
    body: SignInRequest,
    origin: Option<&str>,
) -> Result<SignInResponse, ApiError> {
    let now = Utc::now();
    let program = resolver::resolve_program(&ctx.options, origin, body.program.as_deref())
        .ok_or_else(|| ApiError::bad_request(ErrorCode::InvalidProgram))?;

    let user = verification::find_user_by_email(&ctx, &body.email)
        .await
        .map_err(to_api_error)?
        .ok_or_else(|| ApiError::not_found(ErrorCode::UserNotFound))?;

    let pin = verification::issue_pin(&ctx, &user, now)
        .await
        .map_err(to_api_error)?;

    let email_sent = match ctx.mailer.send(pin_email(&user.email, program, &pin)).await {
        Ok(()) => true,
        Err(err) => {
            ctx.logger
                .warn(&format!("PIN email to {} failed: {err}", user.email));
            false
        }
    };

    Ok(SignInResponse {
        sent: true,
        email_sent,
    })
}
