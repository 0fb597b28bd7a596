// Program routes: the federated sign-in entry point used by program
// sites, the membership listing, and membership add/remove.
//
// Federated sign-in is the one non-enumerating surface: unknown and
// known emails get the same response, because program sites embed this
// form on public pages. The internal sign-in routes surface
// `UserNotFound` instead.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use vcorp_core::db::models::{to_value, ProgramMembership, USERS};
use vcorp_core::db::WhereClause;
use vcorp_core::error::{ApiError, ErrorCode};
use vcorp_core::program::{MembershipStatus, ProgramId};

use crate::context::AuthContext;
use crate::enrollment::check_access;
use crate::mailer::magic_link_email;
use crate::resolver;
use crate::verification;

use super::register::build_magic_link;
use super::{require_session, to_api_error};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSignInRequest {
    pub email: String,
    /// Explicit program, used only when neither the origin nor the
    /// redirect resolves.
    #[serde(default)]
    pub program: Option<String>,
    /// Where the program site wants the user back after sign-in.
    #[serde(default)]
    pub redirect: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSignInResponse {
    pub sent: bool,
}

/// Federated sign-in from a program site.
///
/// The redirect is trust-checked before anything else; an untrusted
/// target is rejected with no side effects at all. For a known user
/// the access check runs (recording a pending membership on first
/// contact) and a magic link goes out carrying the redirect. Unknown
/// emails fall through to the same `sent` response.
pub async fn handle_external_sign_in(
    ctx: Arc<AuthContext>,
    body: ExternalSignInRequest,
    origin: Option<&str>,
) -> Result<ExternalSignInResponse, ApiError> {
    let now = Utc::now();

    // Trust check first: nothing below runs for a phishing target.
    let redirect = match body.redirect.as_deref().filter(|r| !r.is_empty()) {
        Some(target) => Some(
            resolver::sanitize_redirect(&ctx.options, target)
                .ok_or_else(|| ApiError::bad_request(ErrorCode::InvalidRedirectUrl))?,
        ),
        None => None,
    };

    let program = resolver::resolve_program(&ctx.options, origin, body.program.as_deref())
        .or_else(|| {
            redirect.and_then(|r| resolver::resolve_program_from_origin(&ctx.options, r))
        })
        .ok_or_else(|| ApiError::bad_request(ErrorCode::InvalidProgram))?;

    let user = match verification::find_user_by_email(&ctx, &body.email)
        .await
        .map_err(to_api_error)?
    {
        Some(user) => user,
        // Same response as the success path: no account probing.
        None => return Ok(ExternalSignInResponse { sent: true }),
    };

    check_access(&ctx, &user, program, redirect, now)
        .await
        .map_err(to_api_error)?;

    let token = verification::issue_magic_link(&ctx, &user, now)
        .await
        .map_err(to_api_error)?;
    let link = build_magic_link(&ctx, &user.email, &token, redirect);

    if let Err(err) = ctx
        .mailer
        .send(magic_link_email(&user.email, program, &link))
        .await
    {
        ctx.logger
            .warn(&format!("Sign-in email to {} failed: {err}", user.email));
    }

    Ok(ExternalSignInResponse { sent: true })
}

// ─── Membership Listing & Maintenance ────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramsResponse {
    pub programs: Vec<ProgramMembership>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramMutationRequest {
    pub program: String,
    #[serde(default)]
    pub tier: Option<String>,
}

/// List the signed-in user's program memberships.
pub async fn handle_user_programs(
    ctx: Arc<AuthContext>,
    cookie_header: Option<&str>,
) -> Result<ProgramsResponse, ApiError> {
    let (_claims, user) = require_session(&ctx, cookie_header).await?;
    Ok(ProgramsResponse {
        programs: user.programs,
    })
}

/// Add a pending membership for the signed-in user. Support tooling;
/// onboarding is still what flips a membership active.
pub async fn handle_add_program(
    ctx: Arc<AuthContext>,
    body: ProgramMutationRequest,
    cookie_header: Option<&str>,
) -> Result<ProgramsResponse, ApiError> {
    let (_claims, user) = require_session(&ctx, cookie_header).await?;
    let program = ProgramId::parse(&body.program)
        .ok_or_else(|| ApiError::bad_request(ErrorCode::InvalidProgram))?;

    if user.membership(program).is_some() {
        return Err(ApiError::conflict(ErrorCode::AlreadyOnboarded));
    }

    let now = Utc::now();
    let mut programs = user.programs;
    programs.push(ProgramMembership {
        program,
        tier: body.tier,
        status: MembershipStatus::Pending,
        joined_at: now,
        program_data: None,
    });
    persist_programs(&ctx, &user.id, &programs, now).await?;

    Ok(ProgramsResponse { programs })
}

/// Remove a membership from the signed-in user. The program account,
/// if one exists, is left in place.
pub async fn handle_remove_program(
    ctx: Arc<AuthContext>,
    body: ProgramMutationRequest,
    cookie_header: Option<&str>,
) -> Result<ProgramsResponse, ApiError> {
    let (_claims, user) = require_session(&ctx, cookie_header).await?;
    let program = ProgramId::parse(&body.program)
        .ok_or_else(|| ApiError::bad_request(ErrorCode::InvalidProgram))?;

    let mut programs = user.programs;
    let before = programs.len();
    programs.retain(|m| m.program != program);
    if programs.len() == before {
        return Err(ApiError::not_found(ErrorCode::InvalidProgram));
    }
    persist_programs(&ctx, &user.id, &programs, Utc::now()).await?;

    Ok(ProgramsResponse { programs })
}

async fn persist_programs(
    ctx: &AuthContext,
    user_id: &str,
    programs: &[ProgramMembership],
    now: chrono::DateTime<Utc>,
) -> Result<(), ApiError> {
    ctx.adapter
        .update(
            USERS,
            &[WhereClause::eq("id", user_id)],
            serde_json::json!({
                "programs": to_value(&programs).map_err(to_api_error)?,
                "updatedAt": now.to_rfc3339(),
            }),
        )
        .await
        .map_err(to_api_error)?;
    Ok(())
}
