// Registration route.
//
// Creates the payment-provider customer and the user in pending status
// with a pending membership for the serving program, then issues a
// magic link and emails it. A failed email send does not roll the
// registration back; the user can request a fresh link from the
// sign-in page.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vcorp_core::db::models::{to_value, Address, ProgramMembership, User, USERS};
use vcorp_core::error::{ApiError, ErrorCode, HttpStatus};
use vcorp_core::program::{AccountStatus, MembershipStatus};

use crate::context::AuthContext;
use crate::enrollment::encode_query_value;
use crate::mailer::magic_link_email;
use crate::profile::profile_completeness;
use crate::resolver;
use crate::verification;

use super::{to_api_error, UserView};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<DateTime<Utc>>,
    #[serde(default)]
    pub address: Address,
    /// Explicit program, used only when the origin does not resolve.
    #[serde(default)]
    pub program: Option<String>,
    /// Where the magic link should land the user after verification.
    #[serde(default)]
    pub callback_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user: UserView,
    /// Whether the sign-in email went out.
    pub email_sent: bool,
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && domain.contains('.'),
        None => false,
    }
}

/// Handle registration.
///
/// 1. Validate the email and resolve the serving program
/// 2. Reject duplicate emails with 409
/// 3. Create the payment-provider customer
/// 4. Create the user, pending, with a pending program membership
/// 5. Issue a magic link and email it (failure downgraded to a warning)
pub async fn handle_register(
    ctx: Arc<AuthContext>,
    body: RegisterRequest,
    origin: Option<&str>,
) -> Result<RegisterResponse, ApiError> {
    let now = Utc::now();

    // 1. Validate inputs
    if !is_valid_email(&body.email) {
        return Err(ApiError::with_message(
            HttpStatus::BadRequest,
            ErrorCode::MissingRequiredField,
            "A valid email is required",
        ));
    }
    let program = resolver::resolve_program(&ctx.options, origin, body.program.as_deref())
        .ok_or_else(|| ApiError::bad_request(ErrorCode::InvalidProgram))?;

    let email = body.email.to_lowercase();

    // 2. Duplicate check
    if verification::find_user_by_email(&ctx, &email)
        .await
        .map_err(to_api_error)?
        .is_some()
    {
        return Err(ApiError::conflict(ErrorCode::UserAlreadyExists));
    }

    // 3. Payment-provider customer. Nothing is committed yet, so a
    // provider failure aborts registration cleanly.
    let name = format!(
        "{} {}",
        body.first_name.as_deref().unwrap_or(""),
        body.last_name.as_deref().unwrap_or("")
    )
    .trim()
    .to_string();
    let customer_id = ctx
        .payments
        .create_customer(&email, &name)
        .await
        .map_err(|err| {
            ctx.logger
                .error(&format!("Customer creation failed for {email}: {err}"));
            ApiError::upstream(ErrorCode::PaymentFailed)
        })?;

    // 4. Create the user
    let mut user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email,
        first_name: body.first_name,
        last_name: body.last_name,
        phone: body.phone,
        date_of_birth: body.date_of_birth,
        address: body.address,
        email_verified: None,
        identity_verified: false,
        status: AccountStatus::Pending,
        profile_completeness: 0,
        login_token: None,
        login_token_expiry: None,
        login_pin: None,
        login_pin_expiry: None,
        stripe_customer_id: Some(customer_id),
        payment_method_id: None,
        card_brand: None,
        card_last4: None,
        last_login: None,
        programs: vec![ProgramMembership {
            program,
            tier: None,
            status: MembershipStatus::Pending,
            joined_at: now,
            program_data: None,
        }],
        created_at: now,
        updated_at: now,
    };
    user.profile_completeness = profile_completeness(&user);

    ctx.adapter
        .create(USERS, to_value(&user).map_err(to_api_error)?)
        .await
        .map_err(to_api_error)?;

    ctx.logger
        .info(&format!("Registered user {} for {}", user.id, program));

    // 5. Magic link
    let token = verification::issue_magic_link(&ctx, &user, now)
        .await
        .map_err(to_api_error)?;
    let link = build_magic_link(&ctx, &user.email, &token, body.callback_url.as_deref());

    let message = magic_link_email(&user.email, program, &link);
    let email_sent = match ctx.mailer.send(message).await {
        Ok(()) => true,
        Err(err) => {
            ctx.logger
                .warn(&format!("Sign-in email to {} failed: {err}", user.email));
            false
        }
    };

    Ok(RegisterResponse {
        user: UserView::from(&user),
        email_sent,
    })
}

/// Build the verification URL embedded in the magic-link email. An
/// untrusted callback target is dropped, never forwarded.
pub(crate) fn build_magic_link(
    ctx: &AuthContext,
    email: &str,
    token: &str,
    redirect: Option<&str>,
) -> String {
    let base = ctx.options.base_url.as_deref().unwrap_or("");
    let mut link = format!(
        "{base}/api/auth/verify-magic-link?email={}&token={token}",
        encode_query_value(email)
    );
    if let Some(redirect) = redirect.and_then(|r| resolver::sanitize_redirect(&ctx.options, r)) {
        link.push_str(&format!("&redirect={}", encode_query_value(redirect)));
    }
    link
}
