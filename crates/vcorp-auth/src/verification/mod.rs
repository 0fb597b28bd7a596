// Credential issue and verification.
//
// Two sign-in credentials share one lifecycle: a 64-hex-char magic-link
// token valid for 24 hours, and a hashed 6-digit PIN valid for 5 minutes.
// Issuing a credential overwrites any outstanding one of the same kind.
// Successful verification applies the activation side effects in a single
// update: emailVerified, status active, lastLogin, and a recomputed
// profile completeness. A magic link stays usable for its whole window
// (email scanners follow links); a PIN is cleared on first use.

use chrono::{DateTime, Duration, Utc};

use vcorp_core::db::models::{self, from_value, User, USERS};
use vcorp_core::db::WhereClause;
use vcorp_core::error::{ApiError, ErrorCode, VcorpError};
use vcorp_core::program::AccountStatus;

use crate::context::AuthContext;
use crate::crypto::{constant_time_equal, pin, random};
use crate::profile::profile_completeness;

/// Look up a user by email (lowercased). Returns None when absent.
pub async fn find_user_by_email(
    ctx: &AuthContext,
    email: &str,
) -> Result<Option<User>, VcorpError> {
    let found = ctx
        .adapter
        .find_one(USERS, &[WhereClause::eq("email", email.to_lowercase())])
        .await?;
    found.map(from_value).transpose()
}

/// Issue a magic-link token for a user, replacing any outstanding one.
/// Returns the raw token for embedding in the sign-in link.
pub async fn issue_magic_link(
    ctx: &AuthContext,
    user: &User,
    now: DateTime<Utc>,
) -> Result<String, VcorpError> {
    let token = random::generate_login_token();
    let expiry = now + Duration::seconds(ctx.options.credentials.magic_link_expires_in as i64);

    ctx.adapter
        .update(
            USERS,
            &[WhereClause::eq("id", user.id.as_str())],
            serde_json::json!({
                "loginToken": token,
                "loginTokenExpiry": expiry.to_rfc3339(),
                "updatedAt": now.to_rfc3339(),
            }),
        )
        .await?
        .ok_or_else(|| VcorpError::from(ApiError::not_found(ErrorCode::UserNotFound)))?;

    Ok(token)
}

/// Issue a sign-in PIN for a user, replacing any outstanding one. Only
/// the scrypt hash is stored; the raw PIN is returned for the email.
pub async fn issue_pin(
    ctx: &AuthContext,
    user: &User,
    now: DateTime<Utc>,
) -> Result<String, VcorpError> {
    let raw_pin = random::generate_pin();
    let pin_hash = pin::hash_pin(&raw_pin)?;
    let expiry = now + Duration::seconds(ctx.options.credentials.pin_expires_in as i64);

    ctx.adapter
        .update(
            USERS,
            &[WhereClause::eq("id", user.id.as_str())],
            serde_json::json!({
                "loginPin": pin_hash,
                "loginPinExpiry": expiry.to_rfc3339(),
                "updatedAt": now.to_rfc3339(),
            }),
        )
        .await?
        .ok_or_else(|| VcorpError::from(ApiError::not_found(ErrorCode::UserNotFound)))?;

    Ok(raw_pin)
}

/// Verify a magic-link token for the given email. On success, applies
/// the activation side effects and returns the refreshed user. The token
/// is NOT cleared: it stays valid until its expiry so a link pre-fetched
/// by a mail scanner does not burn the user's sign-in.
pub async fn verify_magic_link(
    ctx: &AuthContext,
    email: &str,
    token: &str,
    now: DateTime<Utc>,
) -> Result<User, VcorpError> {
    let user = find_user_by_email(ctx, email)
        .await?
        .ok_or_else(|| VcorpError::from(ApiError::unauthorized(ErrorCode::InvalidCredential)))?;

    let stored = user
        .login_token
        .as_deref()
        .ok_or_else(|| VcorpError::from(ApiError::unauthorized(ErrorCode::InvalidCredential)))?;

    if !constant_time_equal(stored.as_bytes(), token.as_bytes()) {
        return Err(ApiError::unauthorized(ErrorCode::InvalidCredential).into());
    }

    match user.login_token_expiry {
        Some(expiry) if expiry > now => {}
        _ => return Err(ApiError::gone(ErrorCode::CredentialExpired).into()),
    }

    activate_user(ctx, &user, now, serde_json::Map::new()).await
}

/// Verify a sign-in PIN for the given email. On success, applies the
/// activation side effects, clears the PIN, and returns the refreshed
/// user. PINs are single-use.
pub async fn verify_pin(
    ctx: &AuthContext,
    email: &str,
    candidate: &str,
    now: DateTime<Utc>,
) -> Result<User, VcorpError> {
    if !pin::is_valid_pin_format(candidate) {
        return Err(ApiError::bad_request(ErrorCode::InvalidPinFormat).into());
    }

    let user = find_user_by_email(ctx, email)
        .await?
        .ok_or_else(|| VcorpError::from(ApiError::unauthorized(ErrorCode::InvalidCredential)))?;

    let stored = user
        .login_pin
        .as_deref()
        .ok_or_else(|| VcorpError::from(ApiError::unauthorized(ErrorCode::InvalidCredential)))?;

    if !pin::verify_pin_hash(stored, candidate)? {
        return Err(ApiError::unauthorized(ErrorCode::InvalidCredential).into());
    }

    match user.login_pin_expiry {
        Some(expiry) if expiry > now => {}
        _ => return Err(ApiError::gone(ErrorCode::CredentialExpired).into()),
    }

    let mut extra = serde_json::Map::new();
    extra.insert("loginPin".into(), serde_json::Value::Null);
    extra.insert("loginPinExpiry".into(), serde_json::Value::Null);

    activate_user(ctx, &user, now, extra).await
}

/// Apply the activation side effects in one update: stamp emailVerified
/// (kept if already set), status active, lastLogin, recomputed
/// completeness, plus any credential-clearing fields the caller adds.
async fn activate_user(
    ctx: &AuthContext,
    user: &User,
    now: DateTime<Utc>,
    mut extra: serde_json::Map<String, serde_json::Value>,
) -> Result<User, VcorpError> {
    let verified_at = user.email_verified.unwrap_or(now);

    // Completeness reflects the post-verification state.
    let mut projected = user.clone();
    projected.email_verified = Some(verified_at);
    let completeness = profile_completeness(&projected);

    extra.insert(
        "emailVerified".into(),
        serde_json::json!(verified_at.to_rfc3339()),
    );
    extra.insert(
        "status".into(),
        serde_json::to_value(AccountStatus::Active)
            .map_err(|e| VcorpError::Other(e.to_string()))?,
    );
    extra.insert("lastLogin".into(), serde_json::json!(now.to_rfc3339()));
    extra.insert(
        "profileCompleteness".into(),
        serde_json::json!(completeness),
    );
    extra.insert("updatedAt".into(), serde_json::json!(now.to_rfc3339()));

    let updated = ctx
        .adapter
        .update(
            USERS,
            &[WhereClause::eq("id", user.id.as_str())],
            serde_json::Value::Object(extra),
        )
        .await?
        .ok_or_else(|| VcorpError::from(ApiError::not_found(ErrorCode::UserNotFound)))?;

    models::from_value(updated)
}
