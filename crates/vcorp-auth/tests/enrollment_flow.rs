// Enrollment flows: external access checks, pending membership
// creation, and onboarding with payment collection.

mod common;

use chrono::Utc;

use vcorp_auth::enrollment::{self, check_access, AccessOutcome, OnboardingRequest};
use vcorp_auth::routes::onboard::{handle_onboard, OnboardRequest};
use vcorp_auth::routes::programs::{handle_external_sign_in, ExternalSignInRequest};
use vcorp_auth::routes::register::{handle_register, RegisterRequest};
use vcorp_auth::routes::verify::{handle_verify_magic_link, VerifyMagicLinkRequest};
use vcorp_auth::verification;
use vcorp_core::error::ErrorCode;
use vcorp_core::program::{ChargeFrequency, MembershipStatus, ProgramId};

use common::{platform, token_from_email, TestPlatform};

const ORIGIN: Option<&str> = Some("http://localhost:3002"); // fyht4 dev port

/// Register, verify, and return a session cookie header value.
async fn signed_in_user(p: &TestPlatform, email: &str) -> String {
    let request: RegisterRequest = serde_json::from_value(serde_json::json!({
        "email": email,
        "firstName": "Ada",
        "lastName": "Lovelace",
    }))
    .unwrap();
    handle_register(p.ctx.clone(), request, ORIGIN).await.unwrap();
    let token = token_from_email(&p.mailer.last().unwrap());
    let verified = handle_verify_magic_link(
        p.ctx.clone(),
        VerifyMagicLinkRequest {
            email: email.into(),
            token,
            redirect: None,
        },
    )
    .await
    .unwrap();
    format!("vcorp_auth_token={}", verified.token)
}

fn onboard_request(amount: f64) -> OnboardRequest {
    serde_json::from_value(serde_json::json!({
        "paymentMethodId": "pm_visa",
        "amount": amount,
        "frequency": "monthly",
        "dependents": [
            { "firstName": "Kid", "lastName": "One" },
            { "firstName": "Kid", "lastName": "Two" },
        ],
    }))
    .unwrap()
}

#[tokio::test]
async fn test_external_sign_in_does_not_enumerate() {
    let p = platform();
    signed_in_user(&p, "known@example.com").await;
    let emails_before = p.mailer.count();

    // Known user, no taekwondo membership yet: a pending membership is
    // recorded and a sign-in email goes out.
    let known = handle_external_sign_in(
        p.ctx.clone(),
        ExternalSignInRequest {
            email: "known@example.com".into(),
            program: Some("taekwondo".into()),
            redirect: None,
        },
        None,
    )
    .await
    .unwrap();
    assert!(known.sent);
    assert_eq!(p.mailer.count(), emails_before + 1);

    // Unknown email: identical response shape, no email, nothing created.
    let unknown = handle_external_sign_in(
        p.ctx.clone(),
        ExternalSignInRequest {
            email: "unknown@example.com".into(),
            program: Some("taekwondo".into()),
            redirect: None,
        },
        None,
    )
    .await
    .unwrap();
    assert!(unknown.sent);
    assert_eq!(p.mailer.count(), emails_before + 1);

    // The pending membership persisted.
    let user = verification::find_user_by_email(&p.ctx, "known@example.com")
        .await
        .unwrap()
        .unwrap();
    let membership = user.membership(ProgramId::Taekwondo).unwrap();
    assert_eq!(membership.status, MembershipStatus::Pending);
}

#[tokio::test]
async fn test_external_sign_in_untrusted_redirect_has_no_side_effects() {
    let p = platform();
    signed_in_user(&p, "ada@example.com").await;
    let emails_before = p.mailer.count();

    let err = handle_external_sign_in(
        p.ctx.clone(),
        ExternalSignInRequest {
            email: "ada@example.com".into(),
            program: Some("taekwondo".into()),
            redirect: Some("https://evil.example/phish".into()),
        },
        None,
    )
    .await
    .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidRedirectUrl);
    assert_eq!(err.status.status_code(), 400);

    // No email went out and no membership was recorded.
    assert_eq!(p.mailer.count(), emails_before);
    let user = verification::find_user_by_email(&p.ctx, "ada@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(user.membership(ProgramId::Taekwondo).is_none());
}

#[tokio::test]
async fn test_origin_overrides_claimed_program() {
    let p = platform();
    signed_in_user(&p, "ada@example.com").await;

    // The caller claims taekwondo but the request originates from the
    // fyht4 site; the origin wins.
    handle_external_sign_in(
        p.ctx.clone(),
        ExternalSignInRequest {
            email: "ada@example.com".into(),
            program: Some("taekwondo".into()),
            redirect: None,
        },
        Some("https://fyht4.com"),
    )
    .await
    .unwrap();

    let user = verification::find_user_by_email(&p.ctx, "ada@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(user.membership(ProgramId::Taekwondo).is_none());
    assert!(user.membership(ProgramId::Fyht4).is_some());
}

#[tokio::test]
async fn test_access_check_state_machine() {
    let p = platform();
    let cookie = signed_in_user(&p, "ada@example.com").await;
    let now = Utc::now();

    // First contact with taekwondo: onboarding required, pending
    // membership recorded.
    let user = verification::find_user_by_email(&p.ctx, "ada@example.com")
        .await
        .unwrap()
        .unwrap();
    let check = check_access(
        &p.ctx,
        &user,
        ProgramId::Taekwondo,
        Some("https://fyht4.com/return"),
        now,
    )
    .await
    .unwrap();
    assert!(check.membership_created);
    match check.outcome {
        AccessOutcome::RequireOnboarding { onboarding_url } => {
            assert!(onboarding_url.contains("/onboarding/taekwondo"), "{onboarding_url}");
            assert!(onboarding_url.contains("returnTo="), "{onboarding_url}");
        }
        AccessOutcome::Allow { .. } => panic!("pending member must not be allowed"),
    }

    // Second check: still pending, but no duplicate membership.
    let user = verification::find_user_by_email(&p.ctx, "ada@example.com")
        .await
        .unwrap()
        .unwrap();
    let check = check_access(&p.ctx, &user, ProgramId::Taekwondo, None, now)
        .await
        .unwrap();
    assert!(!check.membership_created);
    let user = verification::find_user_by_email(&p.ctx, "ada@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        user.programs
            .iter()
            .filter(|m| m.program == ProgramId::Taekwondo)
            .count(),
        1
    );

    // After onboarding into fyht4, access there is allowed and the
    // redirect carries the session token.
    handle_onboard(p.ctx.clone(), onboard_request(10.0), ORIGIN, Some(&cookie))
        .await
        .unwrap();
    let user = verification::find_user_by_email(&p.ctx, "ada@example.com")
        .await
        .unwrap()
        .unwrap();
    let check = check_access(
        &p.ctx,
        &user,
        ProgramId::Fyht4,
        Some("https://fyht4.com/dashboard"),
        now,
    )
    .await
    .unwrap();
    assert!(!check.membership_created);
    match check.outcome {
        AccessOutcome::Allow { token, redirect_url } => {
            assert!(!token.is_empty());
            let url = redirect_url.unwrap();
            assert!(url.starts_with("https://fyht4.com/dashboard?token="), "{url}");
        }
        AccessOutcome::RequireOnboarding { .. } => panic!("active member must be allowed"),
    }
}

#[tokio::test]
async fn test_onboarding_happy_path() {
    let p = platform();
    let cookie = signed_in_user(&p, "ada@example.com").await;

    let result = handle_onboard(p.ctx.clone(), onboard_request(49.99), ORIGIN, Some(&cookie))
        .await
        .unwrap();

    assert!(result.charge_success);
    assert_eq!(result.dependents.len(), 2);
    assert_eq!(result.account.program, ProgramId::Fyht4);
    assert!(result.account.auto_charge.enabled);
    assert_eq!(result.account.auto_charge.frequency, ChargeFrequency::Monthly);
    assert!(result.account.auto_charge.next_charge_date.is_some());

    // First charge went to the gateway in cents.
    assert_eq!(p.gateway.charge_count(), 1);
    assert_eq!(p.gateway.charges.lock().unwrap()[0].amount_cents, 4999);

    // Membership flipped active and links back to the account.
    let user = verification::find_user_by_email(&p.ctx, "ada@example.com")
        .await
        .unwrap()
        .unwrap();
    let membership = user.membership(ProgramId::Fyht4).unwrap();
    assert_eq!(membership.status, MembershipStatus::Active);
    assert_eq!(
        membership
            .program_data
            .as_ref()
            .and_then(|d| d.parent_id.as_deref()),
        Some(result.account.id.as_str())
    );

    // Customer id persisted for reuse.
    assert!(user.stripe_customer_id.is_some());
}

#[tokio::test]
async fn test_onboarding_requires_payment_method() {
    let p = platform();
    let cookie = signed_in_user(&p, "ada@example.com").await;

    let request: OnboardRequest = serde_json::from_value(serde_json::json!({
        "amount": 10.0,
    }))
    .unwrap();
    let err = handle_onboard(p.ctx.clone(), request, ORIGIN, Some(&cookie))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingPaymentMethod);
    assert_eq!(err.status.status_code(), 400);
}

#[tokio::test]
async fn test_onboarding_twice_conflicts() {
    let p = platform();
    let cookie = signed_in_user(&p, "ada@example.com").await;

    handle_onboard(p.ctx.clone(), onboard_request(10.0), ORIGIN, Some(&cookie))
        .await
        .unwrap();
    let err = handle_onboard(p.ctx.clone(), onboard_request(10.0), ORIGIN, Some(&cookie))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AlreadyOnboarded);
    assert_eq!(err.status.status_code(), 409);
}

#[tokio::test]
async fn test_onboarding_survives_declined_first_charge() {
    let p = platform();
    let cookie = signed_in_user(&p, "ada@example.com").await;

    // Every customer id the gateway will mint is declined.
    p.gateway.decline("cus_test_0");

    let result = handle_onboard(p.ctx.clone(), onboard_request(25.0), ORIGIN, Some(&cookie))
        .await
        .unwrap();

    // Onboarding completed; the sweep will retry the charge.
    assert!(!result.charge_success);
    assert!(result.account.auto_charge.next_charge_date.is_some());

    let user = verification::find_user_by_email(&p.ctx, "ada@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        user.membership(ProgramId::Fyht4).unwrap().status,
        MembershipStatus::Active
    );
}

#[tokio::test]
async fn test_onboarding_reuses_existing_customer() {
    let p = platform();
    let cookie = signed_in_user(&p, "ada@example.com").await;
    handle_onboard(p.ctx.clone(), onboard_request(10.0), ORIGIN, Some(&cookie))
        .await
        .unwrap();

    // Onboard the same user into a second program directly.
    let user = verification::find_user_by_email(&p.ctx, "ada@example.com")
        .await
        .unwrap()
        .unwrap();
    let first_customer = user.stripe_customer_id.clone().unwrap();

    let request: OnboardingRequest = serde_json::from_value(serde_json::json!({
        "paymentMethodId": "pm_visa",
        "amount": 15.0,
    }))
    .unwrap();
    let result = enrollment::complete_onboarding(
        &p.ctx,
        &user,
        ProgramId::Taekwondo,
        request,
        Utc::now(),
    )
    .await
    .unwrap();

    assert_eq!(
        result.account.stripe_customer_id.as_deref(),
        Some(first_customer.as_str())
    );
}

#[tokio::test]
async fn test_onboarding_without_session_is_unauthorized() {
    let p = platform();
    let err = handle_onboard(p.ctx.clone(), onboard_request(10.0), ORIGIN, None)
        .await
        .unwrap_err();
    assert_eq!(err.status.status_code(), 401);
}

#[tokio::test]
async fn test_zero_amount_disables_auto_charge() {
    let p = platform();
    let cookie = signed_in_user(&p, "ada@example.com").await;

    let request: OnboardRequest = serde_json::from_value(serde_json::json!({
        "paymentMethodId": "pm_visa",
        "amount": 0.0,
    }))
    .unwrap();
    let result = handle_onboard(p.ctx.clone(), request, ORIGIN, Some(&cookie))
        .await
        .unwrap();

    assert!(!result.account.auto_charge.enabled);
    assert!(result.account.auto_charge.next_charge_date.is_none());
    assert!(!result.charge_success);
    assert_eq!(p.gateway.charge_count(), 0);
}
