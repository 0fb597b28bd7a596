// Profile completeness scoring.
//
// Eleven equally-weighted checklist items, each worth 100/11 points,
// summed and rounded to the nearest integer. A fully complete profile
// scores exactly 100.

use vcorp_core::db::models::User;

const CHECKLIST_ITEMS: f64 = 11.0;

/// Compute the profile completeness score for a user.
pub fn profile_completeness(user: &User) -> u8 {
    let filled = [
        user.first_name.as_deref().map_or(false, |s| !s.is_empty()),
        user.last_name.as_deref().map_or(false, |s| !s.is_empty()),
        !user.email.is_empty(),
        user.phone.as_deref().map_or(false, |s| !s.is_empty()),
        user.date_of_birth.is_some(),
        user.address.street.as_deref().map_or(false, |s| !s.is_empty()),
        user.address.city.as_deref().map_or(false, |s| !s.is_empty()),
        user.address.state.as_deref().map_or(false, |s| !s.is_empty()),
        user.address.zip_code.as_deref().map_or(false, |s| !s.is_empty()),
        user.email_verified.is_some(),
        user.identity_verified,
    ]
    .iter()
    .filter(|&&b| b)
    .count();

    let score = (filled as f64) * (100.0 / CHECKLIST_ITEMS);
    score.round() as u8
}
