// JWT — HS256 sign/verify using the `jsonwebtoken` crate.
//
// Every session token carries the network issuer and audience claims;
// verification rejects tokens minted for anything else.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use vcorp_core::error::VcorpError;

/// Sign a JWT with HS256, wrapping the payload with iss/aud/iat/exp.
pub fn sign_jwt<T: Serialize>(
    payload: &T,
    secret: &str,
    issuer: &str,
    audience: &str,
    expires_in_secs: u64,
) -> Result<String, VcorpError> {
    let now = chrono::Utc::now().timestamp() as u64;

    let claims = JwtClaims {
        payload: serde_json::to_value(payload)
            .map_err(|e| VcorpError::Crypto(format!("Failed to serialize JWT payload: {e}")))?,
        iss: issuer.to_string(),
        aud: audience.to_string(),
        iat: now,
        exp: now + expires_in_secs,
    };

    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    jsonwebtoken::encode(&header, &claims, &key)
        .map_err(|e| VcorpError::Crypto(format!("JWT signing failed: {e}")))
}

/// Verify and decode a JWT signed with HS256.
///
/// Returns `None` if the token is invalid, expired, or was minted with a
/// different issuer or audience.
pub fn verify_jwt<T: DeserializeOwned>(
    token: &str,
    secret: &str,
    issuer: &str,
    audience: &str,
) -> Option<T> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.set_issuer(&[issuer]);
    validation.set_audience(&[audience]);

    let token_data = jsonwebtoken::decode::<JwtClaims>(token, &key, &validation).ok()?;
    serde_json::from_value(token_data.claims.payload).ok()
}

/// Internal JWT claims wrapper.
#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    #[serde(flatten)]
    payload: serde_json::Value,
    iss: String,
    aud: String,
    iat: u64,
    exp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISS: &str = "api.thevacorp.com";
    const AUD: &str = "vcorp-network";

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestPayload {
        user_id: String,
        email: String,
    }

    fn payload() -> TestPayload {
        TestPayload {
            user_id: "user123".into(),
            email: "a@b.com".into(),
        }
    }

    #[test]
    fn test_sign_and_verify() {
        let token = sign_jwt(&payload(), "test-secret-key", ISS, AUD, 3600).unwrap();
        assert!(!token.is_empty());

        let decoded: Option<TestPayload> = verify_jwt(&token, "test-secret-key", ISS, AUD);
        let decoded = decoded.unwrap();
        assert_eq!(decoded.user_id, "user123");
        assert_eq!(decoded.email, "a@b.com");
    }

    #[test]
    fn test_wrong_secret_fails() {
        let token = sign_jwt(&payload(), "correct-secret", ISS, AUD, 3600).unwrap();
        let decoded: Option<TestPayload> = verify_jwt(&token, "wrong-secret", ISS, AUD);
        assert!(decoded.is_none());
    }

    #[test]
    fn test_wrong_issuer_fails() {
        let token = sign_jwt(&payload(), "secret", "other.example.com", AUD, 3600).unwrap();
        let decoded: Option<TestPayload> = verify_jwt(&token, "secret", ISS, AUD);
        assert!(decoded.is_none());
    }

    #[test]
    fn test_wrong_audience_fails() {
        let token = sign_jwt(&payload(), "secret", ISS, "other-network", 3600).unwrap();
        let decoded: Option<TestPayload> = verify_jwt(&token, "secret", ISS, AUD);
        assert!(decoded.is_none());
    }

    #[test]
    fn test_garbage_token_fails() {
        let decoded: Option<TestPayload> = verify_jwt("not.a.jwt", "secret", ISS, AUD);
        assert!(decoded.is_none());
    }
}
