use chrono::Utc;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    exp: Option<i64>,
}

/// Read the `exp` claim of an access token without verifying it.
///
/// Only used to decide whether to rotate before calling the provider. The
/// identity always comes from `AuthProvider::get_user`.
pub fn peek_expiry(token: &str) -> Option<i64> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<ExpiryClaim>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .and_then(|data| data.claims.exp)
}

/// True when the token's `exp` falls within `leeway_secs`.
///
/// Opaque or unreadable tokens report false and are left to the provider.
pub fn needs_rotation(token: &str, leeway_secs: i64) -> bool {
    match peek_expiry(token) {
        Some(exp) => exp - leeway_secs <= Utc::now().timestamp(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn token_expiring_in(secs: i64) -> String {
        let claims = json!({
            "sub": "6f1c1f1e-0000-4000-8000-000000000001",
            "aud": "authenticated",
            "exp": Utc::now().timestamp() + secs,
        });
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"provider-secret"))
            .expect("encode")
    }

    #[test]
    fn reads_expiry_without_the_signing_secret() {
        let token = token_expiring_in(600);
        let exp = peek_expiry(&token).expect("exp claim");
        assert!(exp > Utc::now().timestamp());
    }

    #[test]
    fn rotates_inside_leeway_window() {
        assert!(needs_rotation(&token_expiring_in(30), 60));
        assert!(needs_rotation(&token_expiring_in(-10), 0));
        assert!(!needs_rotation(&token_expiring_in(3600), 60));
    }

    #[test]
    fn opaque_tokens_are_left_to_the_provider() {
        assert_eq!(peek_expiry("not-a-jwt"), None);
        assert!(!needs_rotation("not-a-jwt", 60));
    }
}
