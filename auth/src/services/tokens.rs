use anyhow::Context;
use authbridge_models::{UserClaims, UserPublic};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::error::AuthError;

/// How long an issued token stays valid.
pub const TOKEN_TTL_DAYS: i64 = 30;

/// HS256 signer and verifier for user session tokens. The claims carry their
/// own `expirationDate`, so decoding never enforces the registered `exp`
/// claim; callers compare against the embedded date.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        TokenService {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn expiration_date(&self) -> DateTime<Utc> {
        Utc::now() + Duration::days(TOKEN_TTL_DAYS)
    }

    pub fn issue(
        &self,
        user: &UserPublic,
        expiration_date: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = UserClaims {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            birth_date: user.birth_date,
            expiration_date,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("failed to sign user token")
            .map_err(AuthError::Internal)
    }

    /// Returns the claims of a well-signed token, or `None` for anything
    /// unparsable or signed with another key. Expiry is NOT checked here.
    pub fn decode(&self, token: &str) -> Option<UserClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        decode::<UserClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn sample_user() -> UserPublic {
        UserPublic {
            id: Uuid::new_v4(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: Some("ada@example.com".to_string()),
            birth_date: None,
        }
    }

    #[test]
    fn issue_then_decode_round_trip() {
        let service = TokenService::new("test-secret");
        let user = sample_user();
        let expiration = service.expiration_date();

        let token = service.issue(&user, expiration).unwrap();
        let claims = service.decode(&token).unwrap();

        assert_eq!(claims.id, user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.expiration_date, expiration);
        assert!(!claims.is_expired(Utc::now()));
    }

    #[test]
    fn tampered_token_does_not_decode() {
        let service = TokenService::new("test-secret");
        let token = service.issue(&sample_user(), service.expiration_date()).unwrap();

        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'a' { 'b' } else { 'a' });

        assert!(service.decode(&tampered).is_none());
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let issuer = TokenService::new("secret-one");
        let verifier = TokenService::new("secret-two");
        let token = issuer.issue(&sample_user(), issuer.expiration_date()).unwrap();
        assert!(verifier.decode(&token).is_none());
    }

    #[test]
    fn expired_claims_still_decode_but_report_expired() {
        let service = TokenService::new("test-secret");
        let past = Utc::now() - Duration::days(1);
        let token = service.issue(&sample_user(), past).unwrap();

        let claims = service.decode(&token).unwrap();
        assert!(claims.is_expired(Utc::now()));
    }
}
