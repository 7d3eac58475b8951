//! Signing and verification of profile session tokens (HS256)

use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use super::claims::ISSUER;
use super::Claims;

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: i64,
}

impl TokenService {
    pub fn new(secret: &str, ttl_seconds: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_seconds: i64::try_from(ttl_seconds).unwrap_or(i64::MAX),
        }
    }

    /// Issue a token identifying `profile_id`
    pub fn issue(&self, profile_id: Uuid) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: profile_id.to_string(),
            iss: ISSUER.to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl_seconds),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .context("Failed to sign token")
    }

    /// Verify a token and return its claims
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.validate_exp = true;

        let data = decode::<Claims>(token, &self.decoding, &validation)
            .context("Token verification failed")?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_verify_and_carry_the_profile() {
        let tokens = TokenService::new("secret", 60);
        let profile_id = Uuid::new_v4();
        let claims = tokens.verify(&tokens.issue(profile_id).unwrap()).unwrap();
        assert_eq!(claims.sub, profile_id.to_string());
        assert_eq!(claims.iss, ISSUER);
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let ours = TokenService::new("secret", 60);
        let theirs = TokenService::new("other", 60);
        let token = theirs.issue(Uuid::new_v4()).unwrap();
        assert!(ours.verify(&token).is_err());
        assert!(ours.verify("not.a.token").is_err());
    }
}
