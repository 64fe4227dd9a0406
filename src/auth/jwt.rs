//! JWT Token Service
//!
//! Issues and validates the operator tokens that gate the API. Token
//! lifetime comes from the server configuration so the cookie and the
//! `exp` claim always agree.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ISSUER: &str = "mmt-server";

/// Claims carried by an operator token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User unique identifier
    pub sub: Uuid,
    /// User email
    pub email: String,
    /// Token issued at timestamp
    pub iat: i64,
    /// Token expiration timestamp
    pub exp: i64,
    /// Token issuer
    pub iss: String,
}

/// JWT Service for token operations
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl: Duration,
}

impl JwtService {
    /// Create a new JWT service with the provided secret and token lifetime
    pub fn new(secret: &str, token_ttl: Duration) -> Self {
        let encoding_key = EncodingKey::from_secret(secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());

        let mut validation = Validation::default();
        validation.set_issuer(&[ISSUER]);

        Self {
            encoding_key,
            decoding_key,
            validation,
            token_ttl,
        }
    }

    /// Configured token lifetime; the auth routes reuse it for cookies.
    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// Generate a JWT token for a user
    pub fn create_token(&self, user_id: Uuid, email: String) -> Result<String> {
        let now = Utc::now();
        let expiration = now + self.token_ttl;

        let claims = Claims {
            sub: user_id,
            email,
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            iss: ISSUER.to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .context("Failed to encode JWT token")
    }

    /// Validate a token and return its claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .context("Failed to validate JWT token")?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> JwtService {
        JwtService::new(secret, Duration::hours(24))
    }

    #[test]
    fn test_jwt_roundtrip() {
        let jwt_service = service("test_secret");
        let user_id = Uuid::new_v4();
        let email = "test@example.com".to_string();

        let token = jwt_service.create_token(user_id, email.clone()).unwrap();
        let claims = jwt_service.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, email);
        assert_eq!(claims.iss, ISSUER);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = service("secret_a");
        let verifier = service("secret_b");

        let token = issuer
            .create_token(Uuid::new_v4(), "test@example.com".to_string())
            .unwrap();
        assert!(verifier.validate_token(&token).is_err());
    }

    #[test]
    fn test_configured_ttl_drives_expiry() {
        // A negative lifetime produces an already-expired token, so the
        // exp claim really does come from the configured TTL.
        let expired = JwtService::new("test_secret", Duration::hours(-2));
        let token = expired
            .create_token(Uuid::new_v4(), "test@example.com".to_string())
            .unwrap();
        assert!(expired.validate_token(&token).is_err());

        assert_eq!(service("test_secret").token_ttl(), Duration::hours(24));
    }
}
