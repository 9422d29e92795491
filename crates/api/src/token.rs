//! Bearer token verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use thiserror::Error;

use gatehouse_auth::{SubjectClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed or badly signed token: {0}")]
    Decode(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Turns a raw bearer token into validated claims.
pub trait TokenValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SubjectClaims, TokenError>;
}

/// HMAC-SHA256 signed JWTs with a shared secret.
pub struct Hs256Validator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256Validator {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // The time window is checked by `validate_claims` against the caller's clock.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl TokenValidator for Hs256Validator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SubjectClaims, TokenError> {
        let data = jsonwebtoken::decode::<SubjectClaims>(token, &self.key, &self.validation)?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}
