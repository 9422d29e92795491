use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gatehouse_core::ScopeId;

use crate::entity_ref::EntityRef;

/// Token claims identifying the authenticated subject (transport-agnostic).
///
/// Timestamps serialise as the registered `iat`/`exp` seconds so standard JWT
/// tooling can validate them too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectClaims {
    /// The subject every check in the request is made for, encoded as `Kind:id`.
    #[serde(with = "subject_string")]
    pub sub: EntityRef,

    /// Active tenant scope, if the session is bound to one.
    #[serde(default)]
    pub scope: Option<ScopeId>,

    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

mod subject_string {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    use crate::entity_ref::EntityRef;

    pub fn serialize<S: Serializer>(subject: &EntityRef, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(subject)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<EntityRef, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(D::Error::custom)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token expired")]
    Expired,

    #[error("token issued in the future")]
    NotYetValid,

    #[error("token expires before it was issued")]
    InvalidTimeWindow,
}

/// Deterministically validate subject claims.
///
/// Signature verification / decoding is outside this crate.
pub fn validate_claims(claims: &SubjectClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
