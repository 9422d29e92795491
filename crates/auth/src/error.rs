//! Evaluation-time errors.
//!
//! A deny is never an error: `can` returns `Ok(false)`. Everything here means
//! "could not determine", which the HTTP layer maps to 500, never 403.

use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// The grant store failed while loading the subject's grants.
    #[error("grant store unavailable: {0}")]
    GrantStoreUnavailable(String),

    /// The caller cancelled the evaluation while a store load was in flight.
    #[error("authorization check cancelled")]
    Cancelled,

    /// A host-supplied owner resolver failed.
    #[error("owner resolution failed: {0}")]
    OwnerResolution(String),
}

impl From<StoreError> for AuthzError {
    fn from(value: StoreError) -> Self {
        AuthzError::GrantStoreUnavailable(value.to_string())
    }
}
