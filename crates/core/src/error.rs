//! Record-level error model.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic failures of a record or identifier, independent of storage.
///
/// Missing rows and duplicate keys are storage questions and live with the
/// store's own error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A record is structurally invalid (empty name, unpaired columns).
    #[error("invalid record: {0}")]
    Validation(String),

    /// An id or `Kind:id` reference could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
