//! Decision Resolver: deny-overrides precedence over filtered candidates.
//!
//! 1. any surviving forbid → deny (regardless of grants, provenance or specificity)
//! 2. else any surviving grant → allow
//! 3. else → deny (default-deny)

use serde::Serialize;

use crate::collector::Candidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// An explicit forbid applied.
    Forbidden,
    /// Nothing granted the ability.
    NoGrant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

pub fn resolve_decision(grants: &[Candidate], forbids: &[Candidate]) -> Decision {
    if !forbids.is_empty() {
        Decision::Deny(DenyReason::Forbidden)
    } else if !grants.is_empty() {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::NoGrant)
    }
}

/// `Resolve(grants, forbids)`.
pub fn resolve(grants: &[Candidate], forbids: &[Candidate]) -> bool {
    resolve_decision(grants, forbids).is_allowed()
}
