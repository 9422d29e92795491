//! Scope & Restriction Filter.
//!
//! A candidate survives iff every applicable condition holds. Failing ones are
//! dropped silently; [`check`] exposes the reason for explanations.

use serde::Serialize;

use crate::collector::Candidate;
use crate::context::EvalContext;
use crate::model::EntityScope;

/// Why a candidate does not apply to the current check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// The candidate's effective scope differs from the request scope.
    ScopeMismatch,
    /// The ability is tied to another entity (or entity type) than the target.
    EntityMismatch,
    /// The mediating assignment is restricted to another target.
    RestrictionMismatch,
    /// The ability is ownership-gated and the subject does not own the target.
    NotOwner,
}

impl core::fmt::Display for Rejection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Rejection::ScopeMismatch => "scope mismatch",
            Rejection::EntityMismatch => "ability is scoped to a different entity",
            Rejection::RestrictionMismatch => "role assignment is restricted to a different target",
            Rejection::NotOwner => "subject does not own the target",
        };
        f.write_str(s)
    }
}

/// Check one candidate against the evaluation context.
pub fn check(ctx: &EvalContext, candidate: &Candidate) -> Result<(), Rejection> {
    if let (Some(requested), Some(scope)) = (ctx.scope, candidate.effective_scope()) {
        if requested != scope {
            return Err(Rejection::ScopeMismatch);
        }
    }

    let target = ctx.target.as_ref();
    match candidate.ability.entity_scope() {
        EntityScope::Global => {}
        EntityScope::Kind(kind) => {
            if !target.is_some_and(|t| t.kind == kind) {
                return Err(Rejection::EntityMismatch);
            }
        }
        EntityScope::Instance(kind, id) => {
            if !target.is_some_and(|t| t.kind == kind && t.id == id) {
                return Err(Rejection::EntityMismatch);
            }
        }
        EntityScope::Malformed => return Err(Rejection::EntityMismatch),
    }

    if let Some(restricted_to) = &candidate.restricted_to {
        if target != Some(restricted_to) {
            return Err(Rejection::RestrictionMismatch);
        }
    }

    if candidate.ability.only_owned && ctx.target_owner_id != Some(ctx.subject.id) {
        return Err(Rejection::NotOwner);
    }

    Ok(())
}

/// `Filter(ctx, candidates)`: keep the candidates that apply.
pub fn filter(ctx: &EvalContext, candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates
        .into_iter()
        .filter(|c| check(ctx, c).is_ok())
        .collect()
}
