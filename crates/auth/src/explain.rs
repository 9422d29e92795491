//! Decision explanations (audit trail).
//!
//! Answers "why was this request allowed/denied?" by reporting every candidate
//! the collector found for the ability and what the filter did with it.

use serde::Serialize;

use gatehouse_core::{AbilityId, PermissionId, ScopeId};

use crate::collector::{Candidate, Provenance};
use crate::context::EvalContext;
use crate::entity_ref::EntityRef;
use crate::filter::{self, Rejection};
use crate::resolver::{self, Decision, DenyReason};

/// Detailed explanation of one authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub subject: EntityRef,
    pub ability: String,
    pub target: Option<EntityRef>,
    pub scope: Option<ScopeId>,
    pub target_owner_id: Option<i64>,
    pub decision: Decision,
    pub allowed: bool,
    /// Human-readable reason for the decision.
    pub reason: String,
    pub considered: Vec<CandidateReport>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateReport {
    pub permission_id: PermissionId,
    pub ability_id: AbilityId,
    pub provenance: Provenance,
    pub forbidden: bool,
    pub effective_scope: Option<ScopeId>,
    pub outcome: CandidateOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "rejection", rename_all = "snake_case")]
pub enum CandidateOutcome {
    Applied,
    Rejected(Rejection),
}

fn report(ctx: &EvalContext, candidate: &Candidate) -> CandidateReport {
    let outcome = match filter::check(ctx, candidate) {
        Ok(()) => CandidateOutcome::Applied,
        Err(rejection) => CandidateOutcome::Rejected(rejection),
    };
    CandidateReport {
        permission_id: candidate.permission_id,
        ability_id: candidate.ability.id,
        provenance: candidate.provenance,
        forbidden: candidate.forbidden,
        effective_scope: candidate.effective_scope(),
        outcome,
    }
}

/// Explain the decision for `ctx` over the collected (unfiltered) candidates.
pub fn explain(ctx: &EvalContext, grants: &[Candidate], forbids: &[Candidate]) -> Explanation {
    let considered: Vec<CandidateReport> = grants
        .iter()
        .chain(forbids.iter())
        .map(|c| report(ctx, c))
        .collect();

    let applied = |forbidden: bool| {
        considered
            .iter()
            .filter(|r| r.forbidden == forbidden && r.outcome == CandidateOutcome::Applied)
            .count()
    };
    let applied_grants = applied(false);
    let applied_forbids = applied(true);

    let decision = resolver::resolve_decision(
        &filter::filter(ctx, grants.to_vec()),
        &filter::filter(ctx, forbids.to_vec()),
    );

    let (reason, suggestions) = match decision {
        Decision::Allow => (
            format!(
                "{} grant(s) for '{}' apply and no forbid applies",
                applied_grants, ctx.ability
            ),
            Vec::new(),
        ),
        Decision::Deny(DenyReason::Forbidden) => (
            format!(
                "{} explicit forbid(s) for '{}' apply; a forbid always overrides grants",
                applied_forbids, ctx.ability
            ),
            vec!["Remove the forbidding permission from the subject or its roles".to_string()],
        ),
        Decision::Deny(DenyReason::NoGrant) => {
            let mut suggestions = vec![
                format!("Grant '{}' directly to {}", ctx.ability, ctx.subject),
                format!("Assign a role that grants '{}'", ctx.ability),
            ];
            if !considered.is_empty() {
                suggestions.insert(
                    0,
                    "Grants exist but none apply to this target/scope; check the rejections".to_string(),
                );
            }
            (
                format!("no applicable grant for '{}' (default deny)", ctx.ability),
                suggestions,
            )
        }
    };

    Explanation {
        subject: ctx.subject.clone(),
        ability: ctx.ability.clone(),
        target: ctx.target.clone(),
        scope: ctx.scope,
        target_owner_id: ctx.target_owner_id,
        allowed: decision.is_allowed(),
        decision,
        reason,
        considered,
        suggestions,
    }
}
