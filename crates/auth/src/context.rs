//! Evaluation context for a single authorization check.

use tokio_util::sync::CancellationToken;

use gatehouse_core::ScopeId;

use crate::entity_ref::EntityRef;

/// Everything one `can` call needs to know about the request.
///
/// `target_owner_id` is supplied by the caller because ownership is
/// domain-specific; when absent, the facade may ask an `OwnerRegistry`.
#[derive(Debug, Clone)]
pub struct EvalContext {
    pub subject: EntityRef,
    /// Ability *name*; the collector resolves names to records.
    pub ability: String,
    pub target: Option<EntityRef>,
    pub target_owner_id: Option<i64>,
    /// Active tenant scope. `None` means no scope filtering is requested.
    pub scope: Option<ScopeId>,
    pub cancel: CancellationToken,
}

impl EvalContext {
    pub fn new(subject: EntityRef, ability: impl Into<String>) -> Self {
        Self {
            subject,
            ability: ability.into(),
            target: None,
            target_owner_id: None,
            scope: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn on(mut self, target: EntityRef) -> Self {
        self.target = Some(target);
        self
    }

    pub fn owned_by(mut self, owner_id: i64) -> Self {
        self.target_owner_id = Some(owner_id);
        self
    }

    pub fn in_scope(mut self, scope: ScopeId) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }
}
