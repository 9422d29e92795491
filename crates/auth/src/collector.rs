//! Grant Collector: expands a subject's stored grants into candidates.
//!
//! ```text
//! Subject ─[Permission]→ Ability                       (Direct)
//! Subject ─[AssignedRole]→ Role ─[Permission]→ Ability (RoleMediated)
//! ```
//!
//! Loading is split from name filtering so a request-scoped cache can keep the
//! loaded [`GrantSnapshot`] and answer several ability checks from it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;

use gatehouse_core::{AbilityId, AssignmentId, DomainResult, PermissionId, RoleId, ScopeId};

use crate::context::EvalContext;
use crate::entity_ref::EntityRef;
use crate::error::AuthzError;
use crate::model::{Ability, AssignedRole, Permission};
use crate::store::{GrantStore, RecordKind, StoreError};

/// How a candidate reached the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    Direct,
    RoleMediated {
        role_id: RoleId,
        assignment_id: AssignmentId,
    },
}

/// A grant or forbid before scope/restriction filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub permission_id: PermissionId,
    pub ability: Arc<Ability>,
    pub provenance: Provenance,
    pub forbidden: bool,
    /// Scope of the mediating assignment (role-mediated only).
    pub assignment_scope: Option<ScopeId>,
    /// Target the mediating assignment is restricted to (role-mediated only).
    pub restricted_to: Option<EntityRef>,
    pub conditions: JsonValue,
}

impl Candidate {
    fn direct(permission: &Permission, ability: Arc<Ability>) -> Self {
        Self {
            permission_id: permission.id,
            ability,
            provenance: Provenance::Direct,
            forbidden: permission.forbidden,
            assignment_scope: None,
            restricted_to: None,
            conditions: permission.conditions.clone(),
        }
    }

    fn role_mediated(permission: &Permission, assignment: &AssignedRole, ability: Arc<Ability>) -> Self {
        Self {
            permission_id: permission.id,
            ability,
            provenance: Provenance::RoleMediated {
                role_id: assignment.role_id,
                assignment_id: assignment.id,
            },
            forbidden: permission.forbidden,
            assignment_scope: assignment.scope,
            restricted_to: assignment.restricted_to(),
            conditions: permission.conditions.clone(),
        }
    }

    /// Assignment scope wins over ability scope when both are set.
    pub fn effective_scope(&self) -> Option<ScopeId> {
        self.assignment_scope.or(self.ability.scope)
    }

    pub fn is_role_mediated(&self) -> bool {
        matches!(self.provenance, Provenance::RoleMediated { .. })
    }
}

/// Every candidate a subject holds, across all ability names.
#[derive(Debug, Clone, Default)]
pub struct GrantSnapshot {
    candidates: Vec<Candidate>,
}

impl GrantSnapshot {
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Candidates for one ability name, split into `(grants, forbids)`.
    pub fn collect(&self, ability: &str) -> (Vec<Candidate>, Vec<Candidate>) {
        self.candidates
            .iter()
            .filter(|c| c.ability.name == ability)
            .cloned()
            .partition(|c| !c.forbidden)
    }
}

/// Run one store call, aborting if the caller cancels first.
async fn guarded<T, F>(cancel: &CancellationToken, call: F) -> Result<T, AuthzError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AuthzError::Cancelled),
        res = call => res.map_err(|e| {
            tracing::warn!(error = %e, "grant store load failed");
            AuthzError::from(e)
        }),
    }
}

/// Loaded rows must pass record validation before they become candidates.
fn well_formed(kind: RecordKind, id: i64, checked: DomainResult<()>) -> Result<(), AuthzError> {
    checked.map_err(|e| {
        let err = StoreError::Corrupt {
            kind,
            id,
            reason: e.to_string(),
        };
        tracing::warn!(error = %err, "rejecting malformed grant row");
        AuthzError::from(err)
    })
}

struct AbilityCache<'s, S: ?Sized> {
    store: &'s S,
    loaded: HashMap<AbilityId, Arc<Ability>>,
}

impl<'s, S: GrantStore + ?Sized> AbilityCache<'s, S> {
    async fn get(&mut self, id: AbilityId, cancel: &CancellationToken) -> Result<Arc<Ability>, AuthzError> {
        if let Some(ability) = self.loaded.get(&id) {
            return Ok(Arc::clone(ability));
        }
        let ability = guarded(cancel, self.store.load_ability(id)).await?;
        well_formed(RecordKind::Ability, id.get(), ability.validate())?;
        let ability = Arc::new(ability);
        self.loaded.insert(id, Arc::clone(&ability));
        Ok(ability)
    }
}

/// Load and resolve every grant the subject holds (direct and via roles).
pub async fn load_snapshot<S>(
    store: &S,
    subject: &EntityRef,
    cancel: &CancellationToken,
) -> Result<GrantSnapshot, AuthzError>
where
    S: GrantStore + ?Sized,
{
    let mut abilities = AbilityCache {
        store,
        loaded: HashMap::new(),
    };
    let mut candidates = Vec::new();

    let direct = guarded(cancel, store.load_direct_permissions(subject)).await?;
    for permission in &direct {
        well_formed(RecordKind::Permission, permission.id.get(), permission.validate())?;
        let ability = abilities.get(permission.ability_id, cancel).await?;
        candidates.push(Candidate::direct(permission, ability));
    }

    let assignments = guarded(cancel, store.load_assigned_roles(subject)).await?;
    let mut role_permissions: HashMap<RoleId, Vec<Permission>> = HashMap::new();
    for assignment in &assignments {
        well_formed(RecordKind::Assignment, assignment.id.get(), assignment.validate())?;
        if !role_permissions.contains_key(&assignment.role_id) {
            let loaded = guarded(cancel, store.load_role_permissions(assignment.role_id)).await?;
            for permission in &loaded {
                well_formed(RecordKind::Permission, permission.id.get(), permission.validate())?;
            }
            role_permissions.insert(assignment.role_id, loaded);
        }
        for permission in &role_permissions[&assignment.role_id] {
            let ability = abilities.get(permission.ability_id, cancel).await?;
            candidates.push(Candidate::role_mediated(permission, assignment, ability));
        }
    }

    tracing::debug!(
        subject = %subject,
        direct = direct.len(),
        assignments = assignments.len(),
        candidates = candidates.len(),
        "grant snapshot loaded"
    );

    Ok(GrantSnapshot { candidates })
}

/// `Collect(ctx, subject)`: the subject's candidates for `ctx.ability`, as
/// `(grants, forbids)`.
pub async fn collect<S>(store: &S, ctx: &EvalContext) -> Result<(Vec<Candidate>, Vec<Candidate>), AuthzError>
where
    S: GrantStore + ?Sized,
{
    let snapshot = load_snapshot(store, &ctx.subject, &ctx.cancel).await?;
    Ok(snapshot.collect(&ctx.ability))
}
