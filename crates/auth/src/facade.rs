//! Authorization Facade: the public `can` / `cannot` entry points.
//!
//! ```text
//! EvalContext
//!   ↓
//! 1. Collect   (GrantStore → GrantSnapshot → candidates for the ability name)
//!   ↓
//! 2. Owner     (only if an ownership-gated candidate needs an unknown owner)
//!   ↓
//! 3. Filter    (scope, entity scoping, restriction, ownership)
//!   ↓
//! 4. Resolve   (forbid overrides grant, default deny)
//! ```
//!
//! - No mutation of grant data
//! - No lock held across the pipeline
//! - Store failures surface as `Err`, never as `Ok(false)`

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use gatehouse_core::{AbilityId, ScopeId};

use crate::collector::{self, Candidate, GrantSnapshot};
use crate::context::EvalContext;
use crate::entity_ref::EntityRef;
use crate::error::AuthzError;
use crate::explain::{self, Explanation};
use crate::filter;
use crate::ownership::OwnerRegistry;
use crate::resolver::{self, Decision};
use crate::store::GrantStore;

/// Stateless decision engine over a shared, read-only grant store.
#[derive(Debug)]
pub struct Authorizer<S> {
    store: S,
    owners: OwnerRegistry,
}

impl<S: GrantStore> Authorizer<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            owners: OwnerRegistry::new(),
        }
    }

    pub fn with_owners(mut self, owners: OwnerRegistry) -> Self {
        self.owners = owners;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// `Can(ctx)`.
    pub async fn can(&self, ctx: &EvalContext) -> Result<bool, AuthzError> {
        let snapshot = collector::load_snapshot(&self.store, &ctx.subject, &ctx.cancel).await?;
        let decision = self.decide(ctx, &snapshot).await?;
        Ok(decision.is_allowed())
    }

    /// `Cannot(ctx)`: negation of [`Self::can`], same error contract.
    pub async fn cannot(&self, ctx: &EvalContext) -> Result<bool, AuthzError> {
        self.can(ctx).await.map(|allowed| !allowed)
    }

    pub async fn explain(&self, ctx: &EvalContext) -> Result<Explanation, AuthzError> {
        let snapshot = collector::load_snapshot(&self.store, &ctx.subject, &ctx.cancel).await?;
        self.explain_from(ctx, &snapshot).await
    }

    /// Whether `subject` holds a role named `role_name`.
    ///
    /// An existence query for management UIs, not an authorization decision.
    /// With `scope` set, only assignments that are unscoped or in that scope
    /// count (the assignment's scope, falling back to the role's).
    pub async fn has_role(
        &self,
        subject: &EntityRef,
        role_name: &str,
        scope: Option<ScopeId>,
    ) -> Result<bool, AuthzError> {
        let assignments = self.store.load_assigned_roles(subject).await?;
        for assignment in assignments {
            let role = self.store.load_role(assignment.role_id).await?;
            if role.name != role_name {
                continue;
            }
            let effective = assignment.scope.or(role.scope);
            let in_scope = match (scope, effective) {
                (Some(requested), Some(actual)) => requested == actual,
                _ => true,
            };
            if in_scope {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Whether any permission row (grant or forbid) ties `ability_id` to `target`.
    ///
    /// An existence query for management UIs, not an authorization decision.
    pub async fn exists(&self, ability_id: AbilityId, target: &EntityRef) -> Result<bool, AuthzError> {
        let permissions = self.store.load_direct_permissions(target).await?;
        Ok(permissions.iter().any(|p| p.ability_id == ability_id))
    }

    /// Start a request-scoped view that memoises grant snapshots per subject.
    ///
    /// Drop it at the end of the request; never share it across requests.
    pub fn request_scope(self: &Arc<Self>) -> RequestScope<S> {
        RequestScope {
            authorizer: Arc::clone(self),
            snapshots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn decide(&self, ctx: &EvalContext, snapshot: &GrantSnapshot) -> Result<Decision, AuthzError> {
        let (grants, forbids) = snapshot.collect(&ctx.ability);
        let ctx = self.with_owner(ctx, &grants, &forbids).await?;

        let grants = filter::filter(&ctx, grants);
        let forbids = filter::filter(&ctx, forbids);
        let decision = resolver::resolve_decision(&grants, &forbids);

        tracing::debug!(
            subject = %ctx.subject,
            ability = %ctx.ability,
            target = ?ctx.target,
            grants = grants.len(),
            forbids = forbids.len(),
            allowed = decision.is_allowed(),
            "authorization decided"
        );

        Ok(decision)
    }

    async fn explain_from(&self, ctx: &EvalContext, snapshot: &GrantSnapshot) -> Result<Explanation, AuthzError> {
        let (grants, forbids) = snapshot.collect(&ctx.ability);
        let ctx = self.with_owner(ctx, &grants, &forbids).await?;
        Ok(explain::explain(&ctx, &grants, &forbids))
    }

    /// Fill in `target_owner_id` from the registry when an ownership-gated
    /// candidate needs it and the caller did not supply it.
    async fn with_owner<'c>(
        &self,
        ctx: &'c EvalContext,
        grants: &[Candidate],
        forbids: &[Candidate],
    ) -> Result<Cow<'c, EvalContext>, AuthzError> {
        let needs_owner = grants.iter().chain(forbids).any(|c| c.ability.only_owned);
        let target = match &ctx.target {
            Some(target) if needs_owner && ctx.target_owner_id.is_none() && !self.owners.is_empty() => target,
            _ => return Ok(Cow::Borrowed(ctx)),
        };

        let owner = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return Err(AuthzError::Cancelled),
            res = self.owners.owner_of(target) => res.map_err(|e| {
                tracing::warn!(target = %target, error = %e, "owner resolution failed");
                AuthzError::OwnerResolution(e)
            })?,
        };

        let mut resolved = ctx.clone();
        resolved.target_owner_id = owner;
        Ok(Cow::Owned(resolved))
    }
}

/// Per-request view over an [`Authorizer`].
///
/// Grants are not expected to change within one request, so each subject's
/// snapshot is loaded at most once per scope. Clones share the same cache.
pub struct RequestScope<S> {
    authorizer: Arc<Authorizer<S>>,
    snapshots: Arc<Mutex<HashMap<EntityRef, Arc<GrantSnapshot>>>>,
}

impl<S> Clone for RequestScope<S> {
    fn clone(&self) -> Self {
        Self {
            authorizer: Arc::clone(&self.authorizer),
            snapshots: Arc::clone(&self.snapshots),
        }
    }
}

impl<S: GrantStore> RequestScope<S> {
    pub fn authorizer(&self) -> &Authorizer<S> {
        &self.authorizer
    }

    pub async fn can(&self, ctx: &EvalContext) -> Result<bool, AuthzError> {
        let snapshot = self.snapshot(ctx).await?;
        let decision = self.authorizer.decide(ctx, &snapshot).await?;
        Ok(decision.is_allowed())
    }

    pub async fn cannot(&self, ctx: &EvalContext) -> Result<bool, AuthzError> {
        self.can(ctx).await.map(|allowed| !allowed)
    }

    pub async fn explain(&self, ctx: &EvalContext) -> Result<Explanation, AuthzError> {
        let snapshot = self.snapshot(ctx).await?;
        self.authorizer.explain_from(ctx, &snapshot).await
    }

    async fn snapshot(&self, ctx: &EvalContext) -> Result<Arc<GrantSnapshot>, AuthzError> {
        if let Some(cached) = self.cached(&ctx.subject) {
            return Ok(cached);
        }

        let loaded = collector::load_snapshot(&self.authorizer.store, &ctx.subject, &ctx.cancel).await?;
        let mut map = self.snapshots.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = map
            .entry(ctx.subject.clone())
            .or_insert_with(|| Arc::new(loaded));
        Ok(Arc::clone(entry))
    }

    fn cached(&self, subject: &EntityRef) -> Option<Arc<GrantSnapshot>> {
        let map = self.snapshots.lock().unwrap_or_else(PoisonError::into_inner);
        map.get(subject).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ownership::StaticOwners;
    use crate::testing::FixtureStore;

    fn user(id: i64) -> EntityRef {
        EntityRef::new("User", id)
    }

    fn authorizer(store: FixtureStore) -> Authorizer<FixtureStore> {
        Authorizer::new(store)
    }

    /// Forbid overrides allow: a role grants `edit_invoice` globally, a direct
    /// forbid exists for the same ability. This precedence is intentional and
    /// non-negotiable.
    #[tokio::test]
    async fn forbid_overrides_role_grant() {
        let mut store = FixtureStore::default();
        let edit = store.ability("edit_invoice");
        let editor = store.role("editor");
        store.grant_to_role(editor, edit);
        store.assign(editor, &user(1));
        store.forbid_to(&user(1), edit);

        let authz = authorizer(store);
        let ctx = EvalContext::new(user(1), "edit_invoice");
        assert_eq!(authz.can(&ctx).await, Ok(false));
        assert_eq!(authz.cannot(&ctx).await, Ok(true));
    }

    #[tokio::test]
    async fn role_forbid_overrides_direct_grant() {
        let mut store = FixtureStore::default();
        let edit = store.ability("edit_invoice");
        let auditor = store.role("auditor");
        store.forbid_to_role(auditor, edit);
        store.assign(auditor, &user(1));
        store.grant_to(&user(1), edit);

        let authz = authorizer(store);
        assert_eq!(authz.can(&EvalContext::new(user(1), "edit_invoice")).await, Ok(false));
    }

    #[tokio::test]
    async fn default_deny_is_not_an_error() {
        let authz = authorizer(FixtureStore::default());
        assert_eq!(authz.can(&EvalContext::new(user(1), "edit_invoice")).await, Ok(false));
    }

    #[tokio::test]
    async fn entity_scoped_ability_is_precise() {
        let invoice42 = EntityRef::new("Invoice", 42);
        let mut store = FixtureStore::default();
        let edit = store.ability_with("edit_invoice", |a| {
            a.entity_type = Some("Invoice".into());
            a.entity_id = Some(42);
        });
        store.grant_to(&user(1), edit);
        let authz = authorizer(store);

        let ctx = EvalContext::new(user(1), "edit_invoice");
        assert_eq!(authz.can(&ctx.clone().on(invoice42)).await, Ok(true));
        assert_eq!(authz.can(&ctx.on(EntityRef::new("Invoice", 43))).await, Ok(false));
    }

    #[tokio::test]
    async fn restricted_role_is_contained() {
        let mut store = FixtureStore::default();
        let manage = store.ability("manage_property");
        let manager = store.role("manager");
        store.grant_to_role(manager, manage);
        store.assign_with(manager, &user(1), |a| {
            a.restricted = true;
            a.restricted_to_type = Some("Property".into());
            a.restricted_to_id = Some(7);
        });
        let authz = authorizer(store);

        let ctx = EvalContext::new(user(1), "manage_property");
        assert_eq!(authz.can(&ctx.clone().on(EntityRef::new("Property", 7))).await, Ok(true));
        assert_eq!(authz.can(&ctx.clone().on(EntityRef::new("Property", 8))).await, Ok(false));
        assert_eq!(authz.can(&ctx).await, Ok(false));
    }

    #[tokio::test]
    async fn scopes_isolate_subjects_holding_the_same_role() {
        let mut store = FixtureStore::default();
        let edit = store.ability("edit_invoice");
        let editor = store.role("editor");
        store.grant_to_role(editor, edit);
        store.assign_with(editor, &user(1), |a| a.scope = Some(ScopeId::new(1)));
        store.assign_with(editor, &user(2), |a| a.scope = Some(ScopeId::new(2)));
        let authz = authorizer(store);

        let in_scope_1 = |id| EvalContext::new(user(id), "edit_invoice").in_scope(ScopeId::new(1));
        assert_eq!(authz.can(&in_scope_1(1)).await, Ok(true));
        assert_eq!(authz.can(&in_scope_1(2)).await, Ok(false));
    }

    #[tokio::test]
    async fn ownership_gate_flips_with_owner() {
        let mut store = FixtureStore::default();
        let edit = store.ability_with("edit_invoice", |a| a.only_owned = true);
        store.grant_to(&user(1), edit);
        let authz = authorizer(store);

        let ctx = EvalContext::new(user(1), "edit_invoice").on(EntityRef::new("Invoice", 5));
        assert_eq!(authz.can(&ctx.clone().owned_by(1)).await, Ok(true));
        assert_eq!(authz.can(&ctx.owned_by(2)).await, Ok(false));
    }

    #[tokio::test]
    async fn owner_registry_fills_missing_owner() {
        let mut store = FixtureStore::default();
        let edit = store.ability_with("edit_invoice", |a| a.only_owned = true);
        store.grant_to(&user(1), edit);

        let owners = StaticOwners::new()
            .with(EntityRef::new("Invoice", 5), 1)
            .with(EntityRef::new("Invoice", 6), 2);
        let authz = authorizer(store).with_owners(OwnerRegistry::new().register("Invoice", Arc::new(owners)));

        let ctx = EvalContext::new(user(1), "edit_invoice");
        assert_eq!(authz.can(&ctx.clone().on(EntityRef::new("Invoice", 5))).await, Ok(true));
        assert_eq!(authz.can(&ctx.clone().on(EntityRef::new("Invoice", 6))).await, Ok(false));
        // Caller-supplied owner wins over the registry.
        assert_eq!(
            authz.can(&ctx.on(EntityRef::new("Invoice", 6)).owned_by(1)).await,
            Ok(true)
        );
    }

    struct BrokenOwners;

    #[async_trait::async_trait]
    impl crate::ownership::OwnerResolver for BrokenOwners {
        async fn owner_of(&self, _target: &EntityRef) -> Result<Option<i64>, String> {
            Err("invoice db down".into())
        }
    }

    #[tokio::test]
    async fn owner_resolution_failure_is_an_error() {
        let mut store = FixtureStore::default();
        let edit = store.ability_with("edit_invoice", |a| a.only_owned = true);
        store.grant_to(&user(1), edit);
        let authz = authorizer(store).with_owners(OwnerRegistry::new().register("Invoice", Arc::new(BrokenOwners)));

        let ctx = EvalContext::new(user(1), "edit_invoice").on(EntityRef::new("Invoice", 5));
        assert!(matches!(authz.can(&ctx).await, Err(AuthzError::OwnerResolution(_))));
    }

    #[tokio::test]
    async fn repeated_checks_are_idempotent() {
        let mut store = FixtureStore::default();
        let edit = store.ability("edit_invoice");
        store.grant_to(&user(1), edit);
        let authz = authorizer(store);

        let ctx = EvalContext::new(user(1), "edit_invoice");
        let before = authz.store().permissions.clone();
        let first = authz.can(&ctx).await;
        for _ in 0..5 {
            assert_eq!(authz.can(&ctx).await, first);
        }
        assert_eq!(authz.store().permissions, before);
    }

    #[tokio::test]
    async fn store_outage_surfaces_as_error() {
        let store = FixtureStore {
            unavailable: true,
            ..Default::default()
        };
        let authz = authorizer(store);
        let ctx = EvalContext::new(user(1), "edit_invoice");
        assert!(matches!(authz.can(&ctx).await, Err(AuthzError::GrantStoreUnavailable(_))));
        assert!(matches!(authz.cannot(&ctx).await, Err(AuthzError::GrantStoreUnavailable(_))));
    }

    #[tokio::test]
    async fn malformed_rows_never_allow() {
        let mut store = FixtureStore::default();
        let manage = store.ability("manage_property");
        let manager = store.role("manager");
        store.grant_to_role(manager, manage);
        store.assign_with(manager, &user(1), |a| {
            a.restricted = true;
            a.restricted_to_id = Some(7);
        });
        let edit = store.ability_with("edit_invoice", |a| a.entity_id = Some(42));
        store.grant_to(&user(2), edit);
        let authz = authorizer(store);

        let property = EvalContext::new(user(1), "manage_property").on(EntityRef::new("Property", 999));
        assert!(matches!(
            authz.can(&property).await,
            Err(AuthzError::GrantStoreUnavailable(_))
        ));

        let invoice = EvalContext::new(user(2), "edit_invoice").on(EntityRef::new("Invoice", 43));
        assert!(matches!(
            authz.can(&invoice).await,
            Err(AuthzError::GrantStoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn has_role_respects_scope() {
        let mut store = FixtureStore::default();
        let editor = store.role("editor");
        store.assign_with(editor, &user(1), |a| a.scope = Some(ScopeId::new(1)));
        let authz = authorizer(store);

        assert_eq!(authz.has_role(&user(1), "editor", None).await, Ok(true));
        assert_eq!(authz.has_role(&user(1), "editor", Some(ScopeId::new(1))).await, Ok(true));
        assert_eq!(authz.has_role(&user(1), "editor", Some(ScopeId::new(2))).await, Ok(false));
        assert_eq!(authz.has_role(&user(1), "admin", None).await, Ok(false));
        assert_eq!(authz.has_role(&user(2), "editor", None).await, Ok(false));
    }

    #[tokio::test]
    async fn exists_is_independent_of_decision() {
        let mut store = FixtureStore::default();
        let edit = store.ability("edit_invoice");
        let view = store.ability("view_invoice");
        store.forbid_to(&user(1), edit);
        let authz = authorizer(store);

        // A forbid row exists even though `can` denies.
        assert_eq!(authz.exists(edit, &user(1)).await, Ok(true));
        assert_eq!(authz.exists(view, &user(1)).await, Ok(false));
        assert_eq!(authz.can(&EvalContext::new(user(1), "edit_invoice")).await, Ok(false));
    }

    #[tokio::test]
    async fn request_scope_loads_each_subject_once() {
        let mut store = FixtureStore::default();
        let edit = store.ability("edit_invoice");
        let view = store.ability("view_invoice");
        store.grant_to(&user(1), edit);
        store.grant_to(&user(2), view);
        let authz = Arc::new(authorizer(store));

        let scope = authz.request_scope();
        assert_eq!(scope.can(&EvalContext::new(user(1), "edit_invoice")).await, Ok(true));
        assert_eq!(scope.can(&EvalContext::new(user(1), "view_invoice")).await, Ok(false));
        assert_eq!(scope.clone().can(&EvalContext::new(user(2), "view_invoice")).await, Ok(true));
        assert_eq!(authz.store().snapshot_loads(), 2);

        // A new request starts with an empty cache.
        let next = authz.request_scope();
        assert_eq!(next.can(&EvalContext::new(user(1), "edit_invoice")).await, Ok(true));
        assert_eq!(authz.store().snapshot_loads(), 3);
    }

    #[tokio::test]
    async fn explain_matches_can() {
        let mut store = FixtureStore::default();
        let edit = store.ability_with("edit_invoice", |a| a.entity_type = Some("Invoice".into()));
        store.grant_to(&user(1), edit);
        let authz = Arc::new(authorizer(store));

        let ctx = EvalContext::new(user(1), "edit_invoice").on(EntityRef::new("Property", 1));
        let ex = authz.explain(&ctx).await.unwrap();
        assert_eq!(ex.allowed, authz.can(&ctx).await.unwrap());
        assert_eq!(
            ex.considered[0].outcome,
            explain::CandidateOutcome::Rejected(filter::Rejection::EntityMismatch)
        );

        let via_scope = authz.request_scope().explain(&ctx).await.unwrap();
        assert_eq!(via_scope.allowed, ex.allowed);
    }
}
