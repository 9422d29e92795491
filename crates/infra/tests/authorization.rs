//! End-to-end decision tests: admin writes → InMemoryGrantStore → Authorizer.

use std::sync::Arc;

use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

use gatehouse_auth::{
    AdminError, Authorizer, AuthzError, EntityRef, EvalContext, GrantAdmin, NewAbility,
    NewAssignment, NewPermission, NewRole, OwnerRegistry, StaticOwners,
};
use gatehouse_core::ScopeId;
use gatehouse_infra::InMemoryGrantStore;

fn user(id: i64) -> EntityRef {
    EntityRef::new("User", id)
}

fn setup() -> (Arc<InMemoryGrantStore>, Authorizer<Arc<InMemoryGrantStore>>) {
    let store = Arc::new(InMemoryGrantStore::new());
    let authz = Authorizer::new(Arc::clone(&store));
    (store, authz)
}

/// Forbid overrides allow. Intentional, non-negotiable precedence: an explicit
/// forbid always wins over any grant for the same ability/target.
#[tokio::test]
async fn forbid_overrides_allow() {
    let (store, authz) = setup();
    let edit = store.create_ability(NewAbility::named("edit_invoice")).await.unwrap();
    let editor = store.create_role(NewRole::named("editor")).await.unwrap();
    store
        .grant(NewPermission::grant(edit.id, &editor.as_subject()))
        .await
        .unwrap();
    store.assign(NewAssignment::new(editor.id, &user(1))).await.unwrap();

    let ctx = EvalContext::new(user(1), "edit_invoice");
    assert_eq!(authz.can(&ctx).await, Ok(true));

    store.grant(NewPermission::forbid(edit.id, &user(1))).await.unwrap();
    assert_eq!(authz.can(&ctx).await, Ok(false));
}

#[tokio::test]
async fn default_deny() {
    let (store, authz) = setup();
    store.create_ability(NewAbility::named("edit_invoice")).await.unwrap();
    assert_eq!(authz.can(&EvalContext::new(user(1), "edit_invoice")).await, Ok(false));
}

#[tokio::test]
async fn entity_scoped_ability_precision() {
    let (store, authz) = setup();
    let invoice42 = EntityRef::new("Invoice", 42);
    let edit = store
        .create_ability(NewAbility::named("edit_invoice").on_instance(&invoice42))
        .await
        .unwrap();
    store.grant(NewPermission::grant(edit.id, &user(1))).await.unwrap();

    let ctx = EvalContext::new(user(1), "edit_invoice");
    assert_eq!(authz.can(&ctx.clone().on(invoice42)).await, Ok(true));
    assert_eq!(authz.can(&ctx.on(EntityRef::new("Invoice", 43))).await, Ok(false));
}

#[tokio::test]
async fn restricted_role_containment() {
    let (store, authz) = setup();
    let property7 = EntityRef::new("Property", 7);
    let manage = store.create_ability(NewAbility::named("manage_property")).await.unwrap();
    let manager = store.create_role(NewRole::named("manager")).await.unwrap();
    store
        .grant(NewPermission::grant(manage.id, &manager.as_subject()))
        .await
        .unwrap();
    store
        .assign(NewAssignment::new(manager.id, &user(1)).restricted_to(&property7))
        .await
        .unwrap();

    let ctx = EvalContext::new(user(1), "manage_property");
    assert_eq!(authz.can(&ctx.clone().on(property7)).await, Ok(true));
    assert_eq!(authz.can(&ctx.clone().on(EntityRef::new("Property", 8))).await, Ok(false));
    assert_eq!(authz.can(&ctx.on(EntityRef::new("Invoice", 7))).await, Ok(false));
    assert_eq!(authz.has_role(&user(1), "manager", None).await, Ok(true));
}

#[tokio::test]
async fn scope_isolation() {
    let (store, authz) = setup();
    let edit = store.create_ability(NewAbility::named("edit_invoice")).await.unwrap();
    let editor = store.create_role(NewRole::named("editor")).await.unwrap();
    store
        .grant(NewPermission::grant(edit.id, &editor.as_subject()))
        .await
        .unwrap();
    store
        .assign(NewAssignment::new(editor.id, &user(1)).in_scope(ScopeId::new(1)))
        .await
        .unwrap();
    store
        .assign(NewAssignment::new(editor.id, &user(2)).in_scope(ScopeId::new(2)))
        .await
        .unwrap();

    let scoped = |id, scope| EvalContext::new(user(id), "edit_invoice").in_scope(ScopeId::new(scope));
    assert_eq!(authz.can(&scoped(1, 1)).await, Ok(true));
    assert_eq!(authz.can(&scoped(2, 1)).await, Ok(false));
    assert_eq!(authz.can(&scoped(2, 2)).await, Ok(true));
    assert_eq!(authz.can(&scoped(1, 2)).await, Ok(false));
}

#[tokio::test]
async fn ownership_gate() {
    let (store, authz) = setup();
    let edit = store
        .create_ability(NewAbility::named("edit_invoice").on_kind("Invoice").owned_only())
        .await
        .unwrap();
    store.grant(NewPermission::grant(edit.id, &user(1))).await.unwrap();

    let ctx = EvalContext::new(user(1), "edit_invoice").on(EntityRef::new("Invoice", 5));
    assert_eq!(authz.can(&ctx.clone().owned_by(1)).await, Ok(true));
    assert_eq!(authz.can(&ctx.owned_by(2)).await, Ok(false));
}

#[tokio::test]
async fn ownership_via_registry() {
    let store = Arc::new(InMemoryGrantStore::new());
    let edit = store
        .create_ability(NewAbility::named("edit_invoice").owned_only())
        .await
        .unwrap();
    store.grant(NewPermission::grant(edit.id, &user(1))).await.unwrap();

    let owners = StaticOwners::new().with(EntityRef::new("Invoice", 5), 1);
    let authz = Authorizer::new(Arc::clone(&store))
        .with_owners(OwnerRegistry::new().register("Invoice", Arc::new(owners)));

    let ctx = EvalContext::new(user(1), "edit_invoice");
    assert_eq!(authz.can(&ctx.clone().on(EntityRef::new("Invoice", 5))).await, Ok(true));
    assert_eq!(authz.can(&ctx.on(EntityRef::new("Invoice", 6))).await, Ok(false));
}

#[tokio::test]
async fn uniqueness_enforced_at_write_time() {
    let (store, authz) = setup();
    let editor = store.create_role(NewRole::named("editor")).await.unwrap();
    store
        .assign(NewAssignment::new(editor.id, &user(1)).in_scope(ScopeId::new(1)))
        .await
        .unwrap();

    let again = store
        .assign(NewAssignment::new(editor.id, &user(1)).in_scope(ScopeId::new(9)))
        .await;
    assert_eq!(again, Err(AdminError::DuplicateAssignment));

    assert_eq!(authz.has_role(&user(1), "editor", Some(ScopeId::new(1))).await, Ok(true));
    assert_eq!(authz.has_role(&user(1), "editor", Some(ScopeId::new(9))).await, Ok(false));
}

#[tokio::test]
async fn outage_is_an_error_not_a_deny() {
    let (store, authz) = setup();
    let edit = store.create_ability(NewAbility::named("edit_invoice")).await.unwrap();
    store.grant(NewPermission::grant(edit.id, &user(1))).await.unwrap();

    store.set_unavailable(true);
    let ctx = EvalContext::new(user(1), "edit_invoice");
    assert!(matches!(authz.can(&ctx).await, Err(AuthzError::GrantStoreUnavailable(_))));
    assert!(matches!(authz.exists(edit.id, &user(1)).await, Err(AuthzError::GrantStoreUnavailable(_))));

    store.set_unavailable(false);
    assert_eq!(authz.can(&ctx).await, Ok(true));
}

#[tokio::test]
async fn cancellation_returns_cancelled() {
    let (store, authz) = setup();
    let edit = store.create_ability(NewAbility::named("edit_invoice")).await.unwrap();
    store.grant(NewPermission::grant(edit.id, &user(1))).await.unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let ctx = EvalContext::new(user(1), "edit_invoice").with_cancellation(token);
    assert_eq!(authz.can(&ctx).await, Err(AuthzError::Cancelled));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checks_share_one_store() {
    let store = Arc::new(InMemoryGrantStore::new());
    let edit = store.create_ability(NewAbility::named("edit_invoice")).await.unwrap();
    for id in 1..=10 {
        if id % 2 == 0 {
            store.grant(NewPermission::grant(edit.id, &user(id))).await.unwrap();
        }
    }
    let authz = Arc::new(Authorizer::new(Arc::clone(&store)));

    let mut handles = Vec::new();
    for id in 1..=10 {
        let authz = Arc::clone(&authz);
        handles.push(tokio::spawn(async move {
            (id, authz.can(&EvalContext::new(user(id), "edit_invoice")).await)
        }));
    }
    for handle in handles {
        let (id, result) = handle.await.unwrap();
        assert_eq!(result, Ok(id % 2 == 0));
    }
}

#[derive(Debug, Clone)]
struct Row {
    via_role: bool,
    forbidden: bool,
}

fn row() -> impl Strategy<Value = Row> {
    (any::<bool>(), any::<bool>()).prop_map(|(via_role, forbidden)| Row { via_role, forbidden })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        ..ProptestConfig::default()
    })]

    /// Property: for global grants, `can` is allowed exactly when at least one
    /// grant and no forbid exist, and repeated calls agree (idempotence).
    #[test]
    fn decision_matches_precedence_and_is_idempotent(rows in prop::collection::vec(row(), 0..8)) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let (store, authz) = setup();
            let edit = store.create_ability(NewAbility::named("edit_invoice")).await.unwrap();
            let role = store.create_role(NewRole::named("editor")).await.unwrap();
            store.assign(NewAssignment::new(role.id, &user(1))).await.unwrap();

            for r in &rows {
                let subject = if r.via_role { role.as_subject() } else { user(1) };
                let draft = if r.forbidden {
                    NewPermission::forbid(edit.id, &subject)
                } else {
                    NewPermission::grant(edit.id, &subject)
                };
                store.grant(draft).await.unwrap();
            }

            let expected = rows.iter().any(|r| !r.forbidden) && rows.iter().all(|r| !r.forbidden);
            let ctx = EvalContext::new(user(1), "edit_invoice");
            let first = authz.can(&ctx).await.unwrap();
            let second = authz.can(&ctx).await.unwrap();

            assert_eq!(first, expected);
            assert_eq!(first, second);
        });
    }
}
