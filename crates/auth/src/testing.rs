//! In-crate grant fixtures for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use gatehouse_core::{AbilityId, AssignmentId, PermissionId, RoleId};

use crate::entity_ref::EntityRef;
use crate::model::{Ability, AssignedRole, NewAbility, NewAssignment, Permission, Role};
use crate::store::{GrantStore, RecordKind, StoreError};

#[derive(Debug, Default)]
pub(crate) struct FixtureStore {
    pub(crate) abilities: Vec<Ability>,
    pub(crate) roles: Vec<Role>,
    pub(crate) assignments: Vec<AssignedRole>,
    pub(crate) permissions: Vec<Permission>,
    pub(crate) unavailable: bool,
    pub(crate) ability_loads: AtomicUsize,
    pub(crate) snapshot_loads: AtomicUsize,
}

impl FixtureStore {
    pub(crate) fn ability(&mut self, name: &str) -> AbilityId {
        self.ability_with(name, |_| {})
    }

    pub(crate) fn ability_with(&mut self, name: &str, f: impl FnOnce(&mut Ability)) -> AbilityId {
        let id = AbilityId::new(self.abilities.len() as i64 + 1);
        let mut ability = NewAbility::named(name).into_record(id);
        f(&mut ability);
        self.abilities.push(ability);
        id
    }

    pub(crate) fn role(&mut self, name: &str) -> RoleId {
        let id = RoleId::new(self.roles.len() as i64 + 1);
        self.roles.push(Role {
            id,
            name: name.to_string(),
            title: String::new(),
            scope: None,
        });
        id
    }

    fn permission(&mut self, ability_id: AbilityId, subject: &EntityRef, forbidden: bool) {
        let id = PermissionId::new(self.permissions.len() as i64 + 1);
        self.permissions.push(Permission {
            id,
            ability_id,
            entity_id: subject.id,
            entity_type: subject.kind.clone(),
            forbidden,
            conditions: JsonValue::Null,
        });
    }

    pub(crate) fn grant_to(&mut self, subject: &EntityRef, ability_id: AbilityId) {
        self.permission(ability_id, subject, false);
    }

    pub(crate) fn forbid_to(&mut self, subject: &EntityRef, ability_id: AbilityId) {
        self.permission(ability_id, subject, true);
    }

    pub(crate) fn grant_to_role(&mut self, role_id: RoleId, ability_id: AbilityId) {
        self.permission(ability_id, &EntityRef::role(role_id), false);
    }

    pub(crate) fn forbid_to_role(&mut self, role_id: RoleId, ability_id: AbilityId) {
        self.permission(ability_id, &EntityRef::role(role_id), true);
    }

    pub(crate) fn assign(&mut self, role_id: RoleId, subject: &EntityRef) -> AssignmentId {
        self.assign_with(role_id, subject, |_| {})
    }

    pub(crate) fn assign_with(
        &mut self,
        role_id: RoleId,
        subject: &EntityRef,
        f: impl FnOnce(&mut AssignedRole),
    ) -> AssignmentId {
        let id = AssignmentId::new(self.assignments.len() as i64 + 1);
        let mut assignment = NewAssignment::new(role_id, subject).into_record(id);
        f(&mut assignment);
        self.assignments.push(assignment);
        id
    }

    pub(crate) fn ability_loads(&self) -> usize {
        self.ability_loads.load(Ordering::SeqCst)
    }

    pub(crate) fn snapshot_loads(&self) -> usize {
        self.snapshot_loads.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("fixture offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl GrantStore for FixtureStore {
    async fn load_assigned_roles(&self, subject: &EntityRef) -> Result<Vec<AssignedRole>, StoreError> {
        self.check()?;
        self.snapshot_loads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .assignments
            .iter()
            .filter(|a| &a.subject() == subject)
            .cloned()
            .collect())
    }

    async fn load_direct_permissions(&self, subject: &EntityRef) -> Result<Vec<Permission>, StoreError> {
        self.check()?;
        Ok(self
            .permissions
            .iter()
            .filter(|p| &p.subject() == subject)
            .cloned()
            .collect())
    }

    async fn load_role_permissions(&self, role_id: RoleId) -> Result<Vec<Permission>, StoreError> {
        self.load_direct_permissions(&EntityRef::role(role_id)).await
    }

    async fn load_ability(&self, ability_id: AbilityId) -> Result<Ability, StoreError> {
        self.check()?;
        self.ability_loads.fetch_add(1, Ordering::SeqCst);
        self.abilities
            .iter()
            .find(|a| a.id == ability_id)
            .cloned()
            .ok_or(StoreError::NotFound {
                kind: RecordKind::Ability,
                id: ability_id.get(),
            })
    }

    async fn load_role(&self, role_id: RoleId) -> Result<Role, StoreError> {
        self.check()?;
        self.roles
            .iter()
            .find(|r| r.id == role_id)
            .cloned()
            .ok_or(StoreError::NotFound {
                kind: RecordKind::Role,
                id: role_id.get(),
            })
    }
}
