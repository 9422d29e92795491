use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use gatehouse_auth::{
    Ability, AdminError, AssignedRole, EntityRef, GrantAdmin, GrantStore, NewAbility,
    NewAssignment, NewPermission, NewRole, Permission, ROLE_KIND, RecordKind, Role, StoreError,
};
use gatehouse_core::{AbilityId, AssignmentId, PermissionId, RoleId};

#[derive(Debug, Default)]
struct Tables {
    abilities: BTreeMap<AbilityId, Ability>,
    roles: BTreeMap<RoleId, Role>,
    assignments: BTreeMap<AssignmentId, AssignedRole>,
    permissions: BTreeMap<PermissionId, Permission>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn role_name_taken(&self, name: &str, except: Option<RoleId>) -> bool {
        self.roles
            .values()
            .any(|r| r.name == name && Some(r.id) != except)
    }

    fn permissions_of(&self, subject: &EntityRef) -> Vec<Permission> {
        self.permissions
            .values()
            .filter(|p| p.entity_id == subject.id && p.entity_type == subject.kind)
            .cloned()
            .collect()
    }
}

/// In-memory grant tables for tests/dev.
///
/// All tables sit behind one `RwLock` so every read sees a consistent snapshot.
/// The lock is never held across an await. Ids are assigned from a single
/// sequence starting at 1.
#[derive(Debug, Default)]
pub struct InMemoryGrantStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl InMemoryGrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a storage outage: every read and write fails while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("grant store offline".to_string()));
        }
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, AdminError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AdminError::Unavailable("grant store offline".to_string()));
        }
        self.tables
            .write()
            .map_err(|_| AdminError::Unavailable("lock poisoned".to_string()))
    }

    fn read_admin(&self) -> Result<RwLockReadGuard<'_, Tables>, AdminError> {
        self.read().map_err(|e| AdminError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl GrantStore for InMemoryGrantStore {
    async fn load_assigned_roles(&self, subject: &EntityRef) -> Result<Vec<AssignedRole>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .assignments
            .values()
            .filter(|a| a.entity_id == subject.id && a.entity_type == subject.kind)
            .cloned()
            .collect())
    }

    async fn load_direct_permissions(&self, subject: &EntityRef) -> Result<Vec<Permission>, StoreError> {
        Ok(self.read()?.permissions_of(subject))
    }

    async fn load_role_permissions(&self, role_id: RoleId) -> Result<Vec<Permission>, StoreError> {
        Ok(self.read()?.permissions_of(&EntityRef::role(role_id)))
    }

    async fn load_ability(&self, ability_id: AbilityId) -> Result<Ability, StoreError> {
        self.read()?
            .abilities
            .get(&ability_id)
            .cloned()
            .ok_or(StoreError::NotFound {
                kind: RecordKind::Ability,
                id: ability_id.get(),
            })
    }

    async fn load_role(&self, role_id: RoleId) -> Result<Role, StoreError> {
        self.read()?
            .roles
            .get(&role_id)
            .cloned()
            .ok_or(StoreError::NotFound {
                kind: RecordKind::Role,
                id: role_id.get(),
            })
    }
}

#[async_trait]
impl GrantAdmin for InMemoryGrantStore {
    async fn create_role(&self, draft: NewRole) -> Result<Role, AdminError> {
        draft.validate()?;
        let mut tables = self.write()?;
        if tables.role_name_taken(&draft.name, None) {
            return Err(AdminError::DuplicateName(draft.name));
        }

        let role = draft.into_record(RoleId::new(tables.next_id()));
        tables.roles.insert(role.id, role.clone());
        tracing::info!(role_id = %role.id, name = %role.name, "role created");
        Ok(role)
    }

    async fn update_role(&self, id: RoleId, draft: NewRole) -> Result<Role, AdminError> {
        draft.validate()?;
        let mut tables = self.write()?;
        if !tables.roles.contains_key(&id) {
            return Err(AdminError::not_found(RecordKind::Role, id));
        }
        if tables.role_name_taken(&draft.name, Some(id)) {
            return Err(AdminError::DuplicateName(draft.name));
        }

        let role = draft.into_record(id);
        tables.roles.insert(id, role.clone());
        Ok(role)
    }

    async fn delete_role(&self, id: RoleId) -> Result<(), AdminError> {
        let mut tables = self.write()?;
        if tables.roles.remove(&id).is_none() {
            return Err(AdminError::not_found(RecordKind::Role, id));
        }

        let as_subject = EntityRef::role(id);
        tables
            .permissions
            .retain(|_, p| !(p.entity_type == as_subject.kind && p.entity_id == as_subject.id));
        tables.assignments.retain(|_, a| a.role_id != id);
        tracing::info!(role_id = %id, "role deleted");
        Ok(())
    }

    async fn list_roles(&self) -> Result<Vec<Role>, AdminError> {
        Ok(self.read_admin()?.roles.values().cloned().collect())
    }

    async fn create_ability(&self, draft: NewAbility) -> Result<Ability, AdminError> {
        draft.validate()?;
        let mut tables = self.write()?;
        let ability = draft.into_record(AbilityId::new(tables.next_id()));
        tables.abilities.insert(ability.id, ability.clone());
        tracing::info!(ability_id = %ability.id, name = %ability.name, "ability created");
        Ok(ability)
    }

    async fn update_ability(&self, id: AbilityId, draft: NewAbility) -> Result<Ability, AdminError> {
        draft.validate()?;
        let mut tables = self.write()?;
        if !tables.abilities.contains_key(&id) {
            return Err(AdminError::not_found(RecordKind::Ability, id));
        }

        let ability = draft.into_record(id);
        tables.abilities.insert(id, ability.clone());
        Ok(ability)
    }

    async fn delete_ability(&self, id: AbilityId) -> Result<(), AdminError> {
        let mut tables = self.write()?;
        if tables.abilities.remove(&id).is_none() {
            return Err(AdminError::not_found(RecordKind::Ability, id));
        }
        tables.permissions.retain(|_, p| p.ability_id != id);
        Ok(())
    }

    async fn list_abilities(&self) -> Result<Vec<Ability>, AdminError> {
        Ok(self.read_admin()?.abilities.values().cloned().collect())
    }

    async fn grant(&self, draft: NewPermission) -> Result<Permission, AdminError> {
        draft.validate()?;
        let mut tables = self.write()?;
        if !tables.abilities.contains_key(&draft.ability_id) {
            return Err(AdminError::not_found(RecordKind::Ability, draft.ability_id));
        }
        if draft.entity_type == ROLE_KIND && !tables.roles.contains_key(&RoleId::new(draft.entity_id)) {
            return Err(AdminError::not_found(RecordKind::Role, draft.entity_id));
        }

        let permission = draft.into_record(PermissionId::new(tables.next_id()));
        tables.permissions.insert(permission.id, permission.clone());
        tracing::info!(
            permission_id = %permission.id,
            ability_id = %permission.ability_id,
            subject = %permission.subject(),
            forbidden = permission.forbidden,
            "permission written"
        );
        Ok(permission)
    }

    async fn revoke(&self, id: PermissionId) -> Result<(), AdminError> {
        let mut tables = self.write()?;
        tables
            .permissions
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AdminError::not_found(RecordKind::Permission, id))
    }

    async fn assign(&self, draft: NewAssignment) -> Result<AssignedRole, AdminError> {
        draft.validate()?;
        let mut tables = self.write()?;
        if !tables.roles.contains_key(&draft.role_id) {
            return Err(AdminError::not_found(RecordKind::Role, draft.role_id));
        }
        let duplicate = tables.assignments.values().any(|a| {
            a.role_id == draft.role_id
                && a.entity_id == draft.entity_id
                && a.entity_type == draft.entity_type
        });
        if duplicate {
            return Err(AdminError::DuplicateAssignment);
        }

        let assignment = draft.into_record(AssignmentId::new(tables.next_id()));
        tables.assignments.insert(assignment.id, assignment.clone());
        tracing::info!(
            assignment_id = %assignment.id,
            role_id = %assignment.role_id,
            subject = %assignment.subject(),
            restricted = assignment.restricted,
            "role assigned"
        );
        Ok(assignment)
    }

    async fn unassign(&self, id: AssignmentId) -> Result<(), AdminError> {
        let mut tables = self.write()?;
        tables
            .assignments
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AdminError::not_found(RecordKind::Assignment, id))
    }
}
