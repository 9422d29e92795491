//! Write-side contract for the admin CRUD boundary.
//!
//! Structurally invalid records are rejected here, at write time, so the
//! decision pipeline only ever sees consistent data.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use gatehouse_core::{AbilityId, AssignmentId, DomainError, PermissionId, RoleId};

use crate::model::{
    Ability, AssignedRole, NewAbility, NewAssignment, NewPermission, NewRole, Permission, Role,
};
use crate::store::RecordKind;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdminError {
    /// The role is already assigned to that subject.
    #[error("role already assigned to this subject")]
    DuplicateAssignment,

    #[error("name '{0}' is already taken")]
    DuplicateName(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: i64 },

    #[error(transparent)]
    Invalid(#[from] DomainError),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl AdminError {
    pub fn not_found(kind: RecordKind, id: impl Into<i64>) -> Self {
        AdminError::NotFound { kind, id: id.into() }
    }
}

/// Admin CRUD over the grant tables.
///
/// Implementations validate in this order: record shape (`validate()`),
/// referenced records exist, uniqueness.
#[async_trait]
pub trait GrantAdmin: Send + Sync {
    async fn create_role(&self, draft: NewRole) -> Result<Role, AdminError>;
    async fn update_role(&self, id: RoleId, draft: NewRole) -> Result<Role, AdminError>;
    /// Also removes the role's permissions and assignments.
    async fn delete_role(&self, id: RoleId) -> Result<(), AdminError>;
    async fn list_roles(&self) -> Result<Vec<Role>, AdminError>;

    async fn create_ability(&self, draft: NewAbility) -> Result<Ability, AdminError>;
    async fn update_ability(&self, id: AbilityId, draft: NewAbility) -> Result<Ability, AdminError>;
    /// Also removes permissions referencing the ability.
    async fn delete_ability(&self, id: AbilityId) -> Result<(), AdminError>;
    async fn list_abilities(&self) -> Result<Vec<Ability>, AdminError>;

    /// Insert a permission row (grant or forbid, per `draft.forbidden`).
    async fn grant(&self, draft: NewPermission) -> Result<Permission, AdminError>;
    async fn revoke(&self, id: PermissionId) -> Result<(), AdminError>;

    /// Fails with `DuplicateAssignment` if `(role_id, entity_id, entity_type)`
    /// already exists; the existing row is left untouched.
    async fn assign(&self, draft: NewAssignment) -> Result<AssignedRole, AdminError>;
    async fn unassign(&self, id: AssignmentId) -> Result<(), AdminError>;
}

#[async_trait]
impl<A> GrantAdmin for Arc<A>
where
    A: GrantAdmin + ?Sized,
{
    async fn create_role(&self, draft: NewRole) -> Result<Role, AdminError> {
        (**self).create_role(draft).await
    }

    async fn update_role(&self, id: RoleId, draft: NewRole) -> Result<Role, AdminError> {
        (**self).update_role(id, draft).await
    }

    async fn delete_role(&self, id: RoleId) -> Result<(), AdminError> {
        (**self).delete_role(id).await
    }

    async fn list_roles(&self) -> Result<Vec<Role>, AdminError> {
        (**self).list_roles().await
    }

    async fn create_ability(&self, draft: NewAbility) -> Result<Ability, AdminError> {
        (**self).create_ability(draft).await
    }

    async fn update_ability(&self, id: AbilityId, draft: NewAbility) -> Result<Ability, AdminError> {
        (**self).update_ability(id, draft).await
    }

    async fn delete_ability(&self, id: AbilityId) -> Result<(), AdminError> {
        (**self).delete_ability(id).await
    }

    async fn list_abilities(&self) -> Result<Vec<Ability>, AdminError> {
        (**self).list_abilities().await
    }

    async fn grant(&self, draft: NewPermission) -> Result<Permission, AdminError> {
        (**self).grant(draft).await
    }

    async fn revoke(&self, id: PermissionId) -> Result<(), AdminError> {
        (**self).revoke(id).await
    }

    async fn assign(&self, draft: NewAssignment) -> Result<AssignedRole, AdminError> {
        (**self).assign(draft).await
    }

    async fn unassign(&self, id: AssignmentId) -> Result<(), AdminError> {
        (**self).unassign(id).await
    }
}
