//! Read-side contract the decision engine consumes.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use gatehouse_core::{AbilityId, RoleId};

use crate::entity_ref::EntityRef;
use crate::model::{Ability, AssignedRole, Permission, Role};

/// Which table a missing record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Ability,
    Role,
    Assignment,
    Permission,
}

impl core::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            RecordKind::Ability => "ability",
            RecordKind::Role => "role",
            RecordKind::Assignment => "assignment",
            RecordKind::Permission => "permission",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A referenced record is missing (e.g. a permission points at a deleted ability).
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: i64 },

    /// A loaded row has a column combination the engine cannot interpret.
    #[error("{kind} {id} is malformed: {reason}")]
    Corrupt {
        kind: RecordKind,
        id: i64,
        reason: String,
    },
}

/// Read-only source of grant records.
///
/// The engine only reads consistent snapshots; batching and caching are the
/// implementation's concern. Implementations must be shareable across
/// concurrent checks.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// All role assignments whose subject is `subject`.
    async fn load_assigned_roles(&self, subject: &EntityRef) -> Result<Vec<AssignedRole>, StoreError>;

    /// All permissions whose subject is `subject` (grants and forbids).
    async fn load_direct_permissions(&self, subject: &EntityRef) -> Result<Vec<Permission>, StoreError>;

    /// All permissions whose subject is the role `role_id`.
    async fn load_role_permissions(&self, role_id: RoleId) -> Result<Vec<Permission>, StoreError>;

    async fn load_ability(&self, ability_id: AbilityId) -> Result<Ability, StoreError>;

    /// Only used by management queries (`has_role`), never by `can`.
    async fn load_role(&self, role_id: RoleId) -> Result<Role, StoreError>;
}

#[async_trait]
impl<S> GrantStore for Arc<S>
where
    S: GrantStore + ?Sized,
{
    async fn load_assigned_roles(&self, subject: &EntityRef) -> Result<Vec<AssignedRole>, StoreError> {
        (**self).load_assigned_roles(subject).await
    }

    async fn load_direct_permissions(&self, subject: &EntityRef) -> Result<Vec<Permission>, StoreError> {
        (**self).load_direct_permissions(subject).await
    }

    async fn load_role_permissions(&self, role_id: RoleId) -> Result<Vec<Permission>, StoreError> {
        (**self).load_role_permissions(role_id).await
    }

    async fn load_ability(&self, ability_id: AbilityId) -> Result<Ability, StoreError> {
        (**self).load_ability(ability_id).await
    }

    async fn load_role(&self, role_id: RoleId) -> Result<Role, StoreError> {
        (**self).load_role(role_id).await
    }
}
