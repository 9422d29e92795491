//! Grant records: abilities, roles, role assignments and permissions.
//!
//! These are row-shaped (they mirror the persisted columns) so that structurally
//! invalid combinations can be represented and rejected at the admin boundary
//! before they ever reach the decision pipeline.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use gatehouse_core::{
    AbilityId, AssignmentId, DomainError, DomainResult, Entity, PermissionId, RoleId, ScopeId,
};

use crate::entity_ref::{EntityRef, ROLE_KIND};

// ─────────────────────────────────────────────────────────────────────────────
// Ability
// ─────────────────────────────────────────────────────────────────────────────

/// A named capability (e.g. `"edit_invoice"`).
///
/// Entity scoping:
/// - `entity_type` + `entity_id`: one specific entity instance
/// - `entity_type` only: any entity of that type
/// - neither: global
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    pub id: AbilityId,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub entity_id: Option<i64>,
    /// Valid only when the subject owns the target.
    #[serde(default)]
    pub only_owned: bool,
    /// Opaque; passed through to callers, never evaluated.
    #[serde(default)]
    pub options: JsonValue,
    #[serde(default)]
    pub scope: Option<ScopeId>,
}

/// Entity scoping of an ability, derived from its `entity_type`/`entity_id` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityScope<'a> {
    Global,
    Kind(&'a str),
    Instance(&'a str, i64),
    /// `entity_id` without `entity_type`; matches no target.
    Malformed,
}

impl Ability {
    pub fn validate(&self) -> DomainResult<()> {
        validate_name("ability", &self.name)?;
        validate_entity_columns(self.entity_type.as_deref(), self.entity_id)
    }

    /// Interprets the entity columns.
    pub fn entity_scope(&self) -> EntityScope<'_> {
        match (self.entity_type.as_deref(), self.entity_id) {
            (Some(kind), Some(id)) => EntityScope::Instance(kind, id),
            (Some(kind), None) => EntityScope::Kind(kind),
            (None, Some(_)) => EntityScope::Malformed,
            (None, None) => EntityScope::Global,
        }
    }
}

impl Entity for Ability {
    type Id = AbilityId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn kind() -> &'static str {
        "Ability"
    }
}

/// Ability fields supplied on create/update (the store assigns the id).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewAbility {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub entity_id: Option<i64>,
    #[serde(default)]
    pub only_owned: bool,
    #[serde(default)]
    pub options: JsonValue,
    #[serde(default)]
    pub scope: Option<ScopeId>,
}

impl NewAbility {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn on_kind(mut self, kind: impl Into<String>) -> Self {
        self.entity_type = Some(kind.into());
        self
    }

    pub fn on_instance(mut self, target: &EntityRef) -> Self {
        self.entity_type = Some(target.kind.clone());
        self.entity_id = Some(target.id);
        self
    }

    pub fn owned_only(mut self) -> Self {
        self.only_owned = true;
        self
    }

    pub fn in_scope(mut self, scope: ScopeId) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn into_record(self, id: AbilityId) -> Ability {
        Ability {
            id,
            name: self.name,
            title: self.title,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            only_owned: self.only_owned,
            options: self.options,
            scope: self.scope,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        validate_name("ability", &self.name)?;
        validate_entity_columns(self.entity_type.as_deref(), self.entity_id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Role
// ─────────────────────────────────────────────────────────────────────────────

/// A named bundle of abilities.
///
/// The abilities are not stored on the role: they are the permissions whose
/// subject is `("Role", role.id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    /// Globally unique.
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub scope: Option<ScopeId>,
}

impl Role {
    /// The role in its capacity as a permission subject.
    pub fn as_subject(&self) -> EntityRef {
        EntityRef::role(self.id)
    }
}

impl Entity for Role {
    type Id = RoleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn kind() -> &'static str {
        ROLE_KIND
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRole {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub scope: Option<ScopeId>,
}

impl NewRole {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        validate_name("role", &self.name)
    }

    pub fn into_record(self, id: RoleId) -> Role {
        Role {
            id,
            name: self.name,
            title: self.title,
            scope: self.scope,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AssignedRole
// ─────────────────────────────────────────────────────────────────────────────

/// Binding of a role to a subject.
///
/// # Invariants
/// - `restricted == restricted_to_id.is_some()`
/// - `restricted_to_id` implies `restricted_to_type`
/// - at most one row per `(role_id, entity_id, entity_type)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedRole {
    pub id: AssignmentId,
    pub role_id: RoleId,
    pub entity_id: i64,
    pub entity_type: String,
    #[serde(default)]
    pub restricted: bool,
    #[serde(default)]
    pub restricted_to_id: Option<i64>,
    #[serde(default)]
    pub restricted_to_type: Option<String>,
    #[serde(default)]
    pub scope: Option<ScopeId>,
}

impl AssignedRole {
    pub fn subject(&self) -> EntityRef {
        EntityRef::new(self.entity_type.clone(), self.entity_id)
    }

    /// The single target this assignment is confined to, if restricted.
    /// Only meaningful on records that pass [`AssignedRole::validate`].
    pub fn restricted_to(&self) -> Option<EntityRef> {
        if !self.restricted {
            return None;
        }
        match (&self.restricted_to_type, self.restricted_to_id) {
            (Some(kind), Some(id)) => Some(EntityRef::new(kind.clone(), id)),
            _ => None,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        validate_assignment_columns(
            &self.entity_type,
            self.restricted,
            self.restricted_to_id,
            self.restricted_to_type.as_deref(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAssignment {
    pub role_id: RoleId,
    pub entity_id: i64,
    pub entity_type: String,
    #[serde(default)]
    pub restricted: bool,
    #[serde(default)]
    pub restricted_to_id: Option<i64>,
    #[serde(default)]
    pub restricted_to_type: Option<String>,
    #[serde(default)]
    pub scope: Option<ScopeId>,
}

impl NewAssignment {
    pub fn new(role_id: RoleId, subject: &EntityRef) -> Self {
        Self {
            role_id,
            entity_id: subject.id,
            entity_type: subject.kind.clone(),
            restricted: false,
            restricted_to_id: None,
            restricted_to_type: None,
            scope: None,
        }
    }

    pub fn restricted_to(mut self, target: &EntityRef) -> Self {
        self.restricted = true;
        self.restricted_to_id = Some(target.id);
        self.restricted_to_type = Some(target.kind.clone());
        self
    }

    pub fn in_scope(mut self, scope: ScopeId) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn subject(&self) -> EntityRef {
        EntityRef::new(self.entity_type.clone(), self.entity_id)
    }

    pub fn validate(&self) -> DomainResult<()> {
        validate_assignment_columns(
            &self.entity_type,
            self.restricted,
            self.restricted_to_id,
            self.restricted_to_type.as_deref(),
        )
    }

    pub fn into_record(self, id: AssignmentId) -> AssignedRole {
        AssignedRole {
            id,
            role_id: self.role_id,
            entity_id: self.entity_id,
            entity_type: self.entity_type,
            restricted: self.restricted,
            restricted_to_id: self.restricted_to_id,
            restricted_to_type: self.restricted_to_type,
            scope: self.scope,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Permission
// ─────────────────────────────────────────────────────────────────────────────

/// Direct grant (or forbiddance) of one ability to one subject.
///
/// The subject may be an actor (`User`) or a role, which is how role-mediated
/// grants are stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub ability_id: AbilityId,
    pub entity_id: i64,
    pub entity_type: String,
    #[serde(default)]
    pub forbidden: bool,
    /// Opaque; passed through to callers, never evaluated.
    #[serde(default)]
    pub conditions: JsonValue,
}

impl Permission {
    pub fn subject(&self) -> EntityRef {
        EntityRef::new(self.entity_type.clone(), self.entity_id)
    }

    pub fn validate(&self) -> DomainResult<()> {
        validate_subject_kind(&self.entity_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPermission {
    pub ability_id: AbilityId,
    pub entity_id: i64,
    pub entity_type: String,
    #[serde(default)]
    pub forbidden: bool,
    #[serde(default)]
    pub conditions: JsonValue,
}

impl NewPermission {
    pub fn grant(ability_id: AbilityId, subject: &EntityRef) -> Self {
        Self {
            ability_id,
            entity_id: subject.id,
            entity_type: subject.kind.clone(),
            forbidden: false,
            conditions: JsonValue::Null,
        }
    }

    pub fn forbid(ability_id: AbilityId, subject: &EntityRef) -> Self {
        Self {
            forbidden: true,
            ..Self::grant(ability_id, subject)
        }
    }

    pub fn subject(&self) -> EntityRef {
        EntityRef::new(self.entity_type.clone(), self.entity_id)
    }

    pub fn validate(&self) -> DomainResult<()> {
        validate_subject_kind(&self.entity_type)
    }

    pub fn into_record(self, id: PermissionId) -> Permission {
        Permission {
            id,
            ability_id: self.ability_id,
            entity_id: self.entity_id,
            entity_type: self.entity_type,
            forbidden: self.forbidden,
            conditions: self.conditions,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation helpers
// ─────────────────────────────────────────────────────────────────────────────

fn validate_name(what: &str, name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation(format!("{what} name must not be empty")));
    }
    Ok(())
}

fn validate_subject_kind(kind: &str) -> DomainResult<()> {
    if kind.trim().is_empty() {
        return Err(DomainError::validation("subject entity_type must not be empty"));
    }
    Ok(())
}

fn validate_entity_columns(entity_type: Option<&str>, entity_id: Option<i64>) -> DomainResult<()> {
    if entity_id.is_some() && entity_type.is_none() {
        return Err(DomainError::validation("entity_id requires entity_type"));
    }
    if matches!(entity_type, Some(t) if t.trim().is_empty()) {
        return Err(DomainError::validation("entity_type must not be empty"));
    }
    Ok(())
}

fn validate_assignment_columns(
    entity_type: &str,
    restricted: bool,
    restricted_to_id: Option<i64>,
    restricted_to_type: Option<&str>,
) -> DomainResult<()> {
    validate_subject_kind(entity_type)?;

    if restricted != restricted_to_id.is_some() {
        return Err(DomainError::validation(
            "restricted must be set exactly when restricted_to_id is set",
        ));
    }
    if restricted_to_id.is_some() && restricted_to_type.is_none() {
        return Err(DomainError::validation("restricted_to_id requires restricted_to_type"));
    }
    Ok(())
}
