//! Polymorphic subject/target references.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use gatehouse_core::{DomainError, RoleId, ValueObject};

/// Entity kind used when a role appears as the subject of a permission.
pub const ROLE_KIND: &str = "Role";

/// A typed reference to any entity in the system (a user, a role, a customer...).
///
/// Stands in for the `(EntityType, EntityID)` column pairs of the grant tables.
/// Equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: String,
    pub id: i64,
}

impl EntityRef {
    pub fn new(kind: impl Into<String>, id: i64) -> Self {
        Self {
            kind: kind.into(),
            id,
        }
    }

    /// Reference to a role acting as a permission subject.
    pub fn role(role_id: RoleId) -> Self {
        Self::new(ROLE_KIND, role_id.get())
    }

}

impl ValueObject for EntityRef {}

impl core::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Parses the `Kind:id` form produced by `Display`.
impl FromStr for EntityRef {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| DomainError::invalid_id(format!("EntityRef: expected Kind:id, got '{s}'")))?;

        let kind = kind.trim();
        if kind.is_empty() {
            return Err(DomainError::invalid_id("EntityRef: empty kind"));
        }

        let id = id
            .trim()
            .parse::<i64>()
            .map_err(|e| DomainError::invalid_id(format!("EntityRef: {e}")))?;

        Ok(Self::new(kind, id))
    }
}
