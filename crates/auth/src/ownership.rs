//! Per-kind owner lookup supplied by the host application.
//!
//! Ownership is domain-specific (an invoice's owner lives in the invoicing
//! tables, a property's in another), so the engine never hard-codes it. Callers
//! may pass `target_owner_id` directly; otherwise the facade asks the resolver
//! registered for the target's kind.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::entity_ref::EntityRef;

#[async_trait]
pub trait OwnerResolver: Send + Sync {
    /// Owner id of `target`, or `None` if it has no owner (or does not exist).
    async fn owner_of(&self, target: &EntityRef) -> Result<Option<i64>, String>;
}

/// Resolver for tests and fixed datasets: a static `target → owner` map.
#[derive(Debug, Clone, Default)]
pub struct StaticOwners {
    owners: HashMap<EntityRef, i64>,
}

impl StaticOwners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, target: EntityRef, owner_id: i64) -> Self {
        self.owners.insert(target, owner_id);
        self
    }
}

#[async_trait]
impl OwnerResolver for StaticOwners {
    async fn owner_of(&self, target: &EntityRef) -> Result<Option<i64>, String> {
        Ok(self.owners.get(target).copied())
    }
}

/// Entity kind → owner resolver.
#[derive(Clone, Default)]
pub struct OwnerRegistry {
    resolvers: HashMap<String, Arc<dyn OwnerResolver>>,
}

impl OwnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, kind: impl Into<String>, resolver: Arc<dyn OwnerResolver>) -> Self {
        self.resolvers.insert(kind.into(), resolver);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// `Ok(None)` when no resolver is registered for the target's kind.
    pub async fn owner_of(&self, target: &EntityRef) -> Result<Option<i64>, String> {
        match self.resolvers.get(&target.kind) {
            Some(resolver) => resolver.owner_of(target).await,
            None => Ok(None),
        }
    }
}

impl core::fmt::Debug for OwnerRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut kinds: Vec<&str> = self.resolvers.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("OwnerRegistry").field("kinds", &kinds).finish()
    }
}
