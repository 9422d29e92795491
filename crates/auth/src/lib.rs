//! `gatehouse-auth`: the authorization decision engine.
//!
//! Given a subject and a requested ability, decide allow/deny by combining
//! direct grants, role-mediated grants, scoping, restriction, ownership and
//! explicit forbiddance. Decoupled from HTTP and storage: grants come in
//! through the [`GrantStore`] trait.

pub mod admin;
pub mod claims;
pub mod collector;
pub mod context;
pub mod entity_ref;
pub mod error;
pub mod explain;
pub mod facade;
pub mod filter;
pub mod model;
pub mod ownership;
pub mod resolver;
pub mod store;

#[cfg(test)]
mod testing;

pub use admin::{AdminError, GrantAdmin};
pub use claims::{SubjectClaims, TokenValidationError, validate_claims};
pub use collector::{Candidate, GrantSnapshot, Provenance, collect, load_snapshot};
pub use context::EvalContext;
pub use entity_ref::{EntityRef, ROLE_KIND};
pub use error::AuthzError;
pub use explain::{CandidateOutcome, CandidateReport, Explanation};
pub use facade::{Authorizer, RequestScope};
pub use filter::{Rejection, filter};
pub use model::{
    Ability, AssignedRole, EntityScope, NewAbility, NewAssignment, NewPermission, NewRole,
    Permission, Role,
};
pub use ownership::{OwnerRegistry, OwnerResolver, StaticOwners};
pub use resolver::{Decision, DenyReason, resolve, resolve_decision};
pub use store::{GrantStore, RecordKind, StoreError};
