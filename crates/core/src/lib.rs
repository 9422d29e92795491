//! `gatehouse-core`: identifiers, record traits, and the record error type
//! shared by every other crate. No I/O.

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AbilityId, AssignmentId, PermissionId, RoleId, ScopeId};
pub use value_object::ValueObject;
