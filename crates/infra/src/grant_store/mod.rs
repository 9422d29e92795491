//! Grant store adapters.
//!
//! Every adapter implements both sides of the storage boundary:
//! `GrantStore` (reads consumed by the decision engine) and `GrantAdmin`
//! (validated admin writes).

pub mod in_memory;

pub use in_memory::InMemoryGrantStore;
