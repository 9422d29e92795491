//! Infrastructure layer: grant storage adapters.

pub mod grant_store;

pub use grant_store::InMemoryGrantStore;
