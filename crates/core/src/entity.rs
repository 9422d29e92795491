//! Records with a stable identity.

/// A stored record that can be addressed by id and appear in a polymorphic
/// `(kind, id)` reference.
pub trait Entity {
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Kind name used when this record is a subject or target (`"Role"`, `"User"`).
    fn kind() -> &'static str;
}
