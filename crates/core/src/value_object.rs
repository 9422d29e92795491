//! Values compared by content.

/// Marker for immutable values with no identity of their own.
///
/// Two polymorphic references `("Invoice", 42)` built independently are the
/// same reference.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
