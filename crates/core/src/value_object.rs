//! Value object trait: equality by value, not identity.
//!
//! Value objects are defined entirely by their attribute values. Line
//! signatures, percentages and stock keys are value objects: two instances with
//! the same fields are interchangeable.

/// Marker trait for value objects.
///
/// - **Clone**: value objects are cheap to copy
/// - **PartialEq**: compared by attribute values
/// - **Debug**: debuggable in logs and test failures
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Percent(u32);
///
/// impl ValueObject for Percent {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
