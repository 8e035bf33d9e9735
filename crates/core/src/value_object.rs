//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. They are built
/// through a validating constructor, so holding one means its invariants hold:
/// an `Email` is well-formed, a `Nickname` is within its length bounds, etc.
///
/// To "modify" a value object, construct a new one.
///
/// ```ignore
/// let a = Email::parse("Alice@Example.com")?;
/// let b = Email::parse("alice@example.com")?;
/// assert_eq!(a, b);
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
