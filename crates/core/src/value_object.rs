//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**: two `Price`s of
/// 2500 minor units are the same price, two `Email`s with the same address are
/// the same key. To "modify" one, construct a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
