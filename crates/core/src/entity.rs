//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Persistence adapters key documents by `Entity::id`, so every stored
/// resource (user, tool, order, review) implements it.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
