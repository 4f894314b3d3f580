//! Card instance identification.
//!
//! Every physical card in a match has a unique `EntityId`. Interaction
//! requests list legal choices by id and decision responses select by id, so
//! ids must never collide across the two decks.
//!
//! ```
//! use rust_tcg::core::EntityAllocator;
//!
//! let mut ids = EntityAllocator::new();
//! let a = ids.alloc();
//! let b = ids.alloc();
//! assert_ne!(a, b);
//! ```

use serde::{Deserialize, Serialize};

/// Unique identifier for a card instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl From<u32> for EntityId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Monotonic id source.
///
/// Build both decks of a match from the same allocator.
#[derive(Clone, Debug, Default)]
pub struct EntityAllocator {
    next: u32,
}

impl EntityAllocator {
    /// Allocator starting at id 1.
    #[must_use]
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Hand out the next unused id.
    pub fn alloc(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_is_monotonic() {
        let mut ids = EntityAllocator::new();
        let first = ids.alloc();
        let second = ids.alloc();

        assert_eq!(first, EntityId(1));
        assert_eq!(second, EntityId(2));
        assert!(first < second);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", EntityId(42)), "Entity(42)");
    }

    #[test]
    fn test_serialization() {
        let id = EntityId(123);
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
