//! Opaque handles for arenas, objects, classes and traversal generations.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident($raw:ty)) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name($raw);

        impl $name {
            /// Creates an ID from its raw value.
            pub const fn from_raw(raw: $raw) -> Self {
                Self(raw)
            }

            /// Returns the raw value.
            pub const fn as_raw(self) -> $raw {
                self.0
            }
        }
    };
}

define_id!(
    /// Identifies an arena within a [`Store`](crate::Store).
    ArenaId(u32)
);

define_id!(
    /// Identifies an object class (tree, type, elaboration node, ...).
    ///
    /// Stored in every object so that an untyped [`ObjectId`] can be checked
    /// before it is downcast to a typed handle.
    ClassTag(u8)
);

define_id!(
    /// Stamp handed out once per traversal call.
    Generation(u32)
);

impl Generation {
    /// Returns the generation following this one.
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for ArenaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}", self.0)
    }
}

/// A non-owning reference to an object: the owning arena plus the object's
/// slot within it.
///
/// Indices are stable for the lifetime of the arena, including across the
/// reachability sweep, which tombstones unreachable objects rather than
/// compacting survivors.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct ObjectId {
    /// The arena that owns the object.
    pub arena: ArenaId,
    /// Slot of the object within its arena.
    pub index: u32,
}

impl ObjectId {
    /// Creates a handle from its parts.
    pub fn new(arena: ArenaId, index: u32) -> Self {
        Self { arena, index }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.arena, self.index)
    }
}
