//! The typed handle shared by every class façade.

/// Defines a `Copy` handle wrapping an [`ObjectId`](loom_object::ObjectId) of
/// one class, with the class-independent operations every façade offers.
macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident($kind:ty, $tag:expr)) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
        pub struct $name(pub(crate) loom_object::ObjectId);

        impl $name {
            /// Allocates a new object of `kind` in the open arena.
            pub fn new(store: &mut loom_object::Store, kind: $kind) -> Self {
                Self(store.alloc($tag, kind.as_raw()))
            }

            /// Wraps `id` if the object it names belongs to this class.
            pub fn from_id(store: &loom_object::Store, id: loom_object::ObjectId) -> Option<Self> {
                (store.tag(id) == $tag).then_some(Self(id))
            }

            /// Returns the untyped handle.
            pub fn id(self) -> loom_object::ObjectId {
                self.0
            }

            /// Returns the arena that owns the object.
            pub fn arena(self) -> loom_object::ArenaId {
                self.0.arena
            }

            /// Returns the current kind.
            pub fn kind(self, store: &loom_object::Store) -> $kind {
                let raw = store.kind(self.0);
                match <$kind>::from_raw(raw) {
                    Some(kind) => kind,
                    None => store.fail(format_args!("object {} has unknown kind {raw}", self.0)),
                }
            }

            /// Retags the object in place along a declared retag edge.
            pub fn change_kind(self, store: &mut loom_object::Store, kind: $kind) {
                store.change_kind(self.0, kind.as_raw());
            }

            /// Returns the source location.
            pub fn loc(self, store: &loom_object::Store) -> loom_common::Loc {
                store.loc(self.0)
            }

            /// Sets the source location.
            pub fn set_loc(self, store: &mut loom_object::Store, loc: loom_common::Loc) {
                store.set_loc(self.0, loc);
            }
        }

        impl From<$name> for loom_object::ObjectId {
            fn from(handle: $name) -> Self {
                handle.0
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

pub(crate) use define_handle;
