//! The schema-driven object substrate shared by every node class.
//!
//! An object is a kind tag plus a sparse set of typed items whose presence is
//! governed by a per-class schema ([`ObjectClass`]). Objects live in
//! [`Arena`]s owned by a [`Store`], which is also the allocation context: at
//! most one arena is open for allocation at a time. On top of that sit the
//! generic traversals ([`Visit`], [`Rewrite`], [`DeepCopy`]) and the unit
//! codec ([`write`], [`read`]).

#![warn(missing_docs)]

pub mod arena;
pub mod class;
pub mod codec;
pub mod copy;
pub mod error;
pub mod fatal;
pub mod ids;
pub mod image;
pub mod item;
pub mod object;
pub mod resolve;
pub mod rewrite;
pub mod store;
pub mod trace;
pub mod visit;

pub use arena::Arena;
pub use class::{ClassRegistry, Kind, ObjectClass, UnitKey};
pub use codec::{arena_checksum, read, write, FORMAT_VERSION};
pub use copy::DeepCopy;
pub use error::CodecError;
pub use ids::{ArenaId, ClassTag, Generation, ObjectId};
pub use item::{Imask, Item, ItemId, Storage};
pub use object::Object;
pub use resolve::{DependencyResolver, LoadedOnly};
pub use rewrite::Rewrite;
pub use store::{Store, StoreOptions};
pub use visit::{FnVisitor, Visit, Visitor};
