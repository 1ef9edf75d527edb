//! The typed façade over the object substrate for a VHDL front end.
//!
//! Three classes share one [`Store`]: syntax [`Tree`]s, [`Type`]s and
//! elaboration nodes ([`ENode`]). Each class is a static schema table plus a
//! `Copy` handle with strongly named accessors. Units are persisted to and
//! loaded from disk through the [`Library`].

#![warn(missing_docs)]

mod handle;

pub mod enode;
pub mod library;
pub mod tree;
pub mod tree_kind;
pub mod ty;

pub use enode::{ENode, ENodeKind, E_NODE_CLASS};
pub use library::Library;
pub use tree::Tree;
pub use tree_kind::{AssocKind, EntityClass, LiteralKind, ParamKind, PortMode, RangeKind, TreeFlags, TreeKind, TREE_CLASS};
pub use ty::{Type, TypeKind, TYPE_CLASS};

use loom_config::LoomConfig;
use loom_object::{ClassRegistry, ClassTag, ObjectClass, Store};

/// Tag of the tree class.
pub const TREE_TAG: ClassTag = ClassTag::from_raw(0);
/// Tag of the type class.
pub const TYPE_TAG: ClassTag = ClassTag::from_raw(1);
/// Tag of the elaboration-node class.
pub const E_NODE_TAG: ClassTag = ClassTag::from_raw(2);

static CLASSES: [&ObjectClass; 3] = [&TREE_CLASS, &TYPE_CLASS, &E_NODE_CLASS];

/// Returns the registry of the tree, type and elaboration-node classes.
pub fn classes() -> ClassRegistry {
    ClassRegistry::new(&CLASSES)
}

/// Creates a store for the three classes with default options.
pub fn new_store() -> Store {
    Store::new(classes())
}

/// Creates a store for the three classes configured from `loom.toml`.
pub fn new_store_with_config(config: &LoomConfig) -> Store {
    Store::with_config(classes(), config)
}
