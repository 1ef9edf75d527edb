//! The elaboration-node class: the flattened design hierarchy produced by
//! elaboration, with its scopes, processes, signals and the nexus graph
//! connecting drivers to the signals they drive.

use crate::handle::define_handle;
use crate::tree::Tree;
use crate::ty::Type;
use crate::E_NODE_TAG;
use loom_common::Ident;
use loom_object::{define_kinds, ItemId, Kind, ObjectClass, ObjectId, Store};

define_kinds! {
    /// Every kind of elaboration node.
    #[allow(missing_docs)]
    pub enum ENodeKind {
        Root = "E_ROOT" [Ident | Scopes | Nexus],
        Scope = "E_SCOPE" [Ident | Path | Scopes | Procs | Signals | Parent | Deps],
        Process = "E_PROCESS" [Ident | Path | Nexus | Parent],
        Signal = "E_SIGNAL" [Ident | Path | Type | Nexus | Pos | Flags],
        Nexus = "E_NEXUS" [Ident | Pos | Width | Signals | Sources | Outputs | Flags],
        Port = "E_PORT" [Pos | Width | Nexus | Flags | Value],
        Implicit = "E_IMPLICIT" [Ident | Path | Type | Nexus | Pos | Flags | Value],
    }
}

const E_NODE_RETAGS: &[(Kind, Kind)] = &[(ENodeKind::Signal.as_raw(), ENodeKind::Implicit.as_raw())];

const E_NODE_ROOTS: &[Kind] = &[ENodeKind::Root.as_raw()];

/// The elaboration-node class description.
pub static E_NODE_CLASS: ObjectClass = ObjectClass {
    name: "e_node",
    tag: E_NODE_TAG,
    has_map: ENodeKind::HAS_MAP,
    kind_names: ENodeKind::NAMES,
    change_allowed: E_NODE_RETAGS,
    gc_roots: E_NODE_ROOTS,
    optional: ItemId::Parent.bit() | ItemId::Value.bit(),
    unit_keys: &[],
};

define_handle!(
    /// A node of the elaborated hierarchy.
    ENode(ENodeKind, E_NODE_TAG)
);

macro_rules! enode_array {
    ($(#[$meta:meta])* $item:ident: $count:ident, $nth:ident, $iter:ident, $add:ident) => {
        $(#[$meta])*
        pub fn $count(self, store: &Store) -> usize {
            store.array_len(self.0, ItemId::$item)
        }

        #[doc = concat!("Returns element `n` of `", stringify!($item), "`.")]
        pub fn $nth(self, store: &Store, n: usize) -> ENode {
            ENode(store.array_nth(self.0, ItemId::$item, n))
        }

        #[doc = concat!("Iterates over `", stringify!($item), "` in order.")]
        pub fn $iter<'s>(self, store: &'s Store) -> impl Iterator<Item = ENode> + 's {
            store.get_array(self.0, ItemId::$item).iter().map(|&id| ENode(id))
        }

        #[doc = concat!("Appends to `", stringify!($item), "`.")]
        pub fn $add(self, store: &mut Store, node: ENode) {
            store.push_array(self.0, ItemId::$item, node.0);
        }
    };
}

impl ENode {
    /// Returns the instance name.
    pub fn ident(self, store: &Store) -> Ident {
        store.get_ident(self.0, ItemId::Ident)
    }

    /// Sets the instance name.
    pub fn set_ident(self, store: &mut Store, ident: Ident) {
        store.set_ident(self.0, ItemId::Ident, ident);
    }

    /// Returns the full hierarchical path.
    pub fn path(self, store: &Store) -> Ident {
        store.get_ident(self.0, ItemId::Path)
    }

    /// Sets the full hierarchical path.
    pub fn set_path(self, store: &mut Store, path: Ident) {
        store.set_ident(self.0, ItemId::Path, path);
    }

    enode_array!(
        /// Returns the number of child scopes.
        Scopes: scope_count, scope, scopes, add_scope
    );
    enode_array!(
        /// Returns the number of processes.
        Procs: proc_count, proc, procs, add_proc
    );
    enode_array!(
        /// Returns the number of signals.
        Signals: signal_count, signal, signals, add_signal
    );
    enode_array!(
        /// Returns the number of nexus nodes.
        Nexus: nexus_count, nexus, nexuses, add_nexus
    );
    enode_array!(
        /// Returns the number of driving sources of a nexus.
        Sources: source_count, source, sources, add_source
    );
    enode_array!(
        /// Returns the number of outputs of a nexus.
        Outputs: output_count, output, outputs, add_output
    );

    /// Returns the width in scalar sub-elements.
    pub fn width(self, store: &Store) -> u32 {
        let raw = store.get_int(self.0, ItemId::Width);
        match u32::try_from(raw) {
            Ok(width) => width,
            Err(_) => store.fail(format_args!("e_node {} has invalid width {raw}", self.0)),
        }
    }

    /// Sets the width.
    pub fn set_width(self, store: &mut Store, width: u32) {
        store.set_int(self.0, ItemId::Width, i64::from(width));
    }

    /// Returns the offset within the enclosing signal or nexus.
    pub fn pos(self, store: &Store) -> u32 {
        let raw = store.get_int(self.0, ItemId::Pos);
        match u32::try_from(raw) {
            Ok(pos) => pos,
            Err(_) => store.fail(format_args!("e_node {} has invalid position {raw}", self.0)),
        }
    }

    /// Sets the offset.
    pub fn set_pos(self, store: &mut Store, pos: u32) {
        store.set_int(self.0, ItemId::Pos, i64::from(pos));
    }

    /// Returns the flag bits, zero if never set.
    pub fn flags(self, store: &Store) -> i64 {
        store.get_int(self.0, ItemId::Flags)
    }

    /// Sets every bit of `mask`.
    pub fn set_flag(self, store: &mut Store, mask: i64) {
        let bits = self.flags(store) | mask;
        store.set_int(self.0, ItemId::Flags, bits);
    }

    /// Clears every bit of `mask`.
    pub fn clear_flag(self, store: &mut Store, mask: i64) {
        let bits = self.flags(store) & !mask;
        store.set_int(self.0, ItemId::Flags, bits);
    }

    /// Returns the type of a signal.
    pub fn ty(self, store: &Store) -> Type {
        Type(store.get_object(self.0, ItemId::Type))
    }

    /// Sets the type of a signal.
    pub fn set_type(self, store: &mut Store, ty: Type) {
        store.set_object(self.0, ItemId::Type, Some(ty.id()));
    }

    /// Returns the tree attached to a port or implicit signal.
    pub fn value(self, store: &Store) -> Tree {
        Tree(store.get_object(self.0, ItemId::Value))
    }

    /// Returns `true` if a tree is attached.
    pub fn has_value(self, store: &Store) -> bool {
        store.has(self.0, ItemId::Value)
    }

    /// Attaches or detaches a tree.
    pub fn set_value(self, store: &mut Store, value: Option<Tree>) {
        store.set_object(self.0, ItemId::Value, value.map(Tree::id));
    }

    /// Returns the enclosing scope.
    pub fn parent(self, store: &Store) -> ENode {
        ENode(store.get_object(self.0, ItemId::Parent))
    }

    /// Returns `true` unless this is a top-level node.
    pub fn has_parent(self, store: &Store) -> bool {
        store.has(self.0, ItemId::Parent)
    }

    /// Sets the enclosing scope.
    pub fn set_parent(self, store: &mut Store, parent: ENode) {
        store.set_object(self.0, ItemId::Parent, Some(parent.0));
    }

    /// Returns the number of design units a scope depends on.
    pub fn dep_count(self, store: &Store) -> usize {
        store.array_len(self.0, ItemId::Deps)
    }

    /// Iterates over the design units a scope depends on.
    pub fn deps<'s>(self, store: &'s Store) -> impl Iterator<Item = Tree> + 's {
        store.get_array(self.0, ItemId::Deps).iter().map(|&id| Tree(id))
    }

    /// Records a design unit the scope depends on.
    pub fn add_dep(self, store: &mut Store, unit: Tree) {
        store.push_array(self.0, ItemId::Deps, unit.id());
    }

    /// Calls `f` on every elaboration node reachable from this one in
    /// postorder and returns the number of calls.
    pub fn visit(self, store: &Store, mut f: impl FnMut(&Store, ENode)) -> usize {
        loom_object::Visit::new(store)
            .only(E_NODE_TAG, None)
            .run(self.0, &mut |s: &Store, id: ObjectId| f(s, ENode(id)))
    }
}
