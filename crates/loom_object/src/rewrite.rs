//! Sharing-preserving graph rewriting.
//!
//! A rewrite walks the ownership edges of a graph (every object item except
//! the `ref` and `type` cross-references) and lets callbacks substitute or
//! delete nodes. Each original node is rewritten once per call; a shared
//! node reached along several paths gets the same replacement everywhere.

use crate::class::Kind;
use crate::ids::{ClassTag, ObjectId};
use crate::item::{Item, ItemId};
use crate::store::Store;
use crate::visit::SHALLOW_SKIP;
use std::collections::HashMap;

type Transform<'f> = Box<dyn FnMut(&mut Store, ObjectId) -> Option<ObjectId> + 'f>;

/// A configured rewrite.
///
/// Callbacks fire only for nodes of the selected class (and kind, if set).
/// Both may return the node itself, a replacement, or `None` to delete it:
/// a deleted array element is removed, a deleted single reference is unset.
/// A `pre` callback that returns anything other than the node itself
/// short-circuits: the result is used as-is and neither the children nor
/// `post` are processed.
///
/// Nodes in frozen arenas are never rewritten; replacements are allocated
/// in the open arena by the callbacks.
pub struct Rewrite<'f> {
    tag: ClassTag,
    kind: Option<Kind>,
    pre: Option<Transform<'f>>,
    post: Option<Transform<'f>>,
    cache: HashMap<ObjectId, Option<ObjectId>>,
}

impl<'f> Rewrite<'f> {
    /// Starts a rewrite whose callbacks apply to objects of `tag`.
    pub fn new(tag: ClassTag) -> Self {
        Self {
            tag,
            kind: None,
            pre: None,
            post: None,
            cache: HashMap::new(),
        }
    }

    /// Restricts callbacks to objects of `kind`.
    pub fn kind(mut self, kind: Kind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Sets the pre-order transform.
    pub fn pre(mut self, f: impl FnMut(&mut Store, ObjectId) -> Option<ObjectId> + 'f) -> Self {
        self.pre = Some(Box::new(f));
        self
    }

    /// Sets the post-order transform.
    pub fn post(mut self, f: impl FnMut(&mut Store, ObjectId) -> Option<ObjectId> + 'f) -> Self {
        self.post = Some(Box::new(f));
        self
    }

    /// Rewrites the graph below `root` and returns the replacement for
    /// `root` itself.
    ///
    /// The call takes a fresh generation, which callbacks read through
    /// [`Store::generation`].
    pub fn run(mut self, store: &mut Store, root: ObjectId) -> Option<ObjectId> {
        store.next_generation();
        self.rewrite(store, root)
    }

    fn matches(&self, store: &Store, id: ObjectId) -> bool {
        let object = store.get(id);
        object.tag() == self.tag && self.kind.map_or(true, |kind| object.kind() == kind)
    }

    fn rewrite(&mut self, store: &mut Store, id: ObjectId) -> Option<ObjectId> {
        if let Some(done) = self.cache.get(&id) {
            return *done;
        }
        if store.is_frozen(id.arena) {
            return Some(id);
        }

        let matches = self.matches(store, id);
        if matches {
            if let Some(pre) = self.pre.as_mut() {
                let result = pre(store, id);
                if result != Some(id) {
                    self.cache.insert(id, result);
                    return result;
                }
            }
        }

        // A back edge reaching a node that is still in progress sees it
        // unchanged.
        self.cache.insert(id, Some(id));

        let children: Vec<(ItemId, Item)> = store
            .get(id)
            .items()
            .filter(|(item, value)| {
                item.bit() & SHALLOW_SKIP == 0 && matches!(value, Item::Object(_) | Item::Array(_))
            })
            .map(|(item, value)| (item, value.clone()))
            .collect();

        for (item, value) in children {
            match value {
                Item::Object(Some(child)) => {
                    let new = self.rewrite(store, child);
                    if new != Some(child) {
                        store.set_object(id, item, new);
                    }
                }
                Item::Array(elements) => {
                    let mut changed = false;
                    let mut kept = Vec::with_capacity(elements.len());
                    for child in elements {
                        match self.rewrite(store, child) {
                            Some(new) => {
                                changed |= new != child;
                                kept.push(new);
                            }
                            None => changed = true,
                        }
                    }
                    if changed {
                        store.replace_array(id, item, kept);
                    }
                }
                _ => {}
            }
        }

        let result = match self.post.as_mut() {
            Some(post) if matches => post(store, id),
            _ => Some(id),
        };
        self.cache.insert(id, result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::tests::{registry, NodeKind, NODE_TAG};

    fn node(store: &mut Store, kind: NodeKind) -> ObjectId {
        store.alloc(NODE_TAG, kind.as_raw())
    }

    fn lit(store: &mut Store, value: i64) -> ObjectId {
        let lit = node(store, NodeKind::Lit);
        store.set_int(lit, ItemId::Ival, value);
        lit
    }

    #[test]
    fn callbacks_see_the_generation_of_their_call() {
        let mut store = Store::new(registry());
        store.open_arena();
        let root = node(&mut store, NodeKind::Unit);
        let before = store.generation();
        let mut seen = Vec::new();
        let mut record = |store: &mut Store, id: ObjectId| {
            seen.push(store.generation());
            Some(id)
        };
        Rewrite::new(NODE_TAG).post(&mut record).run(&mut store, root);
        Rewrite::new(NODE_TAG).post(&mut record).run(&mut store, root);
        assert_eq!(seen, vec![before.next(), before.next().next()]);
    }

    #[test]
    fn shared_replacement_is_substituted_everywhere() {
        let mut store = Store::new(registry());
        store.open_arena();
        let root = node(&mut store, NodeKind::Unit);
        let a = node(&mut store, NodeKind::Decl);
        let b = node(&mut store, NodeKind::Decl);
        let x = lit(&mut store, 1);
        store.push_array(root, ItemId::Decls, a);
        store.push_array(root, ItemId::Decls, b);
        store.set_object(a, ItemId::Value, Some(x));
        store.set_object(b, ItemId::Value, Some(x));

        let mut calls = 0;
        let result = Rewrite::new(NODE_TAG)
            .kind(NodeKind::Lit.as_raw())
            .post(|store, id| {
                calls += 1;
                let value = store.get_int(id, ItemId::Ival);
                Some(lit(store, value + 1))
            })
            .run(&mut store, root);

        assert_eq!(result, Some(root));
        assert_eq!(calls, 1);
        let xa = store.get_object(a, ItemId::Value);
        let xb = store.get_object(b, ItemId::Value);
        assert_ne!(xa, x);
        assert_eq!(xa, xb);
        assert_eq!(store.get_int(xa, ItemId::Ival), 2);
    }

    #[test]
    fn deletion_removes_array_elements_and_unsets_references() {
        let mut store = Store::new(registry());
        store.open_arena();
        let root = node(&mut store, NodeKind::Unit);
        let keep = node(&mut store, NodeKind::Decl);
        let doomed = node(&mut store, NodeKind::Pair);
        let value = lit(&mut store, 0);
        store.push_array(root, ItemId::Decls, keep);
        store.push_array(root, ItemId::Decls, doomed);
        store.set_object(keep, ItemId::Value, Some(value));

        Rewrite::new(NODE_TAG)
            .post(|store, id| match store.kind(id) {
                k if k == NodeKind::Pair.as_raw() || k == NodeKind::Lit.as_raw() => None,
                _ => Some(id),
            })
            .run(&mut store, root);

        assert_eq!(store.get_array(root, ItemId::Decls), &[keep]);
        assert!(!store.has(keep, ItemId::Value));
    }

    #[test]
    fn pre_replacement_skips_children() {
        let mut store = Store::new(registry());
        store.open_arena();
        let root = node(&mut store, NodeKind::Unit);
        let decl = node(&mut store, NodeKind::Decl);
        let inner = lit(&mut store, 5);
        store.push_array(root, ItemId::Decls, decl);
        store.set_object(decl, ItemId::Value, Some(inner));
        let stub = node(&mut store, NodeKind::Decl);

        let mut posts = Vec::new();
        Rewrite::new(NODE_TAG)
            .pre(|store, id| {
                if store.kind(id) == NodeKind::Decl.as_raw() {
                    Some(stub)
                } else {
                    Some(id)
                }
            })
            .post(|_, id| {
                posts.push(id);
                Some(id)
            })
            .run(&mut store, root);

        assert_eq!(store.get_array(root, ItemId::Decls), &[stub]);
        assert_eq!(posts, vec![root]);
    }

    #[test]
    fn frozen_nodes_are_left_alone() {
        let mut store = Store::new(registry());
        let lib = store.open_arena();
        let unit = node(&mut store, NodeKind::Unit);
        let shared = node(&mut store, NodeKind::Decl);
        store.push_array(unit, ItemId::Decls, shared);
        store.open_arena();
        assert!(store.is_frozen(lib));

        let root = node(&mut store, NodeKind::Unit);
        store.push_array(root, ItemId::Decls, shared);
        let result = Rewrite::new(NODE_TAG)
            .kind(NodeKind::Decl.as_raw())
            .post(|_, _| None)
            .run(&mut store, root);

        assert_eq!(result, Some(root));
        assert_eq!(store.get_array(root, ItemId::Decls), &[shared]);
    }

    #[test]
    fn cycles_terminate() {
        let mut store = Store::new(registry());
        store.open_arena();
        let p = node(&mut store, NodeKind::Pair);
        let q = node(&mut store, NodeKind::Pair);
        store.set_object(p, ItemId::Left, Some(q));
        store.set_object(q, ItemId::Left, Some(p));
        let mut seen = 0;
        let result = Rewrite::new(NODE_TAG)
            .post(|_, id| {
                seen += 1;
                Some(id)
            })
            .run(&mut store, p);
        assert_eq!(result, Some(p));
        assert_eq!(seen, 2);
    }
}
