//! Read-only postorder traversal.

use crate::class::Kind;
use crate::ids::{ClassTag, Generation, ObjectId};
use crate::item::{Imask, ItemId};
use crate::store::Store;
use std::collections::HashSet;

/// Items a shallow visit does not follow: cross-references to declarations
/// and to the type class.
pub const SHALLOW_SKIP: Imask = ItemId::Ref.bit() | ItemId::Type.bit();

/// Callbacks invoked by [`Visit::run`].
pub trait Visitor {
    /// Called before the children of a matching node. Returning `false`
    /// skips the node's subgraph and its [`post`](Self::post) call.
    fn pre(&mut self, _store: &Store, _id: ObjectId) -> bool {
        true
    }

    /// Called after the children of a matching node.
    fn post(&mut self, store: &Store, id: ObjectId);
}

impl<F> Visitor for F
where
    F: FnMut(&Store, ObjectId),
{
    fn post(&mut self, store: &Store, id: ObjectId) {
        self(store, id)
    }
}

/// A [`Visitor`] built from a pre-order predicate and a post-order callback.
pub struct FnVisitor<P, Q> {
    /// Decides whether to descend into a matching node.
    pub pre: P,
    /// Invoked on each matching node after its children.
    pub post: Q,
}

impl<P, Q> Visitor for FnVisitor<P, Q>
where
    P: FnMut(&Store, ObjectId) -> bool,
    Q: FnMut(&Store, ObjectId),
{
    fn pre(&mut self, store: &Store, id: ObjectId) -> bool {
        (self.pre)(store, id)
    }

    fn post(&mut self, store: &Store, id: ObjectId) {
        (self.post)(store, id)
    }
}

enum Step {
    Enter(ObjectId),
    Exit(ObjectId, bool),
}

/// A configured visit. Every node reachable from the root is traversed at
/// most once per call, but callbacks only fire for nodes of the selected
/// class and kind.
///
/// ```ignore
/// let decls = Visit::new(&store).only(TREE, Some(SIGNAL_DECL)).run(root, &mut |_, _| {});
/// ```
pub struct Visit<'s> {
    store: &'s Store,
    tag: Option<ClassTag>,
    kind: Option<Kind>,
    skip: Imask,
    generation: Generation,
}

impl<'s> Visit<'s> {
    /// Starts a shallow visit matching every kind of the root's class.
    pub fn new(store: &'s Store) -> Self {
        Self {
            store,
            tag: None,
            kind: None,
            skip: SHALLOW_SKIP,
            generation: store.next_generation(),
        }
    }

    /// Restricts callbacks to objects of `tag`, and of `kind` if given.
    pub fn only(mut self, tag: ClassTag, kind: Option<Kind>) -> Self {
        self.tag = Some(tag);
        self.kind = kind;
        self
    }

    /// Follows every object item, including `ref` and `type`.
    pub fn deep(mut self) -> Self {
        self.skip = 0;
        self
    }

    /// Returns the generation stamp of this visit. It is only an identity
    /// for the call.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Walks the graph from `root` and returns the number of matching nodes
    /// passed to [`Visitor::post`].
    pub fn run(self, root: ObjectId, visitor: &mut impl Visitor) -> usize {
        let store = self.store;
        let tag = self.tag.unwrap_or_else(|| store.tag(root));
        let mut seen = HashSet::new();
        let mut stack = vec![Step::Enter(root)];
        let mut count = 0;

        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(id) => {
                    if !seen.insert(id) {
                        continue;
                    }
                    let object = store.get(id);
                    let matches = object.tag() == tag
                        && self.kind.map_or(true, |kind| object.kind() == kind);
                    if matches && !visitor.pre(store, id) {
                        continue;
                    }
                    stack.push(Step::Exit(id, matches));
                    let children: Vec<ObjectId> = object
                        .links(self.skip)
                        .map(|(_, link)| link)
                        .filter(|link| !seen.contains(link))
                        .collect();
                    stack.extend(children.into_iter().rev().map(Step::Enter));
                }
                Step::Exit(id, matches) => {
                    if matches {
                        visitor.post(store, id);
                        count += 1;
                    }
                }
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::tests::{registry, NodeKind, ShapeKind, NODE_TAG, SHAPE_TAG};

    struct Graph {
        store: Store,
        root: ObjectId,
        a: ObjectId,
        b: ObjectId,
        x: ObjectId,
        shape: ObjectId,
    }

    // root -> (a, b), a.value = x, b.value = x, a.type = shape
    fn shared_graph() -> Graph {
        let mut store = Store::new(registry());
        store.open_arena();
        let node = |store: &mut Store, kind: NodeKind| store.alloc(NODE_TAG, kind.as_raw());
        let root = node(&mut store, NodeKind::Unit);
        let a = node(&mut store, NodeKind::Decl);
        let b = node(&mut store, NodeKind::Decl);
        let x = node(&mut store, NodeKind::Lit);
        let shape = store.alloc(SHAPE_TAG, ShapeKind::Scalar.as_raw());
        store.push_array(root, ItemId::Decls, a);
        store.push_array(root, ItemId::Decls, b);
        store.set_object(a, ItemId::Value, Some(x));
        store.set_object(b, ItemId::Value, Some(x));
        store.set_object(a, ItemId::Type, Some(shape));
        Graph {
            store,
            root,
            a,
            b,
            x,
            shape,
        }
    }

    #[test]
    fn shared_node_visited_once_in_postorder() {
        let g = shared_graph();
        let mut order = Vec::new();
        let count = Visit::new(&g.store).run(g.root, &mut |_: &Store, id: ObjectId| order.push(id));
        assert_eq!(count, 4);
        assert_eq!(order, vec![g.x, g.a, g.b, g.root]);
    }

    #[test]
    fn kind_filter_limits_callbacks() {
        let g = shared_graph();
        let mut seen = Vec::new();
        let count = Visit::new(&g.store)
            .only(NODE_TAG, Some(NodeKind::Decl.as_raw()))
            .run(g.root, &mut |_: &Store, id: ObjectId| seen.push(id));
        assert_eq!(count, 2);
        assert_eq!(seen, vec![g.a, g.b]);
    }

    #[test]
    fn deep_visit_follows_type_links() {
        let g = shared_graph();
        let shallow = Visit::new(&g.store)
            .only(SHAPE_TAG, None)
            .run(g.root, &mut |_: &Store, _: ObjectId| {});
        let deep = Visit::new(&g.store)
            .only(SHAPE_TAG, None)
            .deep()
            .run(g.root, &mut |_: &Store, _: ObjectId| {});
        assert_eq!(shallow, 0);
        assert_eq!(deep, 1);
        let _ = g.shape;
    }

    #[test]
    fn pre_can_prune() {
        let g = shared_graph();
        let a = g.a;
        let mut visited = Vec::new();
        let count = Visit::new(&g.store).run(
            g.root,
            &mut FnVisitor {
                pre: |_: &Store, id: ObjectId| id != a,
                post: |_: &Store, id: ObjectId| visited.push(id),
            },
        );
        // x is still reached through b.
        assert_eq!(count, 3);
        assert_eq!(visited, vec![g.x, g.b, g.root]);
    }

    #[test]
    fn cycles_terminate() {
        let mut store = Store::new(registry());
        store.open_arena();
        let p = store.alloc(NODE_TAG, NodeKind::Pair.as_raw());
        let q = store.alloc(NODE_TAG, NodeKind::Pair.as_raw());
        store.set_object(p, ItemId::Left, Some(q));
        store.set_object(q, ItemId::Left, Some(p));
        let count = Visit::new(&store).run(p, &mut |_: &Store, _: ObjectId| {});
        assert_eq!(count, 2);
    }

    #[test]
    fn each_visit_gets_a_generation() {
        let g = shared_graph();
        let first = Visit::new(&g.store);
        let second = Visit::new(&g.store);
        assert!(second.generation() > first.generation());
    }
}
