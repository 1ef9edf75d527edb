//! Predicate-driven deep copy.
//!
//! Copying happens in four passes over the graph reachable from the roots:
//!
//! 1. discover every reachable node, following all object items;
//! 2. mark the nodes the per-class predicates ask to clone;
//! 3. mark every node that can reach a marked node, since it must be
//!    cloned too for the clone to be reachable from the new roots;
//! 4. clone the marked nodes into the open arena and redirect their
//!    references to the clones.
//!
//! Each original is cloned at most once, so sharing among cloned nodes is
//! preserved. Unmarked nodes are shared with the original graph.

use crate::ids::{ClassTag, ObjectId};
use crate::store::Store;
use std::collections::HashMap;

type Predicate<'f> = Box<dyn FnMut(&Store, ObjectId) -> bool + 'f>;
type Callback<'f> = Box<dyn FnMut(&mut Store, ObjectId, ObjectId) + 'f>;

/// A configured deep copy.
#[derive(Default)]
pub struct DeepCopy<'f> {
    predicates: Vec<(ClassTag, Predicate<'f>)>,
    callbacks: Vec<(ClassTag, Callback<'f>)>,
}

impl<'f> DeepCopy<'f> {
    /// Creates a copy that clones nothing until predicates are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clones objects of class `tag` for which `f` returns `true`.
    pub fn clone_if(mut self, tag: ClassTag, f: impl FnMut(&Store, ObjectId) -> bool + 'f) -> Self {
        self.predicates.push((tag, Box::new(f)));
        self
    }

    /// Calls `f(original, clone)` for every cloned object of class `tag`,
    /// after all references have been redirected.
    pub fn on_copy(mut self, tag: ClassTag, f: impl FnMut(&mut Store, ObjectId, ObjectId) + 'f) -> Self {
        self.callbacks.push((tag, Box::new(f)));
        self
    }

    /// Copies the graph below `root` and returns the new root, or `root`
    /// itself if nothing below it needed cloning.
    pub fn run(self, store: &mut Store, root: ObjectId) -> ObjectId {
        self.run_many(store, &[root])[0]
    }

    /// Copies the graph below several roots at once, so that nodes shared
    /// between them are cloned only once.
    ///
    /// The call takes a fresh generation, which predicates and callbacks read
    /// through [`Store::generation`].
    pub fn run_many(mut self, store: &mut Store, roots: &[ObjectId]) -> Vec<ObjectId> {
        store.next_generation();

        // Discovery, recording reverse edges.
        let mut order: Vec<ObjectId> = Vec::new();
        let mut index: HashMap<ObjectId, usize> = HashMap::new();
        let mut parents: Vec<Vec<usize>> = Vec::new();
        let mut pending: Vec<(ObjectId, Option<usize>)> =
            roots.iter().rev().map(|root| (*root, None)).collect();
        while let Some((id, parent)) = pending.pop() {
            let slot = match index.get(&id) {
                Some(slot) => *slot,
                None => {
                    let slot = order.len();
                    index.insert(id, slot);
                    order.push(id);
                    parents.push(Vec::new());
                    let links: Vec<ObjectId> = store.get(id).links(0).map(|(_, l)| l).collect();
                    pending.extend(links.into_iter().rev().map(|l| (l, Some(slot))));
                    slot
                }
            };
            if let Some(parent) = parent {
                parents[slot].push(parent);
            }
        }

        // Marking.
        let view: &Store = store;
        let mut marked = vec![false; order.len()];
        for (slot, id) in order.iter().enumerate() {
            let tag = view.tag(*id);
            marked[slot] = self
                .predicates
                .iter_mut()
                .any(|(t, predicate)| *t == tag && predicate(view, *id));
        }

        // Propagation to ancestors.
        let mut worklist: Vec<usize> = (0..order.len()).filter(|s| marked[*s]).collect();
        while let Some(slot) = worklist.pop() {
            for parent in &parents[slot] {
                if !marked[*parent] {
                    marked[*parent] = true;
                    worklist.push(*parent);
                }
            }
        }

        // Cloning.
        let mut clones: HashMap<ObjectId, ObjectId> = HashMap::new();
        let mut copied: Vec<(ObjectId, ObjectId)> = Vec::new();
        for (slot, id) in order.iter().enumerate() {
            if marked[slot] {
                let object = store.get(*id).clone();
                let clone = store.alloc_object(object);
                clones.insert(*id, clone);
                copied.push((*id, clone));
            }
        }
        for (_, clone) in &copied {
            store.relink(*clone, |link| clones.get(&link).copied().unwrap_or(link));
        }

        for (original, clone) in &copied {
            let tag = store.tag(*clone);
            for (t, callback) in self.callbacks.iter_mut() {
                if *t == tag {
                    callback(store, *original, *clone);
                }
            }
        }

        roots
            .iter()
            .map(|root| clones.get(root).copied().unwrap_or(*root))
            .collect()
    }
}
