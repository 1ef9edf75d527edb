//! Arenas: batches of objects sharing one open/frozen lifecycle.
//!
//! Objects are always appended, so an [`ObjectId`](crate::ObjectId) stays
//! valid for the lifetime of its arena. The reachability sweep replaces
//! unreachable objects with tombstones instead of moving survivors. Once an
//! arena is frozen its survivors are numbered with dense *ordinals*, which
//! is how other units refer to them on disk.

use crate::ids::ArenaId;
use crate::object::Object;
use loom_common::ContentHash;
use std::cell::OnceCell;
use std::collections::BTreeSet;

/// A region owning a batch of objects, typically one compilation unit.
#[derive(Debug)]
pub struct Arena {
    id: ArenaId,
    key: Option<String>,
    objects: Vec<Option<Object>>,
    frozen: bool,
    deps: BTreeSet<ArenaId>,
    ordinals: Vec<u32>,
    by_ordinal: Vec<u32>,
    root: Option<u32>,
    checksum: OnceCell<ContentHash>,
}

const NO_ORDINAL: u32 = u32::MAX;

impl Arena {
    /// Creates an empty, open arena with room for `capacity` objects.
    pub(crate) fn new(id: ArenaId, capacity: usize) -> Self {
        Self {
            id,
            key: None,
            objects: Vec::with_capacity(capacity),
            frozen: false,
            deps: BTreeSet::new(),
            ordinals: Vec::new(),
            by_ordinal: Vec::new(),
            root: None,
            checksum: OnceCell::new(),
        }
    }

    /// Returns this arena's ID.
    pub fn id(&self) -> ArenaId {
        self.id
    }

    /// Returns the unit key assigned when the arena was frozen or loaded.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Returns `true` once the arena is immutable.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Returns the number of slots, including reclaimed ones.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if nothing was ever allocated here.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Returns the number of objects that have not been reclaimed.
    pub fn live_count(&self) -> usize {
        self.objects.iter().filter(|o| o.is_some()).count()
    }

    /// Returns the object in `index`, or `None` if it was reclaimed or never existed.
    pub fn get(&self, index: u32) -> Option<&Object> {
        self.objects.get(index as usize).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, index: u32) -> Option<&mut Object> {
        self.objects.get_mut(index as usize).and_then(Option::as_mut)
    }

    /// Iterates over `(index, object)` for live objects in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Object)> {
        self.objects
            .iter()
            .enumerate()
            .filter_map(|(i, o)| o.as_ref().map(|o| (i as u32, o)))
    }

    /// Returns the arenas this one holds references into.
    pub fn deps(&self) -> impl Iterator<Item = ArenaId> + '_ {
        self.deps.iter().copied()
    }

    /// Returns the index of the designated root object.
    pub fn root(&self) -> Option<u32> {
        self.root
    }

    /// Returns the ordinal of the live object in `index`. Only frozen arenas
    /// have ordinals.
    pub fn ordinal(&self, index: u32) -> Option<u32> {
        self.ordinals
            .get(index as usize)
            .copied()
            .filter(|o| *o != NO_ORDINAL)
    }

    /// Returns the index of the object with `ordinal`.
    pub fn index_of_ordinal(&self, ordinal: u32) -> Option<u32> {
        self.by_ordinal.get(ordinal as usize).copied()
    }

    pub(crate) fn push(&mut self, object: Object) -> u32 {
        let index = u32::try_from(self.objects.len())
            .unwrap_or_else(|_| panic!("arena {} exceeded {} objects", self.id, u32::MAX));
        self.objects.push(Some(object));
        index
    }

    pub(crate) fn add_dep(&mut self, dep: ArenaId) {
        if dep != self.id {
            self.deps.insert(dep);
        }
    }

    pub(crate) fn set_deps(&mut self, deps: BTreeSet<ArenaId>) {
        self.deps = deps;
    }

    /// Tombstones every object whose slot is `false` in `live`. Returns the
    /// number reclaimed.
    pub(crate) fn reclaim(&mut self, live: &[bool]) -> usize {
        let mut reclaimed = 0;
        for (slot, keep) in self.objects.iter_mut().zip(live) {
            if !keep && slot.take().is_some() {
                reclaimed += 1;
            }
        }
        reclaimed
    }

    /// Makes the arena immutable, numbering survivors and recording its key
    /// and root.
    pub(crate) fn seal(&mut self, key: String, root: Option<u32>) {
        self.ordinals = vec![NO_ORDINAL; self.objects.len()];
        self.by_ordinal.clear();
        for (index, object) in self.objects.iter().enumerate() {
            if object.is_some() {
                self.ordinals[index] = self.by_ordinal.len() as u32;
                self.by_ordinal.push(index as u32);
            }
        }
        self.key = Some(key);
        self.root = root;
        self.frozen = true;
    }

    pub(crate) fn rekey(&mut self, key: String) {
        debug_assert!(self.frozen && self.checksum.get().is_none());
        self.key = Some(key);
    }

    pub(crate) fn checksum_cell(&self) -> &OnceCell<ContentHash> {
        &self.checksum
    }
}
