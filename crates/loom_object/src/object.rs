//! Per-instance item storage.
//!
//! An [`Object`] only materialises the items that have been written. Present
//! items are kept in a dense vector ordered by item bit, so the slot of an
//! item is the number of present bits below it.

use crate::class::Kind;
use crate::ids::{ClassTag, ObjectId};
use crate::item::{Imask, Item, ItemId};
use loom_common::Loc;

/// One node: class tag, kind, source location and its written items.
///
/// Objects are owned by their [`Arena`](crate::Arena) and only reachable
/// through a [`Store`](crate::Store), which checks every item access
/// against the class schema before it gets here.
#[derive(Clone, Debug, PartialEq)]
pub struct Object {
    tag: ClassTag,
    kind: Kind,
    loc: Loc,
    present: Imask,
    items: Vec<Item>,
}

impl Object {
    /// Creates an object with no items written.
    pub fn new(tag: ClassTag, kind: Kind) -> Self {
        Self {
            tag,
            kind,
            loc: Loc::INVALID,
            present: 0,
            items: Vec::new(),
        }
    }

    /// Returns the class tag.
    pub fn tag(&self) -> ClassTag {
        self.tag
    }

    /// Returns the kind.
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Returns the source location.
    pub fn loc(&self) -> &Loc {
        &self.loc
    }

    /// Returns the set of items that have been materialised.
    pub fn present(&self) -> Imask {
        self.present
    }

    fn slot(&self, item: ItemId) -> usize {
        (self.present & (item.bit() - 1)).count_ones() as usize
    }

    /// Returns the stored value of `item`, if it was ever written.
    pub fn item(&self, item: ItemId) -> Option<&Item> {
        if self.present & item.bit() == 0 {
            None
        } else {
            Some(&self.items[self.slot(item)])
        }
    }

    /// Iterates over `(item, value)` pairs in bit order.
    pub fn items(&self) -> impl Iterator<Item = (ItemId, &Item)> {
        ItemId::iter_mask(self.present).zip(self.items.iter())
    }

    /// Iterates over every object reference held, skipping items in `skip`.
    pub fn links(&self, skip: Imask) -> impl Iterator<Item = (ItemId, ObjectId)> + '_ {
        self.items()
            .filter(move |(id, _)| id.bit() & skip == 0)
            .flat_map(|(id, item)| item.links().map(move |o| (id, o)))
    }

    pub(crate) fn set_kind(&mut self, kind: Kind) {
        self.kind = kind;
    }

    pub(crate) fn set_loc(&mut self, loc: Loc) {
        self.loc = loc;
    }

    /// Returns the value of `item`, materialising its unset value first.
    pub(crate) fn item_mut(&mut self, item: ItemId) -> &mut Item {
        let slot = self.slot(item);
        if self.present & item.bit() == 0 {
            self.items.insert(slot, Item::empty(item.storage()));
            self.present |= item.bit();
        }
        &mut self.items[slot]
    }

    /// Drops every materialised item not in `keep`.
    pub(crate) fn retain(&mut self, keep: Imask) {
        if self.present & !keep == 0 {
            return;
        }
        let present = self.present;
        let mut kept = Vec::with_capacity((present & keep).count_ones() as usize);
        for (id, item) in ItemId::iter_mask(present).zip(self.items.drain(..)) {
            if keep & id.bit() != 0 {
                kept.push(item);
            }
        }
        self.items = kept;
        self.present = present & keep;
    }

    /// Rewrites every object reference through `map`.
    pub(crate) fn remap_links(&mut self, mut map: impl FnMut(ObjectId) -> ObjectId) {
        for item in &mut self.items {
            match item {
                Item::Object(Some(o)) => *o = map(*o),
                Item::Array(a) => a.iter_mut().for_each(|o| *o = map(*o)),
                _ => {}
            }
        }
    }

    /// Installs a fully formed item list, used by the codec.
    pub(crate) fn from_parts(tag: ClassTag, kind: Kind, loc: Loc, items: Vec<(ItemId, Item)>) -> Self {
        let mut object = Self::new(tag, kind);
        object.loc = loc;
        for (id, value) in items {
            *object.item_mut(id) = value;
        }
        object
    }
}
