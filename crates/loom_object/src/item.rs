//! The item catalogue: every slot any object class may carry.
//!
//! All classes share one namespace of at most 64 item ids so that a kind's
//! schema fits in a single [`Imask`]. Each id has a fixed [`Storage`] kind.

use crate::ids::ObjectId;
use loom_common::Ident;

/// A set of [`ItemId`]s, one bit per id.
pub type Imask = u64;

/// How an item's value is stored.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Storage {
    /// An interned identifier.
    Ident,
    /// A signed integer (also used for enumerations and flag sets).
    Int,
    /// A double-precision float.
    Double,
    /// A single object reference.
    Object,
    /// An ordered array of object references owned by the item.
    Array,
}

macro_rules! define_items {
    ($( $(#[$meta:meta])* $variant:ident = $text:literal, $storage:ident; )*) => {
        /// Identifies one item slot.
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
        #[repr(u8)]
        pub enum ItemId {
            $( $(#[$meta])* $variant, )*
        }

        impl ItemId {
            /// Every item id in bit order.
            pub const ALL: &'static [ItemId] = &[$(ItemId::$variant),*];

            /// Returns the display name, e.g. `I_IDENT`.
            pub fn name(self) -> &'static str {
                match self {
                    $( ItemId::$variant => $text, )*
                }
            }

            /// Returns how values of this item are stored.
            pub fn storage(self) -> Storage {
                match self {
                    $( ItemId::$variant => Storage::$storage, )*
                }
            }
        }
    };
}

define_items! {
    /// Primary name.
    Ident = "I_IDENT", Ident;
    /// Secondary name (entity of an architecture, label, library).
    Ident2 = "I_IDENT2", Ident;
    /// Port declarations.
    Ports = "I_PORTS", Array;
    /// Generic declarations.
    Generics = "I_GENERICS", Array;
    /// Context clause items.
    Context = "I_CONTEXT", Array;
    /// Declarations.
    Decls = "I_DECLS", Array;
    /// Statements.
    Stmts = "I_STMTS", Array;
    /// The primary unit of a secondary unit.
    Primary = "I_PRIMARY", Object;
    /// A value expression.
    Value = "I_VALUE", Object;
    /// The type of a declaration or expression.
    Type = "I_TYPE", Object;
    /// Kind-specific sub-classification.
    Subkind = "I_SUBKIND", Int;
    /// Entity class (signal, variable, constant, ...).
    Class = "I_CLASS", Int;
    /// Flag bits.
    Flags = "I_FLAGS", Int;
    /// Call or map parameters.
    Params = "I_PARAMS", Array;
    /// The declaration a name resolves to.
    Ref = "I_REF", Object;
    /// Integer literal value.
    Ival = "I_IVAL", Int;
    /// Real literal value.
    Dval = "I_DVAL", Double;
    /// Characters of a string literal.
    Chars = "I_CHARS", Array;
    /// Delay expression.
    Delay = "I_DELAY", Object;
    /// Sensitivity list.
    Triggers = "I_TRIGGERS", Array;
    /// Assignment target.
    Target = "I_TARGET", Object;
    /// Waveform elements.
    Waves = "I_WAVES", Array;
    /// Reject limit of an inertial delay.
    Reject = "I_REJECT", Object;
    /// Position within a parent list.
    Pos = "I_POS", Int;
    /// Severity expression.
    Severity = "I_SEVERITY", Object;
    /// Report message expression.
    Message = "I_MESSAGE", Object;
    /// Ranges.
    Ranges = "I_RANGES", Array;
    /// Generic map associations.
    Genmaps = "I_GENMAPS", Array;
    /// Else branch statements.
    Elses = "I_ELSES", Array;
    /// Conditional waveforms.
    Conds = "I_CONDS", Array;
    /// Guard signal reference.
    Guard = "I_GUARD", Object;
    /// Name expression.
    Name = "I_NAME", Object;
    /// File open mode expression.
    FileMode = "I_FILE_MODE", Object;
    /// Associations.
    Assocs = "I_ASSOCS", Array;
    /// Configuration specification.
    Spec = "I_SPEC", Object;
    /// Left bound.
    Left = "I_LEFT", Object;
    /// Right bound.
    Right = "I_RIGHT", Object;
    /// Elaboration-node link.
    Eopt = "I_EOPT", Object;
    /// Index or range constraints of a type.
    Dims = "I_DIMS", Array;
    /// Element type.
    Elem = "I_ELEM", Object;
    /// Base type of a subtype.
    Base = "I_BASE", Object;
    /// Resolution function name.
    Resolution = "I_RESOLUTION", Object;
    /// Enumeration literals.
    Literals = "I_LITERALS", Array;
    /// Record fields.
    Fields = "I_FIELDS", Array;
    /// Physical units.
    Units = "I_UNITS", Array;
    /// Parameter types of a subprogram type.
    Ptypes = "I_PTYPES", Array;
    /// Result type of a function type.
    Result = "I_RESULT", Object;
    /// Index subtypes of an unconstrained array.
    IndexCon = "I_INDEXCON", Array;
    /// Designated type of an access or file type.
    Designated = "I_DESIGNATED", Object;
    /// Hierarchical path name.
    Path = "I_PATH", Ident;
    /// Child scopes.
    Scopes = "I_SCOPES", Array;
    /// Processes.
    Procs = "I_PROCS", Array;
    /// Signals.
    Signals = "I_SIGNALS", Array;
    /// Nexus nodes.
    Nexus = "I_NEXUS", Array;
    /// Driving sources.
    Sources = "I_SOURCES", Array;
    /// Driven outputs.
    Outputs = "I_OUTPUTS", Array;
    /// Width in scalar sub-elements.
    Width = "I_WIDTH", Int;
    /// Enclosing node.
    Parent = "I_PARENT", Object;
    /// Dependencies.
    Deps = "I_DEPS", Array;
}

const _: () = assert!(ItemId::ALL.len() <= Imask::BITS as usize);

impl ItemId {
    /// Returns the single-bit mask for this item.
    pub const fn bit(self) -> Imask {
        1 << (self as u8)
    }

    /// Looks up an item by its bit position.
    pub fn from_raw(raw: u8) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    /// Returns the bit position.
    pub fn as_raw(self) -> u8 {
        self as u8
    }

    /// Iterates over the items contained in `mask`, lowest bit first.
    pub fn iter_mask(mask: Imask) -> impl Iterator<Item = ItemId> {
        Self::ALL
            .iter()
            .copied()
            .filter(move |item| mask & item.bit() != 0)
    }
}

/// Renders the names of the items in `mask`, e.g. `I_IDENT | I_VALUE`.
pub fn mask_names(mask: Imask) -> String {
    let names: Vec<&str> = ItemId::iter_mask(mask).map(ItemId::name).collect();
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(" | ")
    }
}

/// The value held in one item slot.
#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    /// Identifier value; `None` until written.
    Ident(Option<Ident>),
    /// Integer value.
    Int(i64),
    /// Double value.
    Double(f64),
    /// Object reference; `None` until written.
    Object(Option<ObjectId>),
    /// Owned array of object references.
    Array(Vec<ObjectId>),
}

impl Item {
    /// Returns the unset value for a storage kind.
    pub fn empty(storage: Storage) -> Self {
        match storage {
            Storage::Ident => Item::Ident(None),
            Storage::Int => Item::Int(0),
            Storage::Double => Item::Double(0.0),
            Storage::Object => Item::Object(None),
            Storage::Array => Item::Array(Vec::new()),
        }
    }

    /// Returns the storage kind of this value.
    pub fn storage(&self) -> Storage {
        match self {
            Item::Ident(_) => Storage::Ident,
            Item::Int(_) => Storage::Int,
            Item::Double(_) => Storage::Double,
            Item::Object(_) => Storage::Object,
            Item::Array(_) => Storage::Array,
        }
    }

    /// Iterates over the object references held by this value.
    pub fn links(&self) -> impl Iterator<Item = ObjectId> + '_ {
        let (single, many): (Option<ObjectId>, &[ObjectId]) = match self {
            Item::Object(o) => (*o, &[]),
            Item::Array(a) => (None, a.as_slice()),
            _ => (None, &[]),
        };
        single.into_iter().chain(many.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ArenaId;

    #[test]
    fn bits_are_distinct() {
        let mut seen: Imask = 0;
        for item in ItemId::ALL {
            assert_eq!(seen & item.bit(), 0, "{} shares a bit", item.name());
            seen |= item.bit();
        }
        assert_eq!(seen.count_ones() as usize, ItemId::ALL.len());
    }

    #[test]
    fn from_raw_roundtrip() {
        for item in ItemId::ALL {
            assert_eq!(ItemId::from_raw(item.as_raw()), Some(*item));
        }
        assert_eq!(ItemId::from_raw(ItemId::ALL.len() as u8), None);
    }

    #[test]
    fn iter_mask_in_bit_order() {
        let mask = ItemId::Value.bit() | ItemId::Ident.bit() | ItemId::Deps.bit();
        let items: Vec<_> = ItemId::iter_mask(mask).collect();
        assert_eq!(items, vec![ItemId::Ident, ItemId::Value, ItemId::Deps]);
    }

    #[test]
    fn mask_names_render() {
        assert_eq!(mask_names(0), "(none)");
        assert_eq!(
            mask_names(ItemId::Ident.bit() | ItemId::Value.bit()),
            "I_IDENT | I_VALUE"
        );
    }

    #[test]
    fn empty_matches_storage() {
        for item in ItemId::ALL {
            assert_eq!(Item::empty(item.storage()).storage(), item.storage());
        }
    }

    #[test]
    fn links_cover_objects_and_arrays() {
        let a = ObjectId::new(ArenaId::from_raw(0), 1);
        let b = ObjectId::new(ArenaId::from_raw(0), 2);
        assert_eq!(Item::Object(Some(a)).links().collect::<Vec<_>>(), vec![a]);
        assert_eq!(Item::Array(vec![a, b]).links().collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(Item::Int(7).links().count(), 0);
        assert_eq!(Item::Object(None).links().count(), 0);
    }
}
