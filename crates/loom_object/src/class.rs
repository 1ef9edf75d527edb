//! Kind schema registry: per-class tables of valid items, kind names,
//! permitted retags and garbage-collection roots.

use crate::ids::ClassTag;
use crate::item::{mask_names, Imask, ItemId};

/// Raw kind discriminant within a class.
pub type Kind = u16;

/// How the arena anchored by a root of `kind` is named.
///
/// The default key is the root's identifier. Secondary units share that
/// identifier with their primary unit, so their keys add the identifier of
/// the primary and/or a fixed suffix: `ent-rtl`, `pkg-body`.
#[derive(Clone, Copy, Debug)]
pub struct UnitKey {
    /// Root kind the rule applies to.
    pub kind: Kind,
    /// Identifier item written before the root's own name.
    pub qualifier: Option<ItemId>,
    /// Text written after the root's own name.
    pub suffix: Option<&'static str>,
}

/// Static description of one object class.
///
/// Classes are pure data. A class is normally built with
/// [`define_kinds!`](crate::define_kinds), which derives `has_map` and
/// `kind_names` from a single list so that a kind without a schema entry
/// cannot be written down.
#[derive(Debug)]
pub struct ObjectClass {
    /// Class name used in diagnostics, e.g. `"tree"`.
    pub name: &'static str,
    /// Tag stored in every object of this class.
    pub tag: ClassTag,
    /// Valid items per kind, indexed by kind.
    pub has_map: &'static [Imask],
    /// Display name per kind, indexed by kind.
    pub kind_names: &'static [&'static str],
    /// Permitted in-place retags as `(from, to)` pairs.
    pub change_allowed: &'static [(Kind, Kind)],
    /// Kinds that anchor the reachability sweep and name their arena.
    pub gc_roots: &'static [Kind],
    /// Object-valued items whose absence is a legal steady state. Reading
    /// any other object item while unset means construction is incomplete.
    pub optional: Imask,
    /// Key rules for root kinds that must not share their primary's key.
    pub unit_keys: &'static [UnitKey],
}

impl ObjectClass {
    /// Returns the number of kinds in the class.
    pub fn kind_count(&self) -> usize {
        self.has_map.len()
    }

    /// Returns `true` if `kind` is a valid discriminant for this class.
    pub fn is_valid_kind(&self, kind: Kind) -> bool {
        (kind as usize) < self.kind_count()
    }

    /// Returns the set of items valid for `kind`.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is out of range for this class.
    pub fn slots_for(&self, kind: Kind) -> Imask {
        match self.has_map.get(kind as usize) {
            Some(mask) => *mask,
            None => panic!("{} kind {kind} is out of range", self.name),
        }
    }

    /// Returns `true` if objects of `kind` carry `item`.
    pub fn has_item(&self, kind: Kind, item: ItemId) -> bool {
        self.slots_for(kind) & item.bit() != 0
    }

    /// Returns the display name of `kind`.
    pub fn kind_name(&self, kind: Kind) -> &'static str {
        self.kind_names
            .get(kind as usize)
            .copied()
            .unwrap_or("<invalid kind>")
    }

    /// Returns `true` if an object may be retagged from `from` to `to`.
    pub fn retag_allowed(&self, from: Kind, to: Kind) -> bool {
        self.change_allowed.contains(&(from, to))
    }

    /// Returns the kinds `from` may be retagged to.
    pub fn retag_targets(&self, from: Kind) -> impl Iterator<Item = Kind> + '_ {
        self.change_allowed
            .iter()
            .filter(move |(f, _)| *f == from)
            .map(|(_, t)| *t)
    }

    /// Returns `true` if `kind` is a garbage-collection root.
    pub fn is_root(&self, kind: Kind) -> bool {
        self.gc_roots.contains(&kind)
    }

    /// Returns `true` if `item` may legally stay unset.
    pub fn is_optional(&self, item: ItemId) -> bool {
        self.optional & item.bit() != 0
    }

    /// Returns the key rule for root `kind`, if it has one.
    pub fn unit_key(&self, kind: Kind) -> Option<&UnitKey> {
        self.unit_keys.iter().find(|rule| rule.kind == kind)
    }

    /// Checks the internal consistency of the tables.
    pub fn validate(&self) -> Result<(), String> {
        if self.has_map.is_empty() {
            return Err(format!("class {} has no kinds", self.name));
        }
        if self.kind_names.len() != self.has_map.len() {
            return Err(format!(
                "class {} has {} schema entries but {} kind names",
                self.name,
                self.has_map.len(),
                self.kind_names.len()
            ));
        }
        if self.has_map.len() > Kind::MAX as usize {
            return Err(format!("class {} has too many kinds", self.name));
        }
        for (kind, mask) in self.has_map.iter().enumerate() {
            if *mask == 0 {
                return Err(format!(
                    "class {} kind {} has an empty schema",
                    self.name, self.kind_names[kind]
                ));
            }
        }
        for (from, to) in self.change_allowed {
            if !self.is_valid_kind(*from) || !self.is_valid_kind(*to) {
                return Err(format!(
                    "class {} declares a retag between unknown kinds {from} and {to}",
                    self.name
                ));
            }
        }
        if let Some(root) = self.gc_roots.iter().find(|k| !self.is_valid_kind(**k)) {
            return Err(format!("class {} has unknown root kind {root}", self.name));
        }
        for rule in self.unit_keys {
            if !self.is_valid_kind(rule.kind) || !self.is_root(rule.kind) {
                return Err(format!(
                    "class {} has a unit key rule for non-root kind {}",
                    self.name, rule.kind
                ));
            }
            if let Some(item) = rule.qualifier {
                if item.storage() != crate::item::Storage::Ident
                    || !self.has_item(rule.kind, item)
                {
                    return Err(format!(
                        "class {} kind {} cannot be keyed by {}",
                        self.name,
                        self.kind_names[rule.kind as usize],
                        mask_names(item.bit())
                    ));
                }
            }
        }
        let objects = ItemId::ALL
            .iter()
            .filter(|i| i.storage() == crate::item::Storage::Object)
            .fold(0, |m, i| m | i.bit());
        if self.optional & !objects != 0 {
            return Err(format!(
                "class {} marks non-object items optional: {}",
                self.name,
                mask_names(self.optional & !objects)
            ));
        }
        Ok(())
    }
}

/// The set of classes known to a [`Store`](crate::Store), indexed by tag.
#[derive(Clone, Copy, Debug)]
pub struct ClassRegistry {
    classes: &'static [&'static ObjectClass],
}

impl ClassRegistry {
    /// Builds a registry, checking that tag `n` is at index `n` and that
    /// every class is well formed.
    ///
    /// # Panics
    ///
    /// An inconsistent table is a build defect, not a recoverable error, so
    /// this panics with the first problem found.
    pub fn new(classes: &'static [&'static ObjectClass]) -> Self {
        for (index, class) in classes.iter().enumerate() {
            if class.tag.as_raw() as usize != index {
                panic!(
                    "class {} has tag {} but is registered at {index}",
                    class.name,
                    class.tag.as_raw()
                );
            }
            if let Err(defect) = class.validate() {
                panic!("{defect}");
            }
        }
        Self { classes }
    }

    /// Returns the class for `tag`, if registered.
    pub fn get(&self, tag: ClassTag) -> Option<&'static ObjectClass> {
        self.classes.get(tag.as_raw() as usize).copied()
    }

    /// Iterates over all registered classes.
    pub fn iter(&self) -> impl Iterator<Item = &'static ObjectClass> + '_ {
        self.classes.iter().copied()
    }

    /// Returns the number of registered classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if no classes are registered.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Defines a kind enumeration together with its schema and name tables.
///
/// Each variant lists the items it carries; the macro emits a `#[repr(u16)]`
/// enum plus `ALL`, `HAS_MAP` and `NAMES` constants that are always the same
/// length and in the same order.
#[macro_export]
macro_rules! define_kinds {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $text:literal [ $($item:ident)|* ] ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
        #[repr(u16)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant, )*
        }

        impl $name {
            /// Every kind in discriminant order.
            pub const ALL: &'static [$name] = &[$($name::$variant),*];

            /// Valid items per kind, indexed by discriminant.
            pub const HAS_MAP: &'static [$crate::Imask] =
                &[$( 0 $( | $crate::ItemId::$item.bit() )* ),*];

            /// Display names per kind, indexed by discriminant.
            pub const NAMES: &'static [&'static str] = &[$($text),*];

            /// Converts a raw discriminant.
            pub fn from_raw(raw: $crate::Kind) -> Option<Self> {
                Self::ALL.get(raw as usize).copied()
            }

            /// Returns the raw discriminant.
            pub const fn as_raw(self) -> $crate::Kind {
                self as $crate::Kind
            }

            /// Returns the display name.
            pub fn name(self) -> &'static str {
                Self::NAMES[self as usize]
            }

            /// Returns `true` if this kind carries `item`.
            pub fn has(self, item: $crate::ItemId) -> bool {
                Self::HAS_MAP[self as usize] & item.bit() != 0
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}
