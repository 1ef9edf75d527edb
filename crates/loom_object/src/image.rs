//! On-disk representation of a unit.
//!
//! A unit file is a 4-byte little-endian header length, a bincode
//! [`UnitHeader`], then a bincode [`UnitImage`] payload. The payload lists
//! every live object of one frozen arena in ordinal order, so references
//! within the unit are ordinals and shared nodes are written once.

use loom_common::ContentHash;
use serde::{Deserialize, Serialize};

/// Magic bytes identifying a unit file.
pub const UNIT_MAGIC: [u8; 4] = *b"LOOM";

/// Header prepended to every unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitHeader {
    /// Magic bytes: must be `b"LOOM"`.
    pub magic: [u8; 4],
    /// Unit format version.
    pub format_version: u32,
    /// Ordinal of the object that [`read`](crate::read) returns.
    pub root: u32,
    /// Content hash of the payload.
    pub checksum: ContentHash,
}

/// The payload: one arena's objects plus the tables they index into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitImage {
    /// The arena key.
    pub key: String,
    /// Identifier strings, indexed by [`WireItem::Ident`] and [`WireLoc::file`].
    pub idents: Vec<String>,
    /// Units referenced from this one, indexed by [`WireTarget::External`].
    pub deps: Vec<DepRecord>,
    /// Objects in ordinal order.
    pub objects: Vec<WireObject>,
}

/// A dependency on another unit, pinned to its content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepRecord {
    /// Key of the unit.
    pub key: String,
    /// Payload checksum of the unit when this one was written.
    pub checksum: ContentHash,
}

/// One serialized object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireObject {
    /// Class tag.
    pub tag: u8,
    /// Kind within the class.
    pub kind: u16,
    /// Source location.
    pub loc: WireLoc,
    /// Materialised items as `(item id, value)` in bit order.
    pub items: Vec<(u8, WireItem)>,
}

/// A serialized source location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireLoc {
    /// Index into [`UnitImage::idents`] of the file name.
    pub file: Option<u32>,
    /// First line.
    pub first_line: u32,
    /// First column.
    pub first_column: u32,
    /// Last line.
    pub last_line: u32,
    /// Last column.
    pub last_column: u32,
}

/// A serialized item value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireItem {
    /// Index into [`UnitImage::idents`].
    Ident(Option<u32>),
    /// Integer value.
    Int(i64),
    /// Double value.
    Double(f64),
    /// Single reference.
    Object(Option<WireRef>),
    /// Reference array.
    Array(Vec<WireRef>),
}

/// A reference, tagged with the class of its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRef {
    /// Class tag the target must have.
    pub tag: u8,
    /// Where the target lives.
    pub target: WireTarget,
}

/// The location of a referenced object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireTarget {
    /// An object of this unit, by ordinal.
    Local(u32),
    /// An object of a dependency, by index into [`UnitImage::deps`] and
    /// ordinal within that unit.
    External {
        /// Dependency index.
        dep: u32,
        /// Ordinal within the dependency.
        ordinal: u32,
    },
}
